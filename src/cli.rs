//! Command-line surface.
//!
//! | Command | Output |
//! |---------|--------|
//! | `list` (default) | Pretty JSON array of targets, or a notice when none |
//! | `inject <port> <expression>` | Pretty JSON response, or `null` on timeout |
//! | `notify <port>` | Pretty JSON response, or `null` on timeout |

// ============================================================================
// Imports
// ============================================================================

use std::ops::RangeInclusive;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::injector::{Injector, InjectorOptions, InvokeOutcome};

// ============================================================================
// Constants
// ============================================================================

/// Printed by `list` when no inspector answers.
pub const NO_INSPECTORS_MESSAGE: &str = "No inspectors found";

/// Exit status for a completed command.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit status for any error.
pub const EXIT_FAILURE: u8 = 1;

// ============================================================================
// Arguments
// ============================================================================

/// Discover Node.js inspectors and evaluate expressions in them.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "inspector-inject")]
#[command(about = "Discover Node.js inspectors and evaluate expressions in them")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Deadline for connect, handshake and response, in milliseconds
    #[arg(long, global = true, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Budget for each discovery probe, in milliseconds
    #[arg(long, global = true, default_value_t = 500)]
    pub probe_timeout_ms: u64,

    /// Port range scanned by `list`, as START-END
    #[arg(long, global = true, default_value = "9229-9249", value_parser = parse_port_range)]
    pub ports: RangeInclusive<u16>,

    /// Require a proper `HTTP/1.1 101` status line during the upgrade
    #[arg(long, global = true)]
    pub strict_handshake: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub debug: bool,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// List reachable inspectors
    List,

    /// Evaluate an expression in the inspector on PORT
    Inject {
        /// Inspector port
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,

        /// Source text to evaluate
        expression: String,
    },

    /// Bump the notify counters in the inspector on PORT
    Notify {
        /// Inspector port
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,
    },
}

impl Cli {
    /// Returns the selected command, defaulting to `list`.
    #[must_use]
    pub fn command(&self) -> CliCommand {
        self.command.clone().unwrap_or(CliCommand::List)
    }

    /// Builds injector options from the flags.
    #[must_use]
    pub fn options(&self) -> InjectorOptions {
        let options = InjectorOptions::new()
            .with_ports(self.ports.clone())
            .with_probe_timeout(Duration::from_millis(self.probe_timeout_ms))
            .with_operation_timeout(Duration::from_millis(self.timeout_ms));

        if self.strict_handshake {
            options.with_strict_handshake()
        } else {
            options
        }
    }

    /// Log filter directive for the tracing subscriber.
    #[must_use]
    pub fn log_directive(&self) -> &'static str {
        if self.debug {
            "inspector_inject=debug"
        } else {
            "inspector_inject=warn"
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Runs the selected command and returns the text for stdout.
///
/// # Errors
///
/// Returns the first error of the command; a missing response before the
/// deadline is not an error.
pub async fn run(cli: &Cli) -> Result<String> {
    let injector = Injector::builder().options(cli.options()).build()?;

    match cli.command() {
        CliCommand::List => {
            let targets = injector.discover().await;
            if targets.is_empty() {
                Ok(NO_INSPECTORS_MESSAGE.to_string())
            } else {
                Ok(serde_json::to_string_pretty(&targets)?)
            }
        }
        CliCommand::Inject { port, expression } => {
            render(&injector.inject(port, &expression).await?)
        }
        CliCommand::Notify { port } => render(&injector.notify(port).await?),
    }
}

/// Maps a command result to the process exit status.
#[must_use]
pub fn exit_status<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(_) => EXIT_FAILURE,
    }
}

fn render(outcome: &InvokeOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(&outcome.to_json())?)
}

/// Parses `START-END`, or a single port.
fn parse_port_range(raw: &str) -> std::result::Result<RangeInclusive<u16>, String> {
    let (start, end) = raw.split_once('-').unwrap_or((raw, raw));

    let start: u16 = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start port in {raw:?}"))?;
    let end: u16 = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end port in {raw:?}"))?;

    if start == 0 || start > end {
        return Err(format!("{raw:?} is not a range of ports 1-65535"));
    }

    Ok(start..=end)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    use crate::error::Error;
    use crate::testing::{InspectorDouble, Reply, closed_port};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("inspector-inject").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);

        assert_eq!(cli.command(), CliCommand::List);
        assert_eq!(cli.timeout_ms, 5000);
        assert_eq!(cli.probe_timeout_ms, 500);
        assert_eq!(cli.ports, 9229..=9249);
        assert!(!cli.strict_handshake);
        assert_eq!(cli.options(), InjectorOptions::new());
        assert_eq!(cli.log_directive(), "inspector_inject=warn");
    }

    #[test]
    fn test_parse_inject() {
        let cli = parse(&["inject", "9229", "process.pid", "--timeout-ms", "100", "--debug"]);

        assert_eq!(
            cli.command(),
            CliCommand::Inject {
                port: 9229,
                expression: "process.pid".into()
            }
        );
        assert_eq!(cli.options().operation_timeout, Duration::from_millis(100));
        assert_eq!(cli.log_directive(), "inspector_inject=debug");
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse(&["--ports", "9300-9310", "--strict-handshake", "notify", "9300"]);

        assert_eq!(cli.command(), CliCommand::Notify { port: 9300 });
        assert_eq!(cli.options().ports, 9300..=9310);
        assert!(cli.options().strict_handshake);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let bad: [&[&str]; 4] = [
            &["inject", "not-a-port", "1"],
            &["inject", "0", "1"],
            &["inject", "9229"],
            &["--ports", "9249-9229"],
        ];

        for args in bad {
            let argv = std::iter::once("inspector-inject").chain(args.iter().copied());
            assert!(Cli::try_parse_from(argv).is_err(), "accepted {args:?}");
        }
    }

    #[test]
    fn test_parse_port_range() {
        assert_eq!(parse_port_range("9229-9249"), Ok(9229..=9249));
        assert_eq!(parse_port_range("9300"), Ok(9300..=9300));
        assert!(parse_port_range("0-10").is_err());
        assert!(parse_port_range("a-b").is_err());
        assert!(parse_port_range("70000").is_err());
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status::<()>(&Ok(())), EXIT_SUCCESS);
        assert_eq!(exit_status::<()>(&Err(Error::target_not_found(1))), EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_inject_end_to_end() -> anyhow::Result<()> {
        let double =
            InspectorDouble::spawn(9300, Reply::Text(r#"{"id":1,"result":{"value":42}}"#.into()))
                .await;

        let result = run(&parse(&["inject", "9300", "6*7"])).await;
        assert_eq!(exit_status(&result), EXIT_SUCCESS);

        let output: Value = serde_json::from_str(&result?)?;
        assert_eq!(output, json!({"id": 1, "result": {"value": 42}}));
        assert_eq!(double.received()[0]["params"]["expression"], json!("6*7"));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_reports_targets() {
        let double = InspectorDouble::spawn(0, Reply::Silent).await;
        let range = format!("{0}-{0}", double.port());

        let output = run(&parse(&["--ports", range.as_str(), "list"]))
            .await
            .expect("list");
        let listed: Value = serde_json::from_str(&output).expect("json output");

        assert_eq!(
            listed,
            json!([{"port": double.port(), "title": "double.js", "url": double.debugger_url()}])
        );
    }

    #[tokio::test]
    async fn test_list_empty() {
        let port = closed_port().await;
        let range = format!("{port}-{port}");

        let result = run(&parse(&["--ports", range.as_str()])).await;

        assert_eq!(exit_status(&result), EXIT_SUCCESS);
        assert_eq!(result.expect("list"), NO_INSPECTORS_MESSAGE);
    }

    #[tokio::test]
    async fn test_inject_unresolvable_port_fails() {
        let port = closed_port().await;

        let port = port.to_string();
        let result = run(&parse(&["inject", port.as_str(), "1"])).await;

        assert_eq!(exit_status(&result), EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_timeout_prints_null() {
        let double = InspectorDouble::spawn(0, Reply::Silent).await;

        let port = double.port().to_string();
        let result = run(&parse(&["--timeout-ms", "200", "notify", port.as_str()])).await;

        assert_eq!(exit_status(&result), EXIT_SUCCESS);
        assert_eq!(result.expect("output"), "null");
    }
}
