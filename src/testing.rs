//! Local test doubles for discovery and injection tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Path of the debugger endpoint the double advertises.
pub(crate) const DEBUGGER_PATH: &str = "0f2c6b1e-double";

/// Wraps a JSON body in a `200 OK` response.
pub(crate) fn http_json(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json; charset=UTF-8\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

/// Answers every connection with `response` after reading the request head.
pub(crate) async fn serve_http(response: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let response = response.clone();
            tokio::spawn(async move {
                read_request_head(&mut stream).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

/// Returns a port nothing listens on.
pub(crate) async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local addr").port()
}

/// How the double answers debugger messages.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Send this text frame for every request.
    Text(String),
    /// Never answer.
    Silent,
}

/// A fake inspector serving `/json` and a WebSocket debugger endpoint on one port.
pub(crate) struct InspectorDouble {
    pub(crate) addr: SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl InspectorDouble {
    /// Binds `127.0.0.1:port` (0 for any) and starts serving.
    pub(crate) async fn spawn(port: u16, reply: Reply) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let received = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn({
            let received = Arc::clone(&received);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve_connection(
                        stream,
                        addr,
                        reply.clone(),
                        Arc::clone(&received),
                    ));
                }
            }
        });

        Self {
            addr,
            received,
            task,
        }
    }

    pub(crate) fn port(&self) -> u16 {
        self.addr.port()
    }

    pub(crate) fn debugger_url(&self) -> String {
        format!("ws://{}/{DEBUGGER_PATH}", self.addr)
    }

    /// Messages received over the debugger endpoint so far.
    pub(crate) fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }
}

impl Drop for InspectorDouble {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    reply: Reply,
    received: Arc<Mutex<Vec<Value>>>,
) {
    let Some(request_line) = peek_request_line(&stream).await else {
        return;
    };

    if request_line.starts_with("GET /json") {
        read_request_head(&mut stream).await;
        let listing = format!(
            r#"[{{"description":"node.js instance","title":"double.js","type":"node","webSocketDebuggerUrl":"ws://{addr}/{DEBUGGER_PATH}"}}]"#
        );
        let _ = stream.write_all(http_json(&listing).as_bytes()).await;
        let _ = stream.shutdown().await;
        return;
    }

    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };

        if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
            received.lock().push(value);
        }

        if let Reply::Text(reply) = &reply
            && ws.send(Message::Text(reply.clone().into())).await.is_err()
        {
            break;
        }
    }
}

/// Waits until the first request line is buffered, without consuming it.
async fn peek_request_line(stream: &TcpStream) -> Option<String> {
    let mut buf = [0u8; 256];

    for _ in 0..200 {
        let n = stream.peek(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        if let Some(end) = buf[..n].windows(2).position(|w| w == b"\r\n") {
            return Some(String::from_utf8_lossy(&buf[..end]).into_owned());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    None
}

async fn read_request_head(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];

    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }
}
