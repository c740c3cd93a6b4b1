//! Canned expressions evaluated inside the debuggee.

/// Global the notify expression keeps its counters in.
pub const NOTIFY_STATE_KEY: &str = "__inspectorNotify";

/// Bumps the pending counter and timestamp in the debuggee's global state.
///
/// Evaluates to `{success, timestamp, pending}`.
pub const NOTIFY_EXPRESSION: &str = "(() => {\
    const state = (globalThis.__inspectorNotify ??= { pending: 0, timestamp: 0 });\
    state.pending += 1;\
    state.timestamp = Date.now();\
    return { success: true, timestamp: state.timestamp, pending: state.pending };\
})()";
