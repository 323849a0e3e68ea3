//! Forced-logout side effect
//!
//! Invoked by the gateway exactly once per terminal refresh failure, after
//! the session has been cleared and before any waiting request is released.
//! What it does (redirect, notify, exit) is up to the application.

use tracing::warn;

pub trait LogoutHook: Send + Sync {
    fn on_logout(&self, reason: &str);
}

impl<F> LogoutHook for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_logout(&self, reason: &str) {
        self(reason)
    }
}

/// Hook that only records the logout in the log.
pub struct TracingLogout;

impl LogoutHook for TracingLogout {
    fn on_logout(&self, reason: &str) {
        warn!(reason, "session ended, sign in again to continue");
    }
}
