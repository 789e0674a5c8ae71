//! Signal handling for the CLI
//!
//! SIGINT and SIGTERM cancel the registry call in flight instead of killing
//! the process, so the command can report the interruption and exit cleanly.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::context::CancelToken;

/// Global shutdown signal flag
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Exit code for a command interrupted by a signal (128 + SIGINT)
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Check if shutdown has been requested
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

/// Request shutdown programmatically, cancelling `token`
pub fn request_shutdown(token: &CancelToken) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
    token.cancel();
}

/// Cancel `token` when the process receives SIGINT or SIGTERM.
///
/// A second signal after cancellation gets the default action and
/// terminates the process.
#[cfg(unix)]
pub fn cancel_on_signal(token: CancelToken) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use signal_hook::low_level;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if is_shutdown_requested() {
                let _ = low_level::emulate_default_handler(sig);
                continue;
            }
            let name = if sig == SIGINT { "SIGINT" } else { "SIGTERM" };
            info!("Received {}, cancelling in-flight request", name);
            request_shutdown(&token);
        }
    });

    debug!("Signal handlers installed");
    Ok(())
}

#[cfg(not(unix))]
pub fn cancel_on_signal(_token: CancelToken) -> Result<()> {
    debug!("Signal handling is not supported on this platform");
    Ok(())
}
