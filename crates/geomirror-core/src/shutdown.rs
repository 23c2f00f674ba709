//! Stop-between-items support via an atomic flag set from signal handlers.

use std::sync::atomic::{AtomicBool, Ordering};

/// Exit code for a run stopped by SIGINT or SIGTERM
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Set once SIGINT or SIGTERM arrives
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

/// Check if shutdown was requested
pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

/// Register SIGINT/SIGTERM handlers.
///
/// First signal sets the flag so the pipeline stops before the next edition;
/// a second one exits immediately.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        // SAFETY: the handler only does an atomic swap and `_exit`, both
        // async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if shutdown_flag().swap(true, Ordering::Relaxed) {
                    signal_hook::low_level::exit(i32::from(INTERRUPTED_EXIT_CODE));
                }
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_signal_only_sets_the_flag() {
        install_signal_handlers().unwrap();
        assert!(!is_shutdown_requested());
        signal_hook::low_level::raise(signal_hook::consts::SIGTERM).unwrap();
        assert!(is_shutdown_requested());
    }
}
