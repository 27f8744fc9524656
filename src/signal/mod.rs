//! Cooperative cancellation and SIGINT/SIGTERM handling
//!
//! A `CancelToken` is a cheap shared flag. Blocking points (poll ticks, the
//! sleeps between them, artifact downloads) check it and stop early. The
//! binary trips it from a `ctrlc` handler:
//!
//! 1. First signal: request cancellation, the current stage winds down and
//!    reports the last known status.
//! 2. Second signal: exit immediately with `EXIT_CODE_INTERRUPTED`.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Exit code on a second interrupt
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Granularity of cancellable sleeps
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    signal_count: Arc<AtomicU8>,
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: cancel cooperatively
    InitiateCancellation,
    /// Second signal: exit now
    ImmediateExit,
    /// Third+ signal: ignore
    Ignore,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Number of signals received
    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Record a signal and decide what to do about it
    pub fn handle_signal(&self) -> SignalAction {
        match self.signal_count.fetch_add(1, Ordering::SeqCst) {
            0 => {
                self.cancel();
                SignalAction::InitiateCancellation
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }

    /// Sleep for `duration`, waking early on cancellation
    ///
    /// Returns false if the token was cancelled before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.is_cancelled() {
                return false;
            }
            let elapsed = start.elapsed();
            if elapsed >= duration {
                return true;
            }
            std::thread::sleep((duration - elapsed).min(SLEEP_SLICE));
        }
    }
}

/// Install the process-wide SIGINT/SIGTERM handler for `token`
///
/// Must be called at most once per process.
pub fn install_handler(token: &CancelToken) -> Result<(), ctrlc::Error> {
    let token = token.clone();
    ctrlc::set_handler(move || match token.handle_signal() {
        SignalAction::InitiateCancellation => {
            eprintln!("\nReceived interrupt signal, stopping after the current step...");
        }
        SignalAction::ImmediateExit => {
            eprintln!("\nReceived second interrupt, exiting immediately...");
            std::process::exit(EXIT_CODE_INTERRUPTED);
        }
        SignalAction::Ignore => {}
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_initial() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.signal_count(), 0);
    }

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_signal_sequence() {
        let token = CancelToken::new();
        assert_eq!(token.handle_signal(), SignalAction::InitiateCancellation);
        assert!(token.is_cancelled());
        assert_eq!(token.handle_signal(), SignalAction::ImmediateExit);
        assert_eq!(token.handle_signal(), SignalAction::Ignore);
        assert_eq!(token.signal_count(), 3);
    }

    #[test]
    fn test_sleep_completes() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(5)));
    }

    #[test]
    fn test_sleep_wakes_on_cancel() {
        let token = CancelToken::new();
        let other = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            other.cancel();
        });

        let start = Instant::now();
        assert!(!token.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
