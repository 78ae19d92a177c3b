//! Scan mode state.
//!
//! The mode is advisory: it gates whether reads are attempted and is updated
//! optimistically when a command is issued, before any device reply. It is a
//! single atomic word and is never held together with the frame queue.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::protocol::Command;

/// Device scan mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stopped,
    Scanning,
}

impl Mode {
    /// Mode after issuing `command` from `self`.
    pub fn after(self, command: Command) -> Mode {
        match command {
            Command::Start => Mode::Scanning,
            Command::Stop | Command::Reboot => Mode::Stopped,
            Command::Info | Command::Status => self,
        }
    }
}

/// Tracks the scan mode of one device.
#[derive(Debug, Default)]
pub struct ModeController {
    scanning: AtomicBool,
}

impl ModeController {
    /// Starts in [`Mode::Stopped`].
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current(&self) -> Mode {
        if self.scanning.load(Ordering::Acquire) {
            Mode::Scanning
        } else {
            Mode::Stopped
        }
    }

    #[inline]
    pub fn is_scanning(&self) -> bool {
        self.current() == Mode::Scanning
    }

    /// Record the transition caused by issuing `command`; returns the new mode.
    pub fn record(&self, command: Command) -> Mode {
        let next = self.current().after(command);
        self.scanning
            .store(next == Mode::Scanning, Ordering::Release);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_mode_is_stopped() {
        assert_eq!(ModeController::new().current(), Mode::Stopped);
    }

    #[test]
    fn test_transitions() {
        let mode = ModeController::new();

        assert_eq!(mode.record(Command::Start), Mode::Scanning);
        assert_eq!(mode.record(Command::Info), Mode::Scanning);
        assert_eq!(mode.record(Command::Status), Mode::Scanning);
        assert_eq!(mode.record(Command::Stop), Mode::Stopped);

        mode.record(Command::Start);
        assert_eq!(mode.record(Command::Reboot), Mode::Stopped);
        assert!(!mode.is_scanning());
    }

    #[test]
    fn test_info_status_keep_stopped() {
        let mode = ModeController::new();
        assert_eq!(mode.record(Command::Info), Mode::Stopped);
        assert_eq!(mode.record(Command::Status), Mode::Stopped);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mode = ModeController::new();
        mode.record(Command::Start);
        assert_eq!(mode.record(Command::Start), Mode::Scanning);
    }
}
