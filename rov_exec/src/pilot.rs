//! # Pilot link
//!
//! Latest-value mailbox between whatever delivers pilot commands (network, HID) and the control
//! loop. Commands sent between two cycles overwrite each other, only the newest one is used.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::{ManualCommand, PilotInputSource};
use parking_lot::Mutex;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared pilot command slot. Clones refer to the same slot.
#[derive(Debug, Clone, Default)]
pub struct PilotLink {
    latest: Arc<Mutex<Option<ManualCommand>>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PilotLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending command.
    pub fn send(&self, cmd: ManualCommand) {
        *self.latest.lock() = Some(cmd);
    }
}

impl PilotInputSource for PilotLink {
    fn poll(&mut self) -> Option<ManualCommand> {
        self.latest.lock().take()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_last_value_wins() {
        let tx = PilotLink::new();
        let mut rx = tx.clone();

        assert_eq!(rx.poll(), None);

        tx.send(ManualCommand {
            surge: 0.2,
            ..Default::default()
        });
        tx.send(ManualCommand {
            surge: 0.7,
            ..Default::default()
        });

        assert_eq!(rx.poll().map(|c| c.surge), Some(0.7));
        assert_eq!(rx.poll(), None);
    }
}
