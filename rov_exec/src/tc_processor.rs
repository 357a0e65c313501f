//! # Telecommand processor module
//!
//! The telecommand processor applies control requests to the data store. It is only ever called
//! at the start of a control cycle, so no cycle observes a half applied request.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use crate::data_store::DataStore;
use comms_if::tc::{DepthHoldCmd, Tc};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute all telecommands received since the last cycle, in order.
///
/// An emergency stop anywhere in the batch wins, every other telecommand in the batch is dropped.
pub fn exec_batch(ds: &mut DataStore, tcs: &[Tc]) {
    if tcs.iter().any(|tc| *tc == Tc::EmergencyStop) {
        for tc in tcs.iter().filter(|tc| **tc != Tc::EmergencyStop) {
            warn!("{:?} dropped: received in the same cycle as an emergency stop", tc);
        }

        exec(ds, &Tc::EmergencyStop);
        return;
    }

    for tc in tcs {
        exec(ds, tc);
    }
}

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules. While the emergency stop is
/// latched only `ResetStop` (and further stops) are accepted.
pub fn exec(ds: &mut DataStore, tc: &Tc) {
    if ds.safety.emergency_stopped && !tc.is_safety() {
        warn!("{:?} rejected: emergency stop is active", tc);
        return;
    }

    // Handle different Tcs
    match tc {
        Tc::EmergencyStop => {
            debug!("Recieved EmergencyStop command");
            ds.emergency_stop();
        }
        Tc::ResetStop => {
            debug!("Recieved ResetStop command");
            ds.reset_stop();
        }
        Tc::DepthHold(cmd) => exec_depth_hold(ds, cmd),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn exec_depth_hold(ds: &mut DataStore, cmd: &DepthHoldCmd) {
    let result = match *cmd {
        DepthHoldCmd::Enable => ds.depth_ctrl.enable(),
        DepthHoldCmd::Disable => {
            ds.depth_ctrl.disable();
            Ok(())
        }
        DepthHoldCmd::SetTarget { depth_ft } => ds.depth_ctrl.set_target(depth_ft),
        DepthHoldCmd::GoTo { depth_ft } => ds.depth_ctrl.go_to_depth(depth_ft),
        DepthHoldCmd::Tune { kp, ki, kd } => ds.depth_ctrl.tune(kp, ki, kd),
    };

    if let Err(e) = result {
        warn!("Depth hold command {:?} rejected: {}", cmd, e);
    }
}
