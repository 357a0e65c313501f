//! # Data Store

use comms_if::eqpt::{ManualCommand, Telemetry, ThrusterMap};
use log::warn;
use std::time::Instant;

use crate::{
    depth_ctrl::{DepthCtrl, DepthHoldStatus},
    safety::SafetyState,
    thrust_ctrl::{self, ThrustCtrl, VerticalMode},
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the control loop.
///
/// Owned by the control task only, all external requests reach it through the telecommand
/// processor at the start of a cycle.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    // Safety
    pub safety: SafetyState,

    // Telemetry
    /// Fresh telemetry received this cycle, if any.
    pub telem: Option<Telemetry>,

    /// Most recent telemetry with a valid depth.
    pub last_telem: Option<Telemetry>,

    /// Number of consecutive cycles without fresh, valid telemetry
    pub num_consec_missed_telem: u64,

    // Pilot
    /// The pilot command used for this cycle, neutral if the pilot link has timed out.
    pub manual: ManualCommand,

    /// Time the last pilot command was received.
    pub manual_rx_instant: Option<Instant>,

    pub pilot_timed_out: bool,

    // DepthCtrl
    pub depth_ctrl: DepthCtrl,
    pub depth_ctrl_output: VerticalMode,
    pub depth_ctrl_status_rpt: DepthHoldStatus,

    // ThrustCtrl
    pub thrust_ctrl: ThrustCtrl,
    pub thrust_ctrl_output: ThrusterMap,
    pub thrust_ctrl_status_rpt: thrust_ctrl::StatusReport,

    /// Thruster state as confirmed by the motor driver
    pub confirmed_thrust: Option<ThrusterMap>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive motor driver errors
    pub num_consec_motor_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create a new data store around already configured modules.
    pub fn new(depth_ctrl: DepthCtrl, thrust_ctrl: ThrustCtrl, safety: SafetyState) -> Self {
        Self {
            thrust_ctrl_output: thrust_ctrl.neutral_output(),
            depth_ctrl_status_rpt: depth_ctrl.status(),
            depth_ctrl,
            thrust_ctrl,
            safety,
            ..Default::default()
        }
    }

    /// Latch the emergency stop and make every module safe.
    ///
    /// Depth hold is disabled so that a later reset never resumes automatic thrust.
    pub fn emergency_stop(&mut self) {
        self.safety.emergency_stop();

        self.depth_ctrl.make_safe();
        self.thrust_ctrl.make_safe();
    }

    /// Clear the emergency stop. Depth hold stays disabled until commanded again.
    pub fn reset_stop(&mut self) {
        if !self.safety.emergency_stopped {
            warn!("Reset requested but the emergency stop is not active");
        }

        self.safety.reset();
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_s = (cycle_frequency_hz.round() as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.telem = None;
        self.depth_ctrl_output = VerticalMode::Manual;
        self.thrust_ctrl_status_rpt = thrust_ctrl::StatusReport::default();
    }
}
