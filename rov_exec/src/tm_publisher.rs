//! # Telemetry publisher
//!
//! Holds the most recent telemetry packet for the dashboard and any other readers. The control
//! loop builds a complete packet and swaps it in, readers clone the `Arc` and never hold the lock
//! for longer than that.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::ThrusterMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    data_store::DataStore, depth_ctrl::DepthHoldStatus, safety::SafetyState,
    thrust_ctrl,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Snapshot of the vehicle's control state at the end of a cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TmPacket {
    pub cycle: u128,

    /// Number of consecutive cycles which overran their period.
    pub num_consec_cycle_overruns: u64,

    pub safety: SafetyState,

    /// Last valid depth, `None` if telemetry is stale or has never arrived.
    pub depth_ft: Option<f64>,
    pub attitude: Option<Attitude>,
    pub temperature_f: Option<f64>,

    pub pilot_timed_out: bool,

    pub depth_hold: DepthHoldStatus,

    /// Duty cycles sent to the motor driver this cycle.
    pub thrust: ThrusterMap,
    pub thrust_status: thrust_ctrl::StatusReport,

    /// Duty cycles the motor driver reports it is running.
    pub confirmed_thrust: Option<ThrusterMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Attitude {
    pub pitch_deg: f64,
    pub roll_deg: f64,
    pub yaw_deg: f64,
}

/// Single writer, many reader cell holding the latest packet.
#[derive(Debug, Clone, Default)]
pub struct TmPublisher {
    latest: Arc<RwLock<Arc<TmPacket>>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TmPacket {
    /// Build a packet from the state of the data store at the end of a cycle.
    pub fn from_datastore(ds: &DataStore) -> Self {
        let telem = ds.last_telem;

        Self {
            cycle: ds.num_cycles,
            num_consec_cycle_overruns: ds.num_consec_cycle_overruns,
            safety: ds.safety,
            depth_ft: telem.map(|t| t.depth_ft),
            attitude: telem.map(|t| Attitude {
                pitch_deg: t.pitch_deg,
                roll_deg: t.roll_deg,
                yaw_deg: t.yaw_deg,
            }),
            temperature_f: telem.map(|t| t.temperature_f),
            pilot_timed_out: ds.pilot_timed_out,
            depth_hold: ds.depth_ctrl_status_rpt,
            thrust: ds.thrust_ctrl_output.clone(),
            thrust_status: ds.thrust_ctrl_status_rpt,
            confirmed_thrust: ds.confirmed_thrust.clone(),
        }
    }
}

impl TmPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published packet.
    pub fn publish(&self, packet: Arc<TmPacket>) {
        *self.latest.write() = packet;
    }

    /// Get the latest packet.
    pub fn latest(&self) -> Arc<TmPacket> {
        self.latest.read().clone()
    }
}
