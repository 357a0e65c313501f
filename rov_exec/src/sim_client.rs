//! # Simulation Client
//!
//! A simulated vehicle for running the control software without hardware. The vehicle is a first
//! order vertical plant: the net vertical duty (descend channels minus ascend channels) sets a
//! target vertical speed, which the vehicle approaches with a fixed time constant. An optional
//! buoyancy bias makes the vehicle drift towards the surface with no thrust. Horizontal motion
//! and attitude are not simulated.
//!
//! The simulation implements both `TelemetrySource` and `MotorDriver`. Clones share the same
//! vehicle, so one clone can be handed to the control loop as the telemetry source and another as
//! the motor driver.
//!
//! Time either advances explicitly through `advance` (tests) or follows the wall clock
//! (`SimVehicle::realtime`).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{MotorDriver, MotorDriverError, Telemetry, TelemetrySource, ThrusterMap};
use log::trace;
use parking_lot::Mutex;
use serde::Deserialize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated vehicle.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Units: feet
    pub initial_depth_ft: f64,

    /// Vertical speed at full net vertical duty.
    ///
    /// Units: feet/second
    pub max_vert_speed_ft_s: f64,

    /// Time constant of the vertical speed response.
    ///
    /// Units: seconds
    pub time_constant_s: f64,

    /// Rise speed with no thrust, positive floats towards the surface.
    ///
    /// Units: feet/second
    pub buoyancy_ft_s: f64,

    /// Water temperature reported in telemetry.
    ///
    /// Units: degrees Fahrenheit
    pub temperature_f: f64,

    pub descend_ids: Vec<String>,
    pub ascend_ids: Vec<String>,
}

/// Handle to a simulated vehicle.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    inner: Arc<Mutex<SimState>>,
}

#[derive(Debug)]
struct SimState {
    params: SimParams,
    clock: SimClock,
    depth_ft: f64,
    vert_speed_ft_s: f64,
    dems: Option<ThrusterMap>,
    dropout: bool,
}

#[derive(Debug, Clone, Copy)]
enum SimClock {
    /// Time only moves in `advance`, `now` is the current simulated time.
    Stepped { now: Instant },

    /// Time follows the wall clock, `last` is when the plant was last integrated.
    Realtime { last: Instant },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            initial_depth_ft: 2.0,
            max_vert_speed_ft_s: 2.0,
            time_constant_s: 0.5,
            buoyancy_ft_s: 0.0,
            temperature_f: 55.0,
            descend_ids: vec!["vert_fore_down".into(), "vert_aft_down".into()],
            ascend_ids: vec!["vert_fore_up".into(), "vert_aft_up".into()],
        }
    }
}

impl SimVehicle {
    /// Create a vehicle whose time only advances through `advance`, starting at `start`.
    pub fn stepped(params: SimParams, start: Instant) -> Self {
        Self::with_clock(params, SimClock::Stepped { now: start })
    }

    /// Create a vehicle whose time follows the wall clock.
    pub fn realtime(params: SimParams) -> Self {
        Self::with_clock(
            params,
            SimClock::Realtime {
                last: Instant::now(),
            },
        )
    }

    fn with_clock(params: SimParams, clock: SimClock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                depth_ft: params.initial_depth_ft.max(0.0),
                vert_speed_ft_s: 0.0,
                params,
                clock,
                dems: None,
                dropout: false,
            })),
        }
    }

    /// Advance a stepped simulation by `dt`. Does nothing for a realtime simulation.
    pub fn advance(&self, dt: Duration) {
        let mut state = self.inner.lock();
        let clock = state.clock;

        if let SimClock::Stepped { now } = clock {
            state.clock = SimClock::Stepped { now: now + dt };
            state.integrate(dt.as_secs_f64());
        }
    }

    /// Stop (or restart) telemetry, as if the depth sensor had dropped out.
    pub fn set_dropout(&self, dropout: bool) {
        self.inner.lock().dropout = dropout;
    }

    pub fn depth_ft(&self) -> f64 {
        self.inner.lock().depth_ft
    }
}

impl SimState {
    fn integrate(&mut self, dt_s: f64) {
        if !(dt_s > 0.0) {
            return;
        }

        let vert_duty = self.channel_mean(&self.params.descend_ids)
            - self.channel_mean(&self.params.ascend_ids);
        let target_speed =
            vert_duty * self.params.max_vert_speed_ft_s - self.params.buoyancy_ft_s;

        let alpha = if self.params.time_constant_s > 0.0 {
            (dt_s / self.params.time_constant_s).min(1.0)
        } else {
            1.0
        };

        self.vert_speed_ft_s += (target_speed - self.vert_speed_ft_s) * alpha;
        self.depth_ft += self.vert_speed_ft_s * dt_s;

        // Can't fly
        if self.depth_ft < 0.0 {
            self.depth_ft = 0.0;
            self.vert_speed_ft_s = self.vert_speed_ft_s.max(0.0);
        }

        trace!(
            "Sim: duty = {:.3}, speed = {:.3} ft/s, depth = {:.3} ft",
            vert_duty,
            self.vert_speed_ft_s,
            self.depth_ft
        );
    }

    fn channel_mean(&self, ids: &[String]) -> f64 {
        if ids.is_empty() {
            return 0.0;
        }

        let sum: f64 = ids
            .iter()
            .filter_map(|id| self.dems.as_ref().and_then(|d| d.get(id)))
            .filter(|d| d.is_finite())
            .map(|d| d.max(0.0).min(1.0))
            .sum();

        sum / ids.len() as f64
    }
}

impl TelemetrySource for SimVehicle {
    fn read(&mut self) -> Option<Telemetry> {
        let mut state = self.inner.lock();
        let clock = state.clock;

        let timestamp = match clock {
            SimClock::Stepped { now } => now,
            SimClock::Realtime { last } => {
                let now = Instant::now();
                state.integrate(now.duration_since(last).as_secs_f64());
                state.clock = SimClock::Realtime { last: now };
                now
            }
        };

        if state.dropout {
            return None;
        }

        Some(Telemetry {
            depth_ft: state.depth_ft,
            pitch_deg: 0.0,
            roll_deg: 0.0,
            yaw_deg: 0.0,
            temperature_f: state.params.temperature_f,
            timestamp,
        })
    }
}

impl MotorDriver for SimVehicle {
    fn apply(&mut self, dems: &ThrusterMap) -> Result<(), MotorDriverError> {
        self.inner.lock().dems = Some(dems.clone());
        Ok(())
    }

    fn confirmed(&self) -> Option<ThrusterMap> {
        self.inner.lock().dems.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn vert(down: f64, up: f64) -> ThrusterMap {
        let mut m = ThrusterMap::default();
        m.duty.insert("vert_fore_down".into(), down);
        m.duty.insert("vert_aft_down".into(), down);
        m.duty.insert("vert_fore_up".into(), up);
        m.duty.insert("vert_aft_up".into(), up);
        m
    }

    #[test]
    fn test_sinks_with_descend_thrust() {
        let t0 = Instant::now();
        let mut sim = SimVehicle::stepped(SimParams::default(), t0);

        sim.apply(&vert(1.0, 0.0)).unwrap();
        for _ in 0..100 {
            sim.advance(Duration::from_millis(50));
        }

        // 5 s at up to 2 ft/s
        let depth = sim.read().unwrap().depth_ft;
        assert!(depth > 9.0 && depth < 13.0);
    }

    #[test]
    fn test_surface_limit_and_buoyancy() {
        let params = SimParams {
            initial_depth_ft: 1.0,
            buoyancy_ft_s: 0.5,
            ..Default::default()
        };
        let mut sim = SimVehicle::stepped(params, Instant::now());

        for _ in 0..200 {
            sim.advance(Duration::from_millis(50));
        }

        assert_eq!(sim.read().unwrap().depth_ft, 0.0);
    }

    #[test]
    fn test_dropout_and_timestamps() {
        let t0 = Instant::now();
        let mut sim = SimVehicle::stepped(SimParams::default(), t0);

        assert_eq!(sim.read().unwrap().timestamp, t0);
        sim.advance(Duration::from_millis(50));
        assert_eq!(sim.read().unwrap().timestamp, t0 + Duration::from_millis(50));

        sim.set_dropout(true);
        assert!(sim.read().is_none());
    }

    #[test]
    fn test_confirmed_is_last_applied() {
        let mut sim = SimVehicle::stepped(SimParams::default(), Instant::now());
        assert!(sim.confirmed().is_none());

        sim.apply(&vert(0.3, 0.0)).unwrap();
        assert_eq!(sim.confirmed(), Some(vert(0.3, 0.0)));
    }
}
