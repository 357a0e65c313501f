//! Control loop integration tests
//!
//! These drive the control loop one cycle at a time with injected instants, against either the
//! simulated vehicle or scripted collaborators.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use comms_if::{
    eqpt::{
        ManualCommand, MotorDriver, MotorDriverError, Telemetry, TelemetrySource, ThrusterMap,
    },
    tc::Tc,
};
use rov_lib::{
    ctrl_loop::{CtrlHandle, CtrlLoop, CtrlLoopError},
    data_store::DataStore,
    params::RovExecParams,
    pilot::PilotLink,
    sim_client::{SimParams, SimVehicle},
    tm_publisher::TmPacket,
};

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

const DT: Duration = Duration::from_millis(50);

/// A control loop running against a stepped simulated vehicle.
struct SimRig {
    ctrl_loop: CtrlLoop<SimVehicle, PilotLink, SimVehicle>,
    handle: CtrlHandle,
    sim: SimVehicle,
    pilot: PilotLink,
    now: Instant,
}

impl SimRig {
    fn new(initial_depth_ft: f64) -> Self {
        let now = Instant::now();
        let sim = SimVehicle::stepped(
            SimParams {
                initial_depth_ft,
                ..Default::default()
            },
            now,
        );
        let pilot = PilotLink::new();

        let (ctrl_loop, handle) = CtrlLoop::new(
            RovExecParams::default(),
            DataStore::default(),
            sim.clone(),
            pilot.clone(),
            sim.clone(),
        );

        let mut rig = Self {
            ctrl_loop,
            handle,
            sim,
            pilot,
            now,
        };

        // First cycle observes the starting depth
        rig.ctrl_loop.tick(rig.now);

        rig
    }

    fn step(&mut self) -> Arc<TmPacket> {
        self.sim.advance(DT);
        self.now += DT;
        self.ctrl_loop.tick(self.now)
    }

    fn step_n(&mut self, n: usize) -> Arc<TmPacket> {
        for _ in 0..n.saturating_sub(1) {
            self.step();
        }
        self.step()
    }
}

/// Telemetry source replaying a fixed list of samples, then nothing.
struct ScriptedTelem {
    samples: VecDeque<Option<Telemetry>>,
}

impl TelemetrySource for ScriptedTelem {
    fn read(&mut self) -> Option<Telemetry> {
        self.samples.pop_front().flatten()
    }
}

/// Motor driver which can be made to fail.
#[derive(Default)]
struct FlakyDriver {
    fail: bool,
}

impl MotorDriver for FlakyDriver {
    fn apply(&mut self, dems: &ThrusterMap) -> Result<(), MotorDriverError> {
        if self.fail {
            return Err(MotorDriverError::NotConnected);
        }
        assert!(!dems.is_empty());
        Ok(())
    }
}

/// Telemetry source that always reports a fixed depth with fresh timestamps.
struct ConstTelem {
    depth_ft: f64,
    now: Instant,
}

impl TelemetrySource for ConstTelem {
    fn read(&mut self) -> Option<Telemetry> {
        self.now += DT;
        Some(Telemetry::from_depth(self.depth_ft, self.now))
    }
}

/// Telemetry source that pulls the emergency stop from inside its read on a given cycle, the
/// way a watchdog on another thread could while the cycle is running.
struct StoppingTelem {
    inner: ConstTelem,
    handle: Arc<Mutex<Option<CtrlHandle>>>,
    stop_on_read: usize,
    num_reads: usize,
}

impl TelemetrySource for StoppingTelem {
    fn read(&mut self) -> Option<Telemetry> {
        self.num_reads += 1;
        if self.num_reads == self.stop_on_read {
            if let Some(ref h) = *self.handle.lock() {
                h.emergency_stop();
            }
        }
        self.inner.read()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[test]
fn test_go_to_depth_closed_loop() {
    let mut rig = SimRig::new(2.0);

    rig.handle.go_to_depth(10.0).unwrap();

    // 60 s at 20 Hz
    let tm = rig.step_n(1200);

    assert!(tm.depth_hold.enabled);
    assert_eq!(tm.depth_hold.target_depth_ft, 10.0);
    assert!(
        (rig.sim.depth_ft() - 10.0).abs() < 0.5,
        "depth {} ft",
        rig.sim.depth_ft()
    );
    assert!(tm.depth_hold.output.abs() <= 0.8);
}

#[test]
fn test_enable_holds_current_depth() {
    let mut rig = SimRig::new(6.0);

    rig.handle.enable_depth_hold().unwrap();
    let tm = rig.step();

    assert!(tm.depth_hold.enabled);
    assert!((tm.depth_hold.target_depth_ft - 6.0).abs() < 1e-9);
    assert_eq!(tm.depth_hold.output, 0.0);
    assert!(tm.thrust.all_zero());
}

#[test]
fn test_stale_telemetry_disables_depth_hold() {
    let mut rig = SimRig::new(5.0);

    rig.handle.go_to_depth(8.0).unwrap();
    rig.step_n(5);

    rig.sim.set_dropout(true);

    let tm = rig.step_n(2);
    assert!(tm.depth_hold.enabled);
    assert!(!tm.depth_hold.stale_telemetry);

    let tm = rig.step();
    assert!(!tm.depth_hold.enabled);
    assert!(tm.depth_hold.stale_telemetry);
    assert_eq!(tm.depth_ft, None);

    // Going to a depth while still stale is undone on the next cycle
    rig.handle.go_to_depth(8.0).unwrap();
    let tm = rig.step();
    assert!(!tm.depth_hold.enabled);

    // Telemetry returns but hold must be re-enabled explicitly
    rig.sim.set_dropout(false);
    let tm = rig.step();
    assert!(!tm.depth_hold.enabled);
    assert!(tm.depth_ft.is_some());

    rig.handle.enable_depth_hold().unwrap();
    let tm = rig.step();
    assert!(tm.depth_hold.enabled);
    assert!(!tm.depth_hold.stale_telemetry);
}

#[test]
fn test_invalid_depth_counts_as_missed() {
    let t0 = Instant::now();
    let mut samples: VecDeque<Option<Telemetry>> = VecDeque::new();
    samples.push_back(Some(Telemetry::from_depth(5.0, t0)));
    samples.push_back(Some(Telemetry::from_depth(5.0, t0 + DT)));
    // Non-finite, repeated timestamp, missing
    samples.push_back(Some(Telemetry::from_depth(f64::NAN, t0 + DT * 2)));
    samples.push_back(Some(Telemetry::from_depth(5.0, t0 + DT)));
    samples.push_back(None);

    let (mut ctrl_loop, handle) = CtrlLoop::new(
        RovExecParams::default(),
        DataStore::default(),
        ScriptedTelem { samples },
        PilotLink::new(),
        FlakyDriver::default(),
    );

    ctrl_loop.tick(t0);
    handle.go_to_depth(7.0).unwrap();
    let tm = ctrl_loop.tick(t0 + DT);
    assert!(tm.depth_hold.enabled);
    let held_output = tm.depth_hold.output;

    let tm = ctrl_loop.tick(t0 + DT * 2);
    assert!(tm.depth_hold.enabled);
    assert_eq!(tm.depth_hold.output, held_output);

    let tm = ctrl_loop.tick(t0 + DT * 3);
    assert!(tm.depth_hold.enabled);

    let tm = ctrl_loop.tick(t0 + DT * 4);
    assert!(!tm.depth_hold.enabled);
    assert!(tm.depth_hold.stale_telemetry);
    assert_eq!(ctrl_loop.data_store().num_consec_missed_telem, 3);
}

#[test]
fn test_emergency_stop() {
    let mut rig = SimRig::new(5.0);

    rig.handle.go_to_depth(20.0).unwrap();
    rig.pilot.send(ManualCommand {
        surge: 1.0,
        yaw_rate: 0.5,
        ..Default::default()
    });
    let tm = rig.step_n(10);
    assert!(!tm.thrust.all_zero());

    rig.handle.emergency_stop();
    rig.pilot.send(ManualCommand {
        surge: 1.0,
        descend: 1.0,
        ..Default::default()
    });
    let tm = rig.step();

    assert!(tm.safety.emergency_stopped);
    assert!(tm.thrust_status.emergency_stopped);
    assert!(tm.thrust.all_zero());
    assert_eq!(tm.thrust.len(), 8);
    assert!(!tm.depth_hold.enabled);
    assert_eq!(tm.confirmed_thrust.as_ref(), Some(&tm.thrust));

    // Everything but a reset is ignored while stopped
    rig.handle.go_to_depth(10.0).unwrap();
    let tm = rig.step();
    assert!(!tm.depth_hold.enabled);
    assert!(tm.thrust.all_zero());

    // Reset does not resume depth hold
    rig.handle.reset_stop().unwrap();
    let tm = rig.step();
    assert!(!tm.safety.emergency_stopped);
    assert!(!tm.depth_hold.enabled);
}

#[test]
fn test_emergency_stop_during_cycle() {
    let now = Instant::now();
    let handle_slot = Arc::new(Mutex::new(None));
    let telem = StoppingTelem {
        inner: ConstTelem { depth_ft: 5.0, now },
        handle: handle_slot.clone(),
        stop_on_read: 3,
        num_reads: 0,
    };
    let pilot = PilotLink::new();

    let (mut ctrl_loop, handle) = CtrlLoop::new(
        RovExecParams::default(),
        DataStore::default(),
        telem,
        pilot.clone(),
        FlakyDriver::default(),
    );
    *handle_slot.lock() = Some(handle.clone());

    pilot.send(ManualCommand {
        surge: 1.0,
        ..Default::default()
    });
    ctrl_loop.tick(now);
    handle.go_to_depth(20.0).unwrap();

    let tm = ctrl_loop.tick(now + DT);
    assert!(tm.depth_hold.enabled);
    assert!(!tm.thrust.all_zero());

    // The stop arrives after the requests for this cycle have been applied
    let tm = ctrl_loop.tick(now + 2 * DT);
    assert!(tm.safety.emergency_stopped);
    assert!(tm.thrust_status.emergency_stopped);
    assert!(tm.thrust.all_zero());
    assert!(!tm.depth_hold.enabled);
    assert_eq!(tm.depth_hold.output, 0.0);
}

#[test]
fn test_emergency_stop_drops_same_cycle_requests() {
    let mut rig = SimRig::new(5.0);

    rig.handle.go_to_depth(10.0).unwrap();
    rig.handle.send_tc(Tc::EmergencyStop).unwrap();
    rig.handle.reset_stop().unwrap();

    let tm = rig.step();
    assert!(tm.safety.emergency_stopped);
    assert!(!tm.depth_hold.enabled);
}

#[test]
fn test_automatic_vertical_priority() {
    let mut rig = SimRig::new(5.0);

    rig.handle.go_to_depth(12.0).unwrap();

    for _ in 0..20 {
        rig.pilot.send(ManualCommand {
            ascend: 1.0,
            ..Default::default()
        });
        let tm = rig.step();

        assert!(tm.depth_hold.enabled);
        assert_eq!(tm.thrust.get("vert_fore_up"), Some(0.0));
        assert_eq!(tm.thrust.get("vert_aft_up"), Some(0.0));
        assert!(tm.thrust.get("vert_fore_down").unwrap() > 0.0);
    }

    // Manual authority returns once depth hold is disabled
    rig.handle.disable_depth_hold().unwrap();
    rig.pilot.send(ManualCommand {
        ascend: 1.0,
        ..Default::default()
    });
    let tm = rig.step_n(10);
    assert!(!tm.depth_hold.enabled);
    assert_eq!(tm.thrust.get("vert_fore_down"), Some(0.0));
    assert!(tm.thrust.get("vert_fore_up").unwrap() > 0.0);
}

#[test]
fn test_pilot_watchdog() {
    let mut rig = SimRig::new(5.0);

    rig.pilot.send(ManualCommand {
        surge: 1.0,
        ..Default::default()
    });
    let tm = rig.step_n(8);
    assert!(!tm.pilot_timed_out);
    assert!(tm.thrust.get("fwd_left").unwrap() > 0.9);

    // No new command for over 0.5 s, then ramped down to zero
    let tm = rig.step_n(12);
    assert!(tm.pilot_timed_out);
    assert_eq!(tm.thrust.get("fwd_left"), Some(0.0));

    // A new command restores control
    rig.pilot.send(ManualCommand {
        surge: 0.5,
        ..Default::default()
    });
    let tm = rig.step();
    assert!(!tm.pilot_timed_out);
}

#[test]
fn test_handle_rejects_invalid_requests() {
    let rig = SimRig::new(5.0);

    assert!(matches!(
        rig.handle.go_to_depth(-2.0),
        Err(CtrlLoopError::InvalidRequest(_))
    ));
    assert!(matches!(
        rig.handle.set_target(1.0e6),
        Err(CtrlLoopError::InvalidRequest(_))
    ));
    assert!(matches!(
        rig.handle.tune(0.5, f64::NAN, 0.1),
        Err(CtrlLoopError::InvalidRequest(_))
    ));
    assert!(rig.handle.tune(0.5, 0.1, 0.1).is_ok());
}

#[test]
fn test_tune_applies_without_reset() {
    let mut rig = SimRig::new(5.0);

    rig.handle.go_to_depth(9.0).unwrap();
    let before = rig.step_n(5).depth_hold;
    assert!(before.integral > 0.0);

    rig.handle.tune(0.3, 0.05, 0.0).unwrap();
    let after = rig.step().depth_hold;

    assert_eq!((after.kp, after.ki, after.kd), (0.3, 0.05, 0.0));
    assert!(after.integral >= before.integral);
}

#[test]
fn test_motor_errors_latch_emergency_stop() {
    let t0 = Instant::now();
    let (mut ctrl_loop, _handle) = CtrlLoop::new(
        RovExecParams::default(),
        DataStore::default(),
        ConstTelem {
            depth_ft: 5.0,
            now: t0,
        },
        PilotLink::new(),
        FlakyDriver { fail: true },
    );

    let mut now = t0;
    for _ in 0..4 {
        now += DT;
        let tm = ctrl_loop.tick(now);
        assert!(!tm.safety.emergency_stopped);
    }

    now += DT;
    let tm = ctrl_loop.tick(now);
    assert!(tm.safety.emergency_stopped);
    assert!(tm.thrust.all_zero());
}

#[test]
fn test_shutdown_zeroes_thrusters() {
    let mut rig = SimRig::new(5.0);

    rig.pilot.send(ManualCommand {
        surge: 1.0,
        ..Default::default()
    });
    rig.step_n(5);

    rig.ctrl_loop.shutdown();

    let confirmed = rig.sim.confirmed().unwrap();
    assert!(confirmed.all_zero());
    assert_eq!(confirmed.len(), 8);
}
