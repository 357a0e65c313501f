//! # Control loop
//!
//! The periodic control task. Each cycle:
//!
//! - Apply every control request received since the last cycle
//! - Read telemetry and track how stale it is
//! - Read the pilot command and run the pilot watchdog
//! - Depth control processing
//! - Thrust control processing
//! - Send the duty cycles to the motor driver
//! - Write archives and publish the telemetry packet, logging a status summary once a second
//!
//! The loop owns the `DataStore`. Everything outside the loop talks to it through a `CtrlHandle`,
//! which validates requests and queues them for the start of the next cycle, so no cycle ever
//! sees a half applied request. The emergency stop bypasses the queue through an atomic flag which
//! is checked both at the start of the cycle and again just before thrust control.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

// Internal
use crate::{
    data_store::DataStore,
    depth_ctrl::{self, DepthCtrlError, DepthHoldStatus, PidGains},
    params::RovExecParams,
    tc_processor,
    thrust_ctrl::{self, VerticalMode},
    tm_publisher::{TmPacket, TmPublisher},
};
use comms_if::{
    eqpt::{ManualCommand, MotorDriver, PilotInputSource, TelemetrySource},
    tc::{DepthHoldCmd, Tc},
};
use util::{archive::Archived, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The control task, generic over its collaborators.
pub struct CtrlLoop<T, P, M> {
    params: RovExecParams,

    ds: DataStore,

    telem_source: T,
    pilot_source: P,
    motor_driver: M,

    tc_rx: Receiver<Tc>,
    estop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    tm: TmPublisher,
}

/// Handle used to send control requests to, and read the state of, a control loop.
#[derive(Clone)]
pub struct CtrlHandle {
    tc_tx: Sender<Tc>,
    estop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    tm: TmPublisher,

    /// Copy of the depth control parameters used to validate targets.
    depth_params: depth_ctrl::Params,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CtrlLoopError {
    #[error("Request rejected: {0}")]
    InvalidRequest(DepthCtrlError),

    #[error("The control loop is no longer running")]
    Disconnected,

    #[error("Could not start the control loop thread: {0}")]
    SpawnError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T, P, M> CtrlLoop<T, P, M>
where
    T: TelemetrySource,
    P: PilotInputSource,
    M: MotorDriver,
{
    /// Create a new control loop and the handle used to command it.
    pub fn new(
        params: RovExecParams,
        ds: DataStore,
        telem_source: T,
        pilot_source: P,
        motor_driver: M,
    ) -> (Self, CtrlHandle) {
        let (tc_tx, tc_rx) = unbounded();
        let estop = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let tm = TmPublisher::new();

        tm.publish(Arc::new(TmPacket::from_datastore(&ds)));

        let handle = CtrlHandle {
            tc_tx,
            estop: estop.clone(),
            running: running.clone(),
            tm: tm.clone(),
            depth_params: ds.depth_ctrl.params.clone(),
        };

        let ctrl_loop = Self {
            params,
            ds,
            telem_source,
            pilot_source,
            motor_driver,
            tc_rx,
            estop,
            running,
            tm,
        };

        (ctrl_loop, handle)
    }

    pub fn data_store(&self) -> &DataStore {
        &self.ds
    }

    /// Run a single control cycle at `now`, returning the published telemetry packet.
    pub fn tick(&mut self, now: Instant) -> Arc<TmPacket> {
        // Clear items that need wiping at the start of the cycle
        self.ds.cycle_start(self.params.cycle_frequency_hz());

        // ---- TELECOMMAND PROCESSING ----

        let mut tcs: Vec<Tc> = self.tc_rx.try_iter().collect();
        if self.estop.swap(false, Ordering::SeqCst) {
            tcs.push(Tc::EmergencyStop);
        }
        if !tcs.is_empty() {
            tc_processor::exec_batch(&mut self.ds, &tcs);
        }

        // ---- DATA INPUT ----

        self.acquire_telem();
        self.acquire_pilot(now);

        // ---- CONTROL ALGORITHM PROCESSING ----

        // DepthCtrl processing
        let depth_input = depth_ctrl::InputData {
            depth_ft: self.ds.telem.map(|t| t.depth_ft),
            now: self.ds.telem.map(|t| t.timestamp).unwrap_or(now),
        };

        match self.ds.depth_ctrl.proc(&depth_input) {
            Ok((o, r)) => {
                self.ds.depth_ctrl_output = o;
                self.ds.depth_ctrl_status_rpt = r;
            }
            Err(e) => {
                warn!("Error during DepthCtrl processing: {}", e);
                self.ds.depth_ctrl_output = VerticalMode::Manual;
            }
        }

        // An emergency stop requested during this cycle takes effect before any thrust is
        // computed
        if self.estop.swap(false, Ordering::SeqCst) {
            tc_processor::exec(&mut self.ds, &Tc::EmergencyStop);
            self.ds.depth_ctrl_output = VerticalMode::Manual;
            self.ds.depth_ctrl_status_rpt = self.ds.depth_ctrl.status();
        }

        // ThrustCtrl processing
        let thrust_input = thrust_ctrl::InputData {
            manual: self.ds.manual,
            vertical: self.ds.depth_ctrl_output,
            safety: self.ds.safety,
        };

        match self.ds.thrust_ctrl.proc(&thrust_input) {
            Ok((o, r)) => {
                self.ds.thrust_ctrl_output = o;
                self.ds.thrust_ctrl_status_rpt = r;
            }
            Err(e) => {
                warn!("Error during ThrustCtrl processing: {}", e);
                self.ds.thrust_ctrl_output = self.ds.thrust_ctrl.neutral_output();
            }
        }

        // ---- DATA OUTPUT ----

        self.send_demands();

        // ---- WRITE ARCHIVES ----

        if self.params.archive {
            if let Err(e) = self.ds.depth_ctrl.write() {
                warn!("Could not write the DepthCtrl archive: {}", e);
            }
            if let Err(e) = self.ds.thrust_ctrl.write() {
                warn!("Could not write the ThrustCtrl archive: {}", e);
            }
        }

        // ---- TELEMETRY ----

        let packet = Arc::new(TmPacket::from_datastore(&self.ds));
        self.tm.publish(packet.clone());

        if self.ds.is_1_hz_cycle {
            report_status(&packet);
        }

        self.ds.num_cycles += 1;

        packet
    }

    /// Run cycles at the configured rate until the handle requests a stop, then set every
    /// thruster to zero.
    pub fn run(mut self) -> Self {
        let cycle_period = Duration::from_secs_f64(self.params.cycle_period_s);

        info!("Begining control loop");

        while self.running.load(Ordering::SeqCst) {
            // Get cycle start time
            let cycle_start_instant = Instant::now();

            self.tick(cycle_start_instant);

            // ---- CYCLE MANAGEMENT ----

            let cycle_dur = Instant::now() - cycle_start_instant;

            // Get sleep duration
            match cycle_period.checked_sub(cycle_dur) {
                Some(d) => {
                    self.ds.num_consec_cycle_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                    );
                    self.ds.num_consec_cycle_overruns += 1;
                }
            }
        }

        self.shutdown();

        self
    }

    /// Move the loop onto its own thread.
    pub fn spawn(self) -> Result<JoinHandle<Self>, CtrlLoopError>
    where
        T: Send + 'static,
        P: Send + 'static,
        M: Send + 'static,
    {
        thread::Builder::new()
            .name("ctrl_loop".into())
            .spawn(move || self.run())
            .map_err(CtrlLoopError::SpawnError)
    }

    /// Zero every thruster.
    pub fn shutdown(&mut self) {
        let neutral = self.ds.thrust_ctrl.neutral_output();

        match self.motor_driver.apply(&neutral) {
            Ok(()) => info!("Control loop stopped, thrusters zeroed"),
            Err(e) => error!("Could not zero the thrusters at shutdown: {}", e),
        }

        self.ds.thrust_ctrl_output = neutral;
    }

    /// Read telemetry and update the stale data tracking.
    ///
    /// A sample is only fresh if its depth is finite and it is newer than the last fresh sample.
    fn acquire_telem(&mut self) {
        let sample = self.telem_source.read();

        let fresh = match sample {
            Some(t) if !t.depth_valid() => {
                debug!("Telemetry depth is not finite ({})", t.depth_ft);
                None
            }
            Some(t) => match self.ds.last_telem {
                Some(l) if t.timestamp <= l.timestamp => {
                    debug!("Telemetry sample repeated");
                    None
                }
                _ => Some(t),
            },
            None => None,
        };

        match fresh {
            Some(t) => {
                if self.ds.num_consec_missed_telem >= self.params.stale_telem_limit {
                    info!("Telemetry restored");
                }
                self.ds.telem = Some(t);
                self.ds.last_telem = Some(t);
                self.ds.num_consec_missed_telem = 0;
            }
            None => {
                self.ds.num_consec_missed_telem += 1;

                if self.ds.num_consec_missed_telem >= self.params.stale_telem_limit {
                    if self.ds.num_consec_missed_telem == self.params.stale_telem_limit {
                        warn!(
                            "No fresh telemetry for {} cycles, telemetry is stale",
                            self.ds.num_consec_missed_telem
                        );
                    }

                    self.ds.depth_ctrl.mark_stale();
                    self.ds.last_telem = None;
                }
            }
        }
    }

    /// Read the pilot command, substituting a neutral command if the pilot has gone quiet.
    fn acquire_pilot(&mut self, now: Instant) {
        match self.pilot_source.poll() {
            Some(cmd) => {
                if self.ds.pilot_timed_out {
                    info!("Pilot commands restored");
                }
                self.ds.manual = cmd;
                self.ds.manual_rx_instant = Some(now);
                self.ds.pilot_timed_out = false;
            }
            None => {
                let timeout = Duration::from_secs_f64(self.params.pilot_timeout_s);
                let expired = self
                    .ds
                    .manual_rx_instant
                    .map(|rx| now.saturating_duration_since(rx) > timeout)
                    .unwrap_or(false);

                if expired && !self.ds.pilot_timed_out {
                    warn!(
                        "No pilot command for {:.2} s, using a neutral command",
                        self.params.pilot_timeout_s
                    );
                    self.ds.pilot_timed_out = true;
                }

                if self.ds.pilot_timed_out {
                    self.ds.manual = ManualCommand::neutral();
                }
            }
        }
    }

    /// Send this cycle's output to the motor driver.
    fn send_demands(&mut self) {
        match self.motor_driver.apply(&self.ds.thrust_ctrl_output) {
            Ok(()) => self.ds.num_consec_motor_errors = 0,
            Err(e) => {
                self.ds.num_consec_motor_errors += 1;
                warn!("MotorDriver error: {}", e);

                if self.ds.num_consec_motor_errors >= self.params.max_motor_errors
                    && !self.ds.safety.emergency_stopped
                {
                    error!(
                        "Maximum number of consecutive MotorDriver errors ({}) reached",
                        self.params.max_motor_errors
                    );
                    self.ds.emergency_stop();
                }
            }
        }

        self.ds.confirmed_thrust = self.motor_driver.confirmed();
    }
}

/// Log a one line summary of a telemetry packet.
fn report_status(tm: &TmPacket) {
    let dh = tm.depth_hold;

    info!(
        "depth = {}, hold = {} (target {:.2} ft, output {:.2}), estop = {}, overruns = {}",
        tm.depth_ft
            .map(|d| format!("{:.2} ft", d))
            .unwrap_or_else(|| "stale".into()),
        dh.enabled,
        dh.target_depth_ft,
        dh.output,
        tm.safety.emergency_stopped,
        tm.num_consec_cycle_overruns
    );
}

impl CtrlHandle {
    /// Hold the current depth.
    pub fn enable_depth_hold(&self) -> Result<(), CtrlLoopError> {
        self.send_tc(Tc::DepthHold(DepthHoldCmd::Enable))
    }

    pub fn disable_depth_hold(&self) -> Result<(), CtrlLoopError> {
        self.send_tc(Tc::DepthHold(DepthHoldCmd::Disable))
    }

    /// Change the depth hold target, rejected immediately if out of range.
    pub fn set_target(&self, depth_ft: f64) -> Result<(), CtrlLoopError> {
        self.send_tc(Tc::DepthHold(DepthHoldCmd::SetTarget { depth_ft }))
    }

    /// Hold a new depth, rejected immediately if out of range.
    pub fn go_to_depth(&self, depth_ft: f64) -> Result<(), CtrlLoopError> {
        self.send_tc(Tc::DepthHold(DepthHoldCmd::GoTo { depth_ft }))
    }

    /// Retune the depth controller, rejected immediately if any gain is invalid.
    pub fn tune(&self, kp: f64, ki: f64, kd: f64) -> Result<(), CtrlLoopError> {
        self.send_tc(Tc::DepthHold(DepthHoldCmd::Tune { kp, ki, kd }))
    }

    /// Latch the emergency stop at the next opportunity. Never blocks and never fails.
    pub fn emergency_stop(&self) {
        self.estop.store(true, Ordering::SeqCst);
    }

    pub fn reset_stop(&self) -> Result<(), CtrlLoopError> {
        self.send_tc(Tc::ResetStop)
    }

    /// Validate a telecommand and queue it for the next cycle.
    pub fn send_tc(&self, tc: Tc) -> Result<(), CtrlLoopError> {
        match tc {
            Tc::EmergencyStop => {
                self.emergency_stop();
                return Ok(());
            }
            Tc::DepthHold(DepthHoldCmd::SetTarget { depth_ft })
            | Tc::DepthHold(DepthHoldCmd::GoTo { depth_ft }) => self
                .depth_params
                .validate_target(depth_ft)
                .map_err(CtrlLoopError::InvalidRequest)?,
            Tc::DepthHold(DepthHoldCmd::Tune { kp, ki, kd }) => {
                PidGains::new(kp, ki, kd).map_err(CtrlLoopError::InvalidRequest)?;
            }
            _ => (),
        }

        self.tc_tx
            .send(tc)
            .map_err(|_| CtrlLoopError::Disconnected)
    }

    /// Latest published telemetry packet.
    pub fn status(&self) -> Arc<TmPacket> {
        self.tm.latest()
    }

    pub fn depth_hold_status(&self) -> DepthHoldStatus {
        self.tm.latest().depth_hold
    }

    /// Ask a running loop to stop at the end of its current cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
