//! Implementations for the DepthCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::time::Instant;

// Internal
use super::{DepthCtrlError, Params, PidGains, PidState};
use crate::thrust_ctrl::VerticalMode;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Depth control module state
pub struct DepthCtrl {
    pub(crate) params: Params,

    pid: PidState,

    enabled: bool,

    /// Depth to hold.
    ///
    /// Units: feet
    target_depth_ft: f64,

    /// Most recent valid depth, `None` if none has been seen since startup or since telemetry
    /// went stale.
    current_depth_ft: Option<f64>,

    current_error_ft: f64,

    last_output: f64,
    output_saturated: bool,
    stale_telemetry: bool,

    arch_status: Archiver,
}

/// Input data to depth control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// Fresh depth reading for this cycle, or `None` if no new sample arrived.
    pub depth_ft: Option<f64>,

    /// Time of the sample.
    pub now: Instant,
}

/// Externally visible snapshot of the depth hold state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DepthHoldStatus {
    pub enabled: bool,
    pub target_depth_ft: f64,
    pub current_depth_ft: Option<f64>,
    pub current_error_ft: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral: f64,
    pub output: f64,

    /// The last output was clamped to the maximum output.
    pub output_saturated: bool,

    /// Depth hold was disabled because telemetry stopped arriving.
    pub stale_telemetry: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DepthCtrl {
    fn default() -> Self {
        let params = Params::default();
        let gains = PidGains {
            kp: params.k_p,
            ki: params.k_i,
            kd: params.k_d,
        };

        Self::with_gains(params, gains)
    }
}

impl DepthCtrl {
    /// Create a new controller from a set of parameters.
    pub fn new(params: Params) -> Result<Self, DepthCtrlError> {
        params.validate()?;
        let gains = PidGains::new(params.k_p, params.k_i, params.k_d)?;

        Ok(Self::with_gains(params, gains))
    }

    fn with_gains(params: Params, gains: PidGains) -> Self {
        Self {
            params,
            pid: PidState::new(gains),
            enabled: false,
            target_depth_ft: 0.0,
            current_depth_ft: None,
            current_error_ft: 0.0,
            last_output: 0.0,
            output_saturated: false,
            stale_telemetry: false,
            arch_status: Archiver::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Hold the current depth.
    ///
    /// Does nothing if depth hold is already enabled. Fails with `NoDepth` if no valid depth
    /// reading is known.
    pub fn enable(&mut self) -> Result<(), DepthCtrlError> {
        if self.enabled {
            return Ok(());
        }

        let depth = self.current_depth_ft.ok_or(DepthCtrlError::NoDepth)?;

        self.target_depth_ft = depth;
        self.engage();

        info!("Depth hold enabled at {:.2} ft", depth);

        Ok(())
    }

    /// Stop holding depth.
    ///
    /// Gains are kept. The last target stays visible in the status only, `enable` captures a new
    /// one from the current depth.
    pub fn disable(&mut self) {
        if self.enabled {
            info!("Depth hold disabled");
        }

        self.enabled = false;
        self.current_error_ft = 0.0;
        self.last_output = 0.0;
        self.output_saturated = false;
    }

    /// Change the target depth without resetting the loop state and without enabling.
    pub fn set_target(&mut self, depth_ft: f64) -> Result<(), DepthCtrlError> {
        self.params.validate_target(depth_ft)?;

        self.target_depth_ft = depth_ft;

        info!("Depth hold target set to {:.2} ft", depth_ft);

        Ok(())
    }

    /// Set a new target, reset the loop state and enable depth hold.
    pub fn go_to_depth(&mut self, depth_ft: f64) -> Result<(), DepthCtrlError> {
        self.params.validate_target(depth_ft)?;

        self.target_depth_ft = depth_ft;
        self.engage();

        info!("Depth hold going to {:.2} ft", depth_ft);

        Ok(())
    }

    /// Replace the gains live, keeping the integral.
    pub fn tune(&mut self, kp: f64, ki: f64, kd: f64) -> Result<(), DepthCtrlError> {
        let gains = PidGains::new(kp, ki, kd)?;

        self.pid.set_gains(gains, &self.params);

        info!(
            "Depth hold gains set to kp = {}, ki = {}, kd = {}",
            kp, ki, kd
        );

        Ok(())
    }

    /// Record a depth reading without running the loop.
    pub fn observe_depth(&mut self, depth_ft: f64) {
        if depth_ft.is_finite() {
            self.current_depth_ft = Some(depth_ft);
        }
    }

    /// Run one update of the controller, returning the signed vertical correction.
    ///
    /// Returns zero without touching the loop state when disabled. A non-finite depth leaves the
    /// loop untouched and returns the previous output.
    pub fn update(&mut self, depth_ft: f64, now: Instant) -> f64 {
        if !depth_ft.is_finite() {
            return if self.enabled { self.last_output } else { 0.0 };
        }

        self.observe_depth(depth_ft);

        if !self.enabled {
            return 0.0;
        }

        let error = self.target_depth_ft - depth_ft;
        let step = self.pid.step(error, now, &self.params);

        if step.saturated && !self.output_saturated {
            debug!(
                "Depth hold output saturated at {:.2} (error {:.2} ft)",
                step.output, error
            );
        }

        self.current_error_ft = error;
        self.last_output = step.output;
        self.output_saturated = step.saturated;

        trace!(
            "DepthCtrl: error = {:.3} ft, integral = {:.3}, output = {:.3}",
            error,
            self.pid.integral(),
            step.output
        );

        step.output
    }

    /// Telemetry has gone stale: stop holding and forget the current depth.
    pub fn mark_stale(&mut self) {
        if self.enabled {
            warn!("Depth hold disabled: telemetry is stale");
        }

        self.disable();
        self.current_depth_ft = None;
        self.stale_telemetry = true;
    }

    /// Get a snapshot of the controller.
    pub fn status(&self) -> DepthHoldStatus {
        let gains = self.pid.gains();

        DepthHoldStatus {
            enabled: self.enabled,
            target_depth_ft: self.target_depth_ft,
            current_depth_ft: self.current_depth_ft,
            current_error_ft: self.current_error_ft,
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            integral: self.pid.integral(),
            output: self.last_output,
            output_saturated: self.output_saturated,
            stale_telemetry: self.stale_telemetry,
        }
    }

    fn engage(&mut self) {
        self.pid.reset();
        self.enabled = true;
        self.current_error_ft = 0.0;
        self.last_output = 0.0;
        self.output_saturated = false;
        self.stale_telemetry = false;
    }
}

impl State for DepthCtrl {
    type InitData = &'static str;
    type InitError = DepthCtrlError;

    type InputData = InputData;
    type OutputData = VerticalMode;
    type StatusReport = DepthHoldStatus;
    type ProcError = DepthCtrlError;

    /// Initialise the DepthCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data).map_err(DepthCtrlError::ParamsLoadError)?;

        *self = Self::new(params)?;

        self.arch_status = Archiver::from_path(session, "depth_ctrl/status.csv")
            .map_err(DepthCtrlError::ArchiveError)?;

        Ok(())
    }

    /// Perform cyclic processing of depth control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let output = match input_data.depth_ft {
            Some(d) => self.update(d, input_data.now),
            None if self.enabled => self.last_output,
            None => 0.0,
        };

        let mode = if self.enabled {
            VerticalMode::Automatic(output)
        } else {
            VerticalMode::Manual
        };

        Ok((mode, self.status()))
    }

    fn make_safe(&mut self) {
        self.disable();
    }
}

impl Archived for DepthCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let status = self.status();
        self.arch_status.serialise(status)
    }
}
