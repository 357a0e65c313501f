//! Implementations for the ThrustCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{Params, RampLimiter, ThrustCtrlError, ThrusterRole, VerticalMode};
use crate::safety::SafetyState;
use comms_if::eqpt::{ManualCommand, ThrusterMap};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::{clamp_sym, deadband, finite_or_zero},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Thrust control module state
pub struct ThrustCtrl {
    pub(crate) params: Params,

    ramp: RampLimiter,

    pub(crate) report: StatusReport,
    arch_report: Archiver,
}

/// Input data to thrust control.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// The pilot's command for this cycle.
    pub manual: ManualCommand,

    /// Vertical axis authority for this cycle.
    pub vertical: VerticalMode,

    /// The safety state at the time of arbitration.
    pub safety: SafetyState,
}

/// Status report for ThrustCtrl processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// All outputs were forced to zero by the emergency stop.
    pub emergency_stopped: bool,

    /// The vertical channels were driven by depth hold.
    pub automatic: bool,

    /// Signed vertical duty before the safety limit, positive descends.
    pub vertical_duty: f64,

    /// Number of horizontal thrusters whose mixed demand exceeded full scale.
    pub num_mix_saturated: usize,

    /// Number of thrusters limited by the safety maximum output.
    pub num_max_output_limited: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ThrustCtrl {
    fn default() -> Self {
        Self::with_params(Params::default())
    }
}

impl ThrustCtrl {
    /// Create a new arbiter, checking the thruster layout.
    pub fn new(params: Params) -> Result<Self, ThrustCtrlError> {
        params.validate()?;
        Ok(Self::with_params(params))
    }

    fn with_params(params: Params) -> Self {
        Self {
            ramp: RampLimiter::new(params.ramp_rate()),
            params,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// A map with every configured thruster at zero duty.
    pub fn neutral_output(&self) -> ThrusterMap {
        ThrusterMap::zeroed(self.params.thruster_ids())
    }

    /// Merge the pilot's command and the vertical mode into per-thruster duty cycles, under the
    /// given safety state.
    ///
    /// Every configured thruster appears exactly once in the returned map. Non-finite inputs are
    /// treated as zero.
    pub fn arbitrate(
        &mut self,
        manual: &ManualCommand,
        vertical: VerticalMode,
        safety: &SafetyState,
    ) -> ThrusterMap {
        self.report = StatusReport::default();

        let mut output = self.neutral_output();

        if safety.emergency_stopped {
            self.report.emergency_stopped = true;
            return output;
        }

        // Condition the pilot's inputs
        let db = self.params.input_deadband;
        let axis = |x: f64| deadband(finite_or_zero(x).max(-1.0).min(1.0), db);
        let axes = [axis(manual.surge), axis(manual.sway), axis(manual.yaw_rate)];
        let unit = |x: f64| finite_or_zero(x).max(0.0).min(1.0);

        let vertical_duty = match vertical {
            VerticalMode::Manual => (unit(manual.descend) - unit(manual.ascend)).max(-1.0).min(1.0),
            VerticalMode::Automatic(v) => {
                self.report.automatic = true;
                finite_or_zero(v).max(-1.0).min(1.0)
            }
        };
        self.report.vertical_duty = vertical_duty;

        let limit = finite_or_zero(safety.max_output).max(0.0).min(1.0);

        for thruster in self.params.thrusters.iter() {
            let demand = match thruster.role {
                ThrusterRole::Horizontal => {
                    let mixed = self
                        .params
                        .mix
                        .get(&thruster.id)
                        .map(|row| row[0] * axes[0] + row[1] * axes[1] + row[2] * axes[2])
                        .unwrap_or(0.0);

                    let (d, saturated) = clamp_sym(mixed, 1.0);
                    if saturated {
                        self.report.num_mix_saturated += 1;
                    }
                    d
                }
                ThrusterRole::Descend => vertical_duty.max(0.0),
                ThrusterRole::Ascend => (-vertical_duty).max(0.0),
            };

            let (duty, limited) = clamp_sym(demand, limit);
            if limited {
                self.report.num_max_output_limited += 1;
            }

            output.duty.insert(thruster.id.clone(), duty);
        }

        trace!("ThrustCtrl output: {:?}", output.duty);

        output
    }
}

impl State for ThrustCtrl {
    type InitData = &'static str;
    type InitError = ThrustCtrlError;

    type InputData = InputData;
    type OutputData = ThrusterMap;
    type StatusReport = StatusReport;
    type ProcError = ThrustCtrlError;

    /// Initialise the ThrustCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params =
            params::load(init_data).map_err(ThrustCtrlError::ParamsLoadError)?;

        *self = Self::new(params)?;

        self.arch_report = Archiver::from_path(session, "thrust_ctrl/status.csv")
            .map_err(ThrustCtrlError::ArchiveError)?;

        Ok(())
    }

    /// Arbitrate and ramp limit the output.
    ///
    /// An emergency stop output is never ramped.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let target = self.arbitrate(&input_data.manual, input_data.vertical, &input_data.safety);

        let output = if input_data.safety.emergency_stopped {
            self.ramp.force(&target);
            target
        } else {
            self.ramp.apply(&target)
        };

        Ok((output, self.report))
    }

    fn make_safe(&mut self) {
        self.ramp.reset();
    }
}

impl Archived for ThrustCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    fn manual(surge: f64, sway: f64, yaw_rate: f64, ascend: f64, descend: f64) -> ManualCommand {
        ManualCommand {
            surge,
            sway,
            yaw_rate,
            ascend,
            descend,
        }
    }

    #[test]
    fn test_every_thruster_present() {
        let mut tc = ThrustCtrl::default();
        let out = tc.arbitrate(
            &ManualCommand::default(),
            VerticalMode::Manual,
            &SafetyState::default(),
        );

        assert_eq!(out.len(), 8);
        assert!(out.all_zero());
        for id in tc.params().thruster_ids() {
            assert!(out.get(id).is_some());
        }
    }

    #[test]
    fn test_emergency_stop_all_zero() {
        let mut tc = ThrustCtrl::default();
        let mut safety = SafetyState::default();
        safety.emergency_stop();

        let out = tc.arbitrate(
            &manual(1.0, -1.0, 0.5, 0.0, 1.0),
            VerticalMode::Automatic(0.8),
            &safety,
        );

        assert_eq!(out.len(), 8);
        assert!(out.all_zero());
        assert!(tc.report.emergency_stopped);
    }

    #[test]
    fn test_horizontal_mix() {
        let mut tc = ThrustCtrl::new(Params {
            input_deadband: 0.0,
            ..Default::default()
        })
        .unwrap();

        let out = tc.arbitrate(
            &manual(0.5, 0.0, 0.0, 0.0, 0.0),
            VerticalMode::Manual,
            &SafetyState::default(),
        );
        for id in &["fwd_left", "fwd_right", "aft_left", "aft_right"] {
            assert!(close(out.get(id), 0.5));
        }

        let out = tc.arbitrate(
            &manual(0.0, 0.0, 0.4, 0.0, 0.0),
            VerticalMode::Manual,
            &SafetyState::default(),
        );
        assert!(close(out.get("fwd_left"), 0.4));
        assert!(close(out.get("fwd_right"), -0.4));
        assert!(close(out.get("aft_left"), 0.4));
        assert!(close(out.get("aft_right"), -0.4));

        // Combined demands are clamped to full scale
        let out = tc.arbitrate(
            &manual(1.0, 1.0, 1.0, 0.0, 0.0),
            VerticalMode::Manual,
            &SafetyState::default(),
        );
        assert!(close(out.get("fwd_left"), 1.0));
        assert!(tc.report.num_mix_saturated > 0);
    }

    #[test]
    fn test_manual_vertical() {
        let mut tc = ThrustCtrl::default();

        let out = tc.arbitrate(
            &manual(0.0, 0.0, 0.0, 0.2, 0.7),
            VerticalMode::Manual,
            &SafetyState::default(),
        );
        assert!(close(out.get("vert_fore_down"), 0.5));
        assert!(close(out.get("vert_aft_down"), 0.5));
        assert!(close(out.get("vert_fore_up"), 0.0));

        let out = tc.arbitrate(
            &manual(0.0, 0.0, 0.0, 0.9, 0.0),
            VerticalMode::Manual,
            &SafetyState::default(),
        );
        assert!(close(out.get("vert_fore_up"), 0.9));
        assert!(close(out.get("vert_aft_down"), 0.0));
    }

    #[test]
    fn test_automatic_priority() {
        let mut tc = ThrustCtrl::default();

        for (ascend, descend) in &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.5, 0.5)] {
            let out = tc.arbitrate(
                &manual(0.3, 0.0, 0.0, *ascend, *descend),
                VerticalMode::Automatic(0.5),
                &SafetyState::default(),
            );
            assert!(close(out.get("vert_fore_down"), 0.5));
            assert!(close(out.get("vert_fore_up"), 0.0));
            assert!(tc.report.automatic);
        }

        let out = tc.arbitrate(
            &manual(0.0, 0.0, 0.0, 0.0, 1.0),
            VerticalMode::Automatic(-0.3),
            &SafetyState::default(),
        );
        assert!(close(out.get("vert_aft_up"), 0.3));
        assert!(close(out.get("vert_aft_down"), 0.0));
    }

    #[test]
    fn test_non_finite_inputs() {
        let mut tc = ThrustCtrl::default();

        let out = tc.arbitrate(
            &manual(f64::NAN, f64::INFINITY, f64::NEG_INFINITY, f64::NAN, f64::NAN),
            VerticalMode::Automatic(f64::NAN),
            &SafetyState::default(),
        );

        assert!(out.duty.values().all(|d| d.is_finite()));
        assert!(out.all_zero());
    }

    #[test]
    fn test_max_output_clamp() {
        let mut tc = ThrustCtrl::default();
        let safety = SafetyState::new(0.4).unwrap();

        let out = tc.arbitrate(
            &manual(1.0, 0.0, 0.0, 0.0, 1.0),
            VerticalMode::Manual,
            &safety,
        );

        assert!(out.duty.values().all(|d| d.abs() <= 0.4 + 1e-12));
        assert!(close(out.get("fwd_left"), 0.4));
        assert!(close(out.get("vert_fore_down"), 0.4));
        assert_eq!(tc.report.num_max_output_limited, 6);
    }

    #[test]
    fn test_proc_ramps_but_not_on_stop() {
        let mut tc = ThrustCtrl::default();
        let mut input = InputData {
            manual: manual(1.0, 0.0, 0.0, 0.0, 0.0),
            ..Default::default()
        };

        let (out, _) = tc.proc(&input).unwrap();
        assert!(close(out.get("fwd_left"), 0.15));

        let (out, _) = tc.proc(&input).unwrap();
        assert!(close(out.get("fwd_left"), 0.30));

        input.safety.emergency_stop();
        let (out, report) = tc.proc(&input).unwrap();
        assert!(out.all_zero());
        assert!(report.emergency_stopped);

        // Restarting ramps up from zero again
        input.safety.reset();
        let (out, _) = tc.proc(&input).unwrap();
        assert!(close(out.get("fwd_left"), 0.15));
    }
}
