//! Main ROV-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise all modules and the data store
//!     - Spawn the control loop, which every cycle performs:
//!         - Telecommand processing and handling
//!         - Telemetry and pilot input acquisition
//!         - Depth control processing
//!         - Thrust control processing
//!         - Motor driver output
//!         - Archiving and telemetry publication
//!     - Supervise the loop: feed script telecommands until the end of the run
//!
//! # Modules
//!
//! All modules (e.g. `depth_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use rov_lib::{
    ctrl_loop::CtrlLoop, data_store::DataStore, depth_ctrl::DepthCtrl, params::RovExecParams,
    pilot::PilotLink, safety::SafetyState, sim_client::SimVehicle, thrust_ctrl::ThrustCtrl,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const EXEC_PARAMS: &str = "rov_exec.toml";
const DEPTH_CTRL_PARAMS: &str = "depth_ctrl.toml";
const THRUST_CTRL_PARAMS: &str = "thrust_ctrl.toml";

/// Period of the supervisor loop in the main thread.
const SUPERVISOR_PERIOD: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "rov_exec", about = "ROV depth hold and thrust control executable")]
struct Opts {
    /// Telecommand script to execute, the executable stops at the end of the script.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Stop after this many seconds.
    #[structopt(short, long)]
    duration_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("rov_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("ROV Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: RovExecParams =
        util::params::load(EXEC_PARAMS).wrap_err("Could not load exec params")?;

    if !(exec_params.cycle_period_s.is_finite() && exec_params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "Invalid cycle period {} s in {}",
            exec_params.cycle_period_s,
            EXEC_PARAMS
        ));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let mut script = match opts.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            Some(si)
        }
        None => {
            info!("No script provided, the vehicle will only respond to pilot commands\n");
            None
        }
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut depth_ctrl = DepthCtrl::default();
    depth_ctrl
        .init(DEPTH_CTRL_PARAMS, &session)
        .wrap_err("Failed to initialise DepthCtrl")?;
    info!("DepthCtrl init complete");

    let mut thrust_ctrl = ThrustCtrl::default();
    thrust_ctrl
        .init(THRUST_CTRL_PARAMS, &session)
        .wrap_err("Failed to initialise ThrustCtrl")?;
    info!("ThrustCtrl init complete");

    let safety = SafetyState::new(thrust_ctrl.params().max_output)
        .wrap_err("Invalid safety limits")?;

    let ds = DataStore::new(depth_ctrl, thrust_ctrl, safety);

    info!("Module initialisation complete\n");

    // ---- INITIALISE VEHICLE ----

    // No hardware drivers are present, the simulated vehicle stands in for both the sensors and
    // the motors.
    let sim = SimVehicle::realtime(exec_params.sim.clone());
    let pilot = PilotLink::new();

    info!(
        "Simulated vehicle initialised at {:.2} ft",
        exec_params.sim.initial_depth_ft
    );

    // ---- START CONTROL LOOP ----

    let (ctrl_loop, handle) = CtrlLoop::new(exec_params, ds, sim.clone(), pilot, sim);
    let ctrl_jh = ctrl_loop
        .spawn()
        .wrap_err("Failed to start the control loop")?;

    // ---- SUPERVISOR LOOP ----

    let start = Instant::now();

    loop {
        let elapsed_s = start.elapsed().as_secs_f64();

        // Script processing
        if let Some(ref mut si) = script {
            match si.get_pending_tcs(elapsed_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tcs) => {
                    for tc in tcs {
                        info!("Executing TC: {:?}", tc);
                        if let Err(e) = handle.send_tc(tc) {
                            warn!("{}", e);
                        }
                    }
                }
                // Exit if end of script reached
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break;
                }
            }
        }

        if let Some(d) = opts.duration_s {
            if elapsed_s >= d {
                info!("Run duration of {:.1} s reached, stopping", d);
                break;
            }
        }

        thread::sleep(SUPERVISOR_PERIOD);
    }

    // ---- SHUTDOWN ----

    handle.stop();
    ctrl_jh
        .join()
        .map_err(|_| eyre!("The control loop thread panicked"))?;

    session.save("tm/final_tm.json", (*handle.status()).clone());

    info!("End of execution");

    session.exit();

    Ok(())
}
