//! # ROV library.
//!
//! This library allows other crates in the workspace (and the integration tests) to access items
//! defined inside the ROV crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Depth control module - holds a target depth with a PID loop on the vertical thrusters
pub mod depth_ctrl;

/// Thrust control module - arbitrates pilot and automatic commands into thruster duty cycles
pub mod thrust_ctrl;

/// Process-wide safety limits and the emergency stop
pub mod safety;

/// Global data store owned by the control loop
pub mod data_store;

/// Telecommand processor - applies control requests at the start of a cycle
pub mod tc_processor;

/// Periodic control task and the handle used to command it
pub mod ctrl_loop;

/// Latest telemetry packet, published once per cycle
pub mod tm_publisher;

/// Latest-value link for pilot commands
pub mod pilot;

/// Simulation client - a simulated vehicle standing in for the hardware
pub mod sim_client;

/// Parameters for the executable
pub mod params;
