//! # Pilot library.
//!
//! This library allows other crates in the workspace (and the integration
//! tests) to access items defined inside the pilot crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// AHRS client - dedicated reader thread publishing attitude into the channel
pub mod ahrs_client;

/// Helm client - rate-limited demands to the helm actuator
pub mod helm_client;

/// Navigation module - course geometry and route planning
pub mod nav;

/// Piloting manager - the closed-loop piloting state machine
pub mod pilot_mgr;

/// Vehicle state - position, attitude, demands and the captain's log
pub mod vehicle;
