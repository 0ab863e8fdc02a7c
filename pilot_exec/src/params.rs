//! Pilot executable parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the pilot executable itself. The piloting manager has its
/// own parameter file.
#[derive(Debug, Clone, Deserialize)]
pub struct PilotExecParams {
    /// Path to the shared channel file, relative to the software root.
    pub chan_file_path: String,

    /// Target period of one control cycle, seconds.
    pub cycle_period_s: f64,

    /// Timeout of one AHRS poll, milliseconds.
    pub ahrs_poll_timeout_ms: u64,

    /// Minimum interval between helm sends, milliseconds.
    pub helm_min_send_interval_ms: u64,

    /// Heading reported by the bench AHRS, degrees.
    pub sim_ahrs_heading_deg: f64,

    /// Roll reported by the bench AHRS, degrees.
    pub sim_ahrs_roll_deg: f64,

    /// Calibration quality the bench AHRS ramps to.
    pub sim_ahrs_target_quality: u8,
}
