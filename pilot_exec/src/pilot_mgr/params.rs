//! Piloting manager parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::nav::RotDir;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the piloting manager. Loaded at startup, immutable
/// thereafter.
#[derive(Debug, Clone, Deserialize)]
pub struct PilotMgrParams {
    /// Turning radius of the vehicle at full helm, centimetres. Sets the
    /// radius of every arc leg.
    pub turn_radius_cm: f64,

    /// Fore/aft offset of the vision marker from the vehicle's centre of
    /// rotation, centimetres. Positive is forward.
    pub marker_fore_cm: f64,

    /// Height of the marker mast, centimetres. Roll leans the mast and
    /// displaces the marker's apparent position sideways.
    pub marker_mast_cm: f64,

    /// Fixed steering trim added to every helm command, degrees.
    pub helm_bias_deg: f64,

    /// Distance at which a leg's target counts as reached, centimetres.
    pub on_mark_threshold_cm: f64,

    /// Vision fixes older than this suspend piloting, milliseconds.
    pub max_vision_age_ms: u32,

    /// Proportional steering gain, helm degrees per degree of heading
    /// error.
    pub helm_kp: f64,

    /// Scale of the overhead camera image, pixels per centimetre.
    pub arena_scale_px_per_cm: f64,

    /// Pixel coordinates of the arena centre in the camera image.
    pub arena_centre_px: [f64; 2],

    /// The gate - the route's fixed start and finish point, arena frame,
    /// centimetres.
    pub gate_cm: [f64; 2],

    /// Rotation direction per mark, in course order. Marks beyond the end
    /// of this list round clockwise.
    pub mark_rot_dirs: Vec<RotDir>,

    /// Minimum vendor-reported calibration quality before piloting may
    /// begin.
    pub calib_quality_threshold: u8,

    /// Throttle demand while underway.
    pub cruise_throttle: i16,

    /// Capacity of the captain's log ring buffer, records.
    pub log_capacity: usize,
}
