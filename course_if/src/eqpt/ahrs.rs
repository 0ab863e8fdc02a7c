//! # AHRS Equipment Interface
//!
//! The AHRS reports heading, roll and a vendor-defined calibration quality
//! over a line-oriented transport. Frames arrive as comma-separated decimal
//! fields, `heading,roll,quality`. A short or undecodable frame is simply
//! discarded - previously published values remain authoritative.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One decoded attitude frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AhrsFrame {
    /// Compass heading in degrees, `[0, 360)`.
    pub heading_deg: f64,

    /// Roll in degrees, positive to starboard.
    pub roll_deg: f64,

    /// Vendor calibration quality bits. Higher is better; the meaning of the
    /// individual bits belongs to the sensor vendor.
    pub calib_quality: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur on the AHRS transport.
///
/// Malformed frames are not errors - `poll` reports them as `Ok(None)`.
/// An `Err` means the transport itself has failed, which callers treat as
/// fatal.
#[derive(Debug, Error)]
pub enum AhrsError {
    #[error("The AHRS transport could not be opened: {0}")]
    OpenFailed(String),

    #[error("The AHRS read timed out")]
    ReadTimeout,

    #[error("The AHRS transport failed: {0}")]
    TransportFailed(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Interface to the AHRS transport.
pub trait AhrsSensor {
    /// Block for at most `timeout` waiting for the next frame.
    ///
    /// `Ok(None)` means no decodable frame arrived in time, which is a
    /// normal outcome; `Err` means the transport has failed.
    fn poll(&mut self, timeout: Duration) -> Result<Option<AhrsFrame>, AhrsError>;
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode one line of the sensor's wire format.
///
/// Expects exactly three comma-separated fields, `heading,roll,quality`.
/// Returns `None` for short, long or undecodable frames.
pub fn parse_frame(line: &str) -> Option<AhrsFrame> {
    let mut fields = line.trim().split(',');

    let heading_deg: f64 = fields.next()?.trim().parse().ok()?;
    let roll_deg: f64 = fields.next()?.trim().parse().ok()?;
    let calib_quality: u8 = fields.next()?.trim().parse().ok()?;

    // A fourth field means a corrupt or concatenated frame
    if fields.next().is_some() {
        return None;
    }

    if !heading_deg.is_finite() || !roll_deg.is_finite() {
        return None;
    }

    Some(AhrsFrame {
        heading_deg,
        roll_deg,
        calib_quality,
    })
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

/// Scripted AHRS used in bench runs and tests.
///
/// Reports a fixed heading and roll; the calibration quality ramps up by one
/// per poll until it reaches its target, modelling the vendor's settle
/// behaviour.
#[derive(Debug, Clone)]
pub struct SimAhrs {
    pub heading_deg: f64,
    pub roll_deg: f64,
    pub target_quality: u8,
    quality: u8,
}

impl SimAhrs {
    pub fn new(heading_deg: f64, roll_deg: f64, target_quality: u8) -> Self {
        Self {
            heading_deg,
            roll_deg,
            target_quality,
            quality: 0,
        }
    }
}

impl AhrsSensor for SimAhrs {
    fn poll(&mut self, _timeout: Duration) -> Result<Option<AhrsFrame>, AhrsError> {
        if self.quality < self.target_quality {
            self.quality += 1;
        }

        Ok(Some(AhrsFrame {
            heading_deg: self.heading_deg,
            roll_deg: self.roll_deg,
            calib_quality: self.quality,
        }))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
