//! # Vision Equipment Interface
//!
//! The overhead vision system produces absolute position fixes: one for the
//! vehicle's marker and one per waypoint, all in the camera's pixel frame.
//! The raw pixel processing and the HTTP capture transport are external
//! collaborators behind the [`VisionSource`] trait. Absence of a fix on any
//! given poll is a normal, expected outcome, not an error.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::chan::MAX_MARKS;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One set of fixes from the overhead camera, pixel frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VisionFrame {
    /// Fix of the vehicle's marker, pixels.
    pub vehicle_fix_px: (f64, f64),

    /// Fixes of the course waypoints, pixels, in course order.
    pub waypoint_fixes_px: Vec<(f64, f64)>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur on the vision transport.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("The vision source could not be opened: {0}")]
    OpenFailed(String),

    #[error("The vision source failed: {0}")]
    SourceFailed(String),

    #[error("Frame carries {0} waypoint fixes, the channel caps at {MAX_MARKS}")]
    TooManyWaypoints(usize),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Interface to the vision capture transport.
pub trait VisionSource {
    /// Block for at most `timeout` waiting for the next frame.
    ///
    /// `Ok(None)` means no fix was available, which is normal; `Err` means
    /// the source itself has failed.
    fn poll(&mut self, timeout: Duration) -> Result<Option<VisionFrame>, VisionError>;
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl VisionFrame {
    /// Check the frame fits the channel's fixed mark capacity.
    pub fn validate(&self) -> Result<(), VisionError> {
        if self.waypoint_fixes_px.len() > MAX_MARKS {
            Err(VisionError::TooManyWaypoints(self.waypoint_fixes_px.len()))
        } else {
            Ok(())
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
