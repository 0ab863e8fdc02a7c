//! Vision sources available to the executable.
//!
//! The production source wraps the overhead camera's capture pipeline; on
//! the bench a scripted source replays a recorded run from a JSON file.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

// Internal
use course_if::eqpt::vision::{VisionError, VisionFrame, VisionSource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One step of a scripted run.
#[derive(Debug, Clone, Deserialize)]
struct ScriptStep {
    /// Seconds to dwell on this frame before moving to the next.
    dwell_s: f64,

    /// The frame itself, or absent to model a dropped fix.
    frame: Option<VisionFrame>,
}

/// Scripted vision source replaying frames from a JSON file.
///
/// Each poll returns the current step's frame, advancing to the next step
/// once its dwell has elapsed. Polls past the end of the script return no
/// fix, as a real camera losing the marker would.
pub struct ScriptSource {
    steps: VecDeque<ScriptStep>,
    step_started: std::time::Instant,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptSource {
    /// Load a script, validating every frame against the channel's mark
    /// capacity up front.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VisionError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| VisionError::OpenFailed(e.to_string()))?;

        let steps: Vec<ScriptStep> =
            serde_json::from_str(&raw).map_err(|e| VisionError::OpenFailed(e.to_string()))?;

        for step in &steps {
            if let Some(ref frame) = step.frame {
                frame.validate()?;
            }
        }

        Ok(Self {
            steps: steps.into(),
            step_started: std::time::Instant::now(),
        })
    }

    /// True once every step has been consumed.
    pub fn exhausted(&self) -> bool {
        self.steps.is_empty()
    }
}

impl VisionSource for ScriptSource {
    fn poll(&mut self, timeout: Duration) -> Result<Option<VisionFrame>, VisionError> {
        // Model the camera's frame interval
        std::thread::sleep(timeout);

        let step = match self.steps.front() {
            Some(step) => step.clone(),
            None => return Ok(None),
        };

        if self.step_started.elapsed().as_secs_f64() >= step.dwell_s {
            self.steps.pop_front();
            self.step_started = std::time::Instant::now();
        }

        Ok(step.frame)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
