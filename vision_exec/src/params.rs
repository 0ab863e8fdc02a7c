//! Vision executable parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the vision executable.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionExecParams {
    /// Path to the shared channel file, relative to the software root.
    pub chan_file_path: String,

    /// Path to the scripted run to replay, relative to the software root.
    pub script_file_path: String,

    /// Timeout of one poll of the source, milliseconds. Sets the fix rate.
    pub poll_timeout_ms: u64,
}
