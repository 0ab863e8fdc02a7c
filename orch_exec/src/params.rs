//! Orchestrator parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the orchestrator.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchExecParams {
    /// Path to the shared channel file, relative to the software root.
    pub chan_file_path: String,

    /// Command run to start the vision executable.
    pub vision_exec_cmd: String,

    /// Command run to start the pilot executable.
    pub pilot_exec_cmd: String,

    /// Period between child liveness checks, milliseconds.
    pub reap_period_ms: u64,
}
