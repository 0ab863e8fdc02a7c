//! # Piloting manager
//!
//! This module implements the closed-loop piloting state machine. The
//! manager is stepped once per control cycle and moves through the
//! following modes:
//!
//! - `Calibrating` - waiting for the AHRS to report adequate calibration.
//! - `ArenaConfiguring` - the first fresh vision fix has arrived; build the
//!   marks and plan the route.
//! - `AwaitingGo` - idle with zero demands until the operator's go signal.
//! - `Running` - closed-loop piloting along the route's legs.
//! - `Paused` - vision has gone stale; demands are zeroed until a fresh fix
//!   arrives, at which point running resumes with no operator action.
//! - `Stopped` - terminal; reached on course completion or kill. Demands
//!   are zeroed and the captain's log flushed exactly once.
//!
//! The manager owns all mutable vehicle state. Data flows one way: channel
//! in, helm demands out. Each of the modes is handled by a `mode_xyz`
//! function in [`modes`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod modes;
mod params;

pub use params::PilotMgrParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::info;
use nalgebra::Point2;
use std::fmt::Display;
use std::time::Instant;

// Internal
use crate::nav::Leg;
use crate::vehicle::{LogFlushError, VehicleState};
use course_if::chan::{ChanReader, SharedChannel};
use course_if::eqpt::helm::HelmDems;
use util::session::Session;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The piloting manager.
pub struct PilotMgr {
    /// Parameters for the manager.
    pub params: PilotMgrParams,

    /// The vehicle's state. Exclusively owned by the control loop.
    pub vehicle: VehicleState,

    /// Executing mode.
    mode: PilotMode,

    /// The planned route, built once during arena configuration and
    /// immutable for the rest of the run.
    route: Option<Vec<Leg>>,

    /// Freshness tracking for this consumer's view of the channel.
    reader: ChanReader,

    /// Demands computed by the most recent cycle.
    output_dems: HelmDems,

    /// Report from the most recent cycle.
    report: StatusReport,

    /// Session for the log data product, absent under test.
    session: Option<Session>,

    /// Instant the manager was created, the epoch for log records.
    start: Instant,

    /// True once the terminal teardown has run. Keeps it idempotent.
    finalised: bool,
}

/// The status report containing monitoring quantities from one cycle.
#[derive(Debug, Default, Copy, Clone)]
pub struct StatusReport {
    /// Distance from the vehicle to the active leg's target, centimetres.
    pub target_dist_cm: f64,

    /// Bearing from the vehicle to the active leg's target, degrees.
    pub bearing_deg: f64,

    /// Signed heading error driving the helm, degrees in `(-180, 180]`.
    pub heading_error_deg: f64,

    /// True if the on-mark check passed this cycle.
    pub on_mark: bool,

    /// True if the position was advanced by dead reckoning rather than a
    /// fresh fix.
    pub dead_reckoned: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The possible modes of execution of the piloting manager. Each mode is
/// handled by a `mode_xyz` function.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PilotMode {
    Calibrating,
    ArenaConfiguring,
    AwaitingGo,
    Running,
    Paused,
    Stopped,
}

/// Errors that can occur in the piloting manager.
#[derive(Debug, thiserror::Error)]
pub enum PilotMgrError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    /// The manager reached Running without a route. Indicates a mode
    /// sequencing bug rather than an operational condition.
    #[error("No route has been planned")]
    NoRoute,

    #[error("Active leg index {0} is beyond the end of the route")]
    LegIndexOutOfRange(usize),

    #[error("Could not flush the captain's log: {0}")]
    LogFlushError(#[from] LogFlushError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PilotMgr {
    /// Initialise the manager from a parameter file.
    pub fn init(params_path: &str, session: Session) -> Result<Self, PilotMgrError> {
        let params: PilotMgrParams =
            util::params::load(params_path).map_err(PilotMgrError::ParamLoadError)?;

        let mut mgr = Self::with_params(params);
        mgr.session = Some(session);

        Ok(mgr)
    }

    /// Build a manager directly from a parameter struct.
    ///
    /// No session is attached, so the captain's log is not flushed on stop.
    /// This is the entry point used by the integration tests.
    pub fn with_params(params: PilotMgrParams) -> Self {
        let gate = Point2::new(params.gate_cm[0], params.gate_cm[1]);
        let vehicle = VehicleState::at(gate, params.log_capacity);

        Self {
            params,
            vehicle,
            mode: PilotMode::Calibrating,
            route: None,
            reader: ChanReader::new(),
            output_dems: HelmDems::zero(),
            report: StatusReport::default(),
            session: None,
            start: Instant::now(),
            finalised: false,
        }
    }

    /// Process one control cycle.
    ///
    /// Consumes fresh channel data, advances the state machine and returns
    /// the helm demands to send this cycle.
    pub fn proc(
        &mut self,
        chan: &SharedChannel,
    ) -> Result<(HelmDems, StatusReport), PilotMgrError> {
        // Setup cycle data
        self.output_dems = HelmDems::zero();
        self.report = StatusReport::default();

        // The kill entry pre-empts every mode
        if chan.is_killed() && self.mode != PilotMode::Stopped {
            self.set_mode(PilotMode::Stopped);
        }

        // Mode execution. Each of the mode functions either stays put or
        // switches mode via set_mode
        match self.mode {
            PilotMode::Calibrating => self.mode_calibrating(chan),
            PilotMode::ArenaConfiguring => self.mode_arena_configuring(chan),
            PilotMode::AwaitingGo => self.mode_awaiting_go(chan),
            PilotMode::Running => self.mode_running(chan),
            PilotMode::Paused => self.mode_paused(chan),
            PilotMode::Stopped => self.mode_stopped(),
        }?;

        Ok((self.output_dems, self.report))
    }

    /// The currently executing mode.
    pub fn mode(&self) -> PilotMode {
        self.mode
    }

    /// True once the manager has reached its terminal mode.
    pub fn is_stopped(&self) -> bool {
        self.mode == PilotMode::Stopped
    }

    /// The planned route, if arena configuration has run.
    pub fn route(&self) -> Option<&[Leg]> {
        self.route.as_deref()
    }

    /// Seconds since the manager was created.
    pub(crate) fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Switch mode, logging the transition.
    pub(crate) fn set_mode(&mut self, mode: PilotMode) {
        if self.mode != mode {
            info!("PilotMode change: {} -> {}", self.mode, mode);
            self.mode = mode;
        }
    }
}

impl Display for PilotMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PilotMode::Calibrating => write!(f, "Calibrating"),
            PilotMode::ArenaConfiguring => write!(f, "ArenaConfiguring"),
            PilotMode::AwaitingGo => write!(f, "AwaitingGo"),
            PilotMode::Running => write!(f, "Running"),
            PilotMode::Paused => write!(f, "Paused"),
            PilotMode::Stopped => write!(f, "Stopped"),
        }
    }
}
