//! # Vehicle state
//!
//! All mutable vehicle state lives in one exclusively-owned struct, passed
//! by reference through the control loop - no other thread touches it. The
//! captain's log is a bounded ring buffer of per-cycle records, used for
//! dead-reckoning speed estimates while underway and flushed as a CSV data
//! product at the end of the run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

// Internal
use crate::nav::length_of_line;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The vehicle's current best-known state.
#[derive(Debug, Clone)]
pub struct VehicleState {
    /// Position in the arena frame, centimetres.
    pub position_cm: Point2<f64>,

    /// Compass heading in degrees from the AHRS.
    pub heading_deg: f64,

    /// Roll in degrees from the AHRS.
    pub roll_deg: f64,

    /// Current helm deflection in degrees, `[-90, 90]`.
    pub helm_deg: f64,

    /// Current throttle demand.
    pub throttle: i16,

    /// Index of the active leg within the route.
    pub leg_index: usize,

    /// The captain's log.
    pub log: CaptainsLog,
}

/// One captain's log record, written once per control cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LogRecord {
    /// Seconds since the controller started.
    pub elapsed_s: f64,

    /// Position, arena frame, centimetres.
    pub x_cm: f64,
    pub y_cm: f64,

    /// Compass heading, degrees.
    pub heading_deg: f64,

    /// Estimated ground speed, centimetres per second.
    pub speed_cms: f64,

    /// Helm deflection at this cycle, degrees.
    pub helm_deg: f64,
}

/// Bounded ring buffer of log records.
#[derive(Debug, Clone)]
pub struct CaptainsLog {
    records: VecDeque<LogRecord>,
    capacity: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur when flushing the captain's log.
#[derive(Debug, Error)]
pub enum LogFlushError {
    #[error("Could not write the log file: {0}")]
    WriteError(#[from] csv::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    /// Create the state for a vehicle sitting at the given point with the
    /// helm centred.
    pub fn at(position_cm: Point2<f64>, log_capacity: usize) -> Self {
        Self {
            position_cm,
            heading_deg: 0.0,
            roll_deg: 0.0,
            helm_deg: 0.0,
            throttle: 0,
            leg_index: 0,
            log: CaptainsLog::new(log_capacity),
        }
    }

    /// Append a log record capturing the current state.
    pub fn log_entry(&mut self, elapsed_s: f64) {
        let speed_cms = self.log.estimate_speed_cms(&self.position_cm, elapsed_s);

        self.log.push(LogRecord {
            elapsed_s,
            x_cm: self.position_cm[0],
            y_cm: self.position_cm[1],
            heading_deg: self.heading_deg,
            speed_cms,
            helm_deg: self.helm_deg,
        });
    }
}

impl CaptainsLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(2),
        }
    }

    /// Append a record, evicting the oldest when at capacity.
    pub fn push(&mut self, record: LogRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }

        self.records.push_back(record);
    }

    /// The most recent record, if any.
    pub fn latest(&self) -> Option<&LogRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Estimate the current ground speed from the latest record and the
    /// position now.
    ///
    /// Returns zero until the log has at least one record, or if no time has
    /// passed since it was written.
    pub fn estimate_speed_cms(&self, position_cm: &Point2<f64>, elapsed_s: f64) -> f64 {
        match self.latest() {
            Some(rec) => {
                let dt = elapsed_s - rec.elapsed_s;

                if dt <= 0.0 {
                    0.0
                } else {
                    length_of_line(&Point2::new(rec.x_cm, rec.y_cm), position_cm) / dt
                }
            }
            None => 0.0,
        }
    }

    /// Flush the whole log to a CSV file, one line per cycle.
    pub fn flush_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), LogFlushError> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;

        for record in &self.records {
            writer.serialize(record)?;
        }

        writer.flush().map_err(csv::Error::from)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
