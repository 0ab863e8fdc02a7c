//! # Helm client
//!
//! Wraps the helm actuator transport with the two behaviours the control
//! loop needs but the transport does not provide: a send-rate limit so a
//! fast control cycle cannot flood a slow actuator link, and a fixed
//! steering trim correcting the vehicle's mechanical bias. The zeroing path
//! bypasses the rate limit - a stand-down must never be dropped.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use std::time::{Duration, Instant};

// Internal
use course_if::eqpt::helm::{HelmActuator, HelmDems, HelmError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rate-limited, trim-corrected front end to the helm actuator.
pub struct HelmClient {
    actuator: Box<dyn HelmActuator>,

    /// Steering trim added to every demand before clamping, degrees.
    helm_bias_deg: f64,

    /// Minimum interval between sends.
    min_send_interval: Duration,

    /// When the last demand actually went out.
    last_send: Option<Instant>,

    /// True if the last demand sent was zero.
    zeroed: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HelmClient {
    pub fn new(
        actuator: Box<dyn HelmActuator>,
        helm_bias_deg: f64,
        min_send_interval: Duration,
    ) -> Self {
        Self {
            actuator,
            helm_bias_deg,
            min_send_interval,
            last_send: None,
            zeroed: false,
        }
    }

    /// Send demands, applying the trim and the rate limit.
    ///
    /// Returns true if the demand actually went out, false if the rate limit
    /// swallowed it.
    pub fn send_dems(&mut self, dems: &HelmDems) -> Result<bool, HelmError> {
        if let Some(last) = self.last_send {
            if last.elapsed() < self.min_send_interval {
                return Ok(false);
            }
        }

        let trimmed = HelmDems {
            helm_deg: (dems.helm_deg as f64 + self.helm_bias_deg).round() as i16,
            throttle: dems.throttle,
        }
        .clamped();

        trace!(
            "Helm send: helm {} deg, throttle {}",
            trimmed.helm_deg,
            trimmed.throttle
        );

        self.actuator.send(&trimmed)?;
        self.last_send = Some(Instant::now());
        self.zeroed = trimmed == HelmDems::zero();

        Ok(true)
    }

    /// Send zero demands immediately, bypassing the rate limit.
    ///
    /// Idempotent: once the actuator is known to be zeroed, further calls do
    /// nothing. The trim is deliberately not applied - zero means the servo
    /// centre, not the trimmed centre.
    pub fn zero(&mut self) -> Result<(), HelmError> {
        if self.zeroed {
            return Ok(());
        }

        self.actuator.send(&HelmDems::zero())?;
        self.last_send = Some(Instant::now());
        self.zeroed = true;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
