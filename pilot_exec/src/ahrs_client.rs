//! # AHRS client
//!
//! Runs the AHRS transport on its own thread so that a slow or blocking
//! sensor read can never stall the control cycle. Decoded frames are
//! published straight onto the shared channel; the control loop consumes
//! them at its own rate. A transport failure is fatal and raises the kill
//! signal so every process stands down.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, trace};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

// Internal
use course_if::chan::{ChanEntry, SharedChannel};
use course_if::eqpt::ahrs::{AhrsError, AhrsSensor};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to the background AHRS polling thread.
pub struct AhrsClient {
    handle: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AhrsClient {
    /// Spawn the polling thread.
    ///
    /// The thread polls the sensor with the given timeout, writes each frame
    /// to the channel and exits when the kill entry is raised. If the
    /// transport fails the thread raises the kill itself before exiting.
    pub fn spawn(
        mut sensor: Box<dyn AhrsSensor + Send>,
        chan: Arc<SharedChannel>,
        poll_timeout: Duration,
    ) -> Self {
        let handle = std::thread::spawn(move || loop {
            if chan.is_killed() {
                break;
            }

            match sensor.poll(poll_timeout) {
                Ok(Some(frame)) => {
                    trace!(
                        "AHRS frame: heading {:.1}, roll {:.1}, quality {}",
                        frame.heading_deg,
                        frame.roll_deg,
                        frame.calib_quality
                    );

                    chan.write(ChanEntry::Heading, frame.heading_deg as f32);
                    chan.write(ChanEntry::Roll, frame.roll_deg as f32);
                    chan.write(ChanEntry::CalibQuality, frame.calib_quality as f32);
                }
                Ok(None) => (),
                // A timeout means attitude has stopped flowing, which the
                // controller cannot pilot without. Every transport error is
                // fatal
                Err(e) => {
                    error!("AHRS transport failed, raising kill: {}", e);
                    chan.write_kill();
                    break;
                }
            }
        });

        Self { handle }
    }

    /// Wait for the polling thread to exit.
    ///
    /// Call after raising the kill entry during shutdown.
    pub fn join(self) {
        if self.handle.join().is_err() {
            error!("AHRS client thread panicked");
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
