//! Mode execution functions for the piloting manager.
//!
//! Each function processes exactly one cycle of its mode and performs any
//! mode transition through [`PilotMgr::set_mode`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use nalgebra::Point2;

// Internal
use super::{PilotMgr, PilotMgrError, PilotMode};
use crate::nav::{
    build_marks, heading_of_line, length_of_line, plan_route, reckon_line, Leg, RotDir,
};
use course_if::chan::{ChanEntry, SharedChannel, MAX_MARKS};
use course_if::eqpt::helm::{HelmDems, DEM_MAX, DEM_MIN};
use util::maths::{clamp, wrap_signed_deg};

// ---------------------------------------------------------------------------
// MODE FUNCTIONS
// ---------------------------------------------------------------------------

impl PilotMgr {
    /// Wait for the AHRS calibration quality to reach the configured
    /// threshold.
    pub(super) fn mode_calibrating(
        &mut self,
        chan: &SharedChannel,
    ) -> Result<(), PilotMgrError> {
        if let Some(quality) = self.reader.take(chan, ChanEntry::CalibQuality) {
            if quality as u8 >= self.params.calib_quality_threshold {
                info!(
                    "AHRS calibration quality {} meets threshold {}",
                    quality as u8, self.params.calib_quality_threshold
                );
                self.set_mode(PilotMode::ArenaConfiguring);
            }
        }

        Ok(())
    }

    /// Wait for the first vision fix, then survey the arena and plan the
    /// route.
    pub(super) fn mode_arena_configuring(
        &mut self,
        chan: &SharedChannel,
    ) -> Result<(), PilotMgrError> {
        // Both coordinates must be fresh before either is consumed, so a
        // half-written fix survives to the next cycle
        let (x_px, y_px) = match self.take_fix(chan) {
            Some(fix) => fix,
            None => return Ok(()),
        };

        let centres = self.read_mark_centres(chan);
        let gate = Point2::new(self.params.gate_cm[0], self.params.gate_cm[1]);

        let marks = build_marks(
            &centres,
            &self.params.mark_rot_dirs,
            &gate,
            self.params.turn_radius_cm,
        );
        let route = plan_route(&marks, &gate);

        info!(
            "Arena surveyed: {} mark(s), route of {} leg(s)",
            centres.len(),
            route.len()
        );

        // Seed the vehicle at the fix rather than the nominal gate, and get
        // a first log record down so speed estimation can start immediately
        self.vehicle.position_cm = self.px_to_cm(x_px as f64, y_px as f64);
        self.vehicle.leg_index = 0;
        let elapsed_s = self.elapsed_s();
        self.vehicle.log_entry(elapsed_s);

        self.route = Some(route);
        self.set_mode(PilotMode::AwaitingGo);

        Ok(())
    }

    /// Hold zero demands until the operator's go signal.
    pub(super) fn mode_awaiting_go(
        &mut self,
        chan: &SharedChannel,
    ) -> Result<(), PilotMgrError> {
        if chan.is_go() {
            info!("Operator go received, starting the course");
            self.set_mode(PilotMode::Running);
        }

        Ok(())
    }

    /// Closed-loop piloting along the active leg.
    pub(super) fn mode_running(&mut self, chan: &SharedChannel) -> Result<(), PilotMgrError> {
        // Attitude first, the position update depends on the heading
        if let Some(heading) = self.reader.take(chan, ChanEntry::Heading) {
            self.vehicle.heading_deg = heading as f64;
        }
        if let Some(roll) = self.reader.take(chan, ChanEntry::Roll) {
            self.vehicle.roll_deg = roll as f64;
        }

        let elapsed_s = self.elapsed_s();

        // Position from vision when fresh, dead reckoning otherwise. A fix
        // older than the limit suspends piloting entirely
        match self.take_fix(chan) {
            Some((x, y)) => {
                let fix = self.px_to_cm(x as f64, y as f64);
                self.vehicle.position_cm = self.project_fix(&fix);
            }
            None => {
                let age = chan.age_ms(ChanEntry::VisionX);

                if age.map_or(true, |a| a > self.params.max_vision_age_ms) {
                    warn!(
                        "Vision fix stale ({:?} ms old, limit {} ms), pausing",
                        age, self.params.max_vision_age_ms
                    );
                    self.set_mode(PilotMode::Paused);
                    return Ok(());
                }

                let speed_cms = self
                    .vehicle
                    .log
                    .estimate_speed_cms(&self.vehicle.position_cm, elapsed_s);
                let dt = elapsed_s
                    - self
                        .vehicle
                        .log
                        .latest()
                        .map(|rec| rec.elapsed_s)
                        .unwrap_or(elapsed_s);

                self.vehicle.position_cm = reckon_line(
                    &self.vehicle.position_cm,
                    self.vehicle.heading_deg,
                    speed_cms * dt,
                );
                self.report.dead_reckoned = true;
            }
        }

        self.vehicle.log_entry(elapsed_s);

        // Steer for the active leg, advancing when its target is reached
        let route = self.route.as_ref().ok_or(PilotMgrError::NoRoute)?;
        let mut leg_index = self.vehicle.leg_index;
        let leg = *route
            .get(leg_index)
            .ok_or(PilotMgrError::LegIndexOutOfRange(leg_index))?;

        let target = leg.to();
        let dist = length_of_line(&self.vehicle.position_cm, &target);

        self.report.target_dist_cm = dist;

        if dist < self.params.on_mark_threshold_cm {
            self.report.on_mark = true;

            if leg_index + 1 == route.len() {
                info!("Final leg complete, course finished");
                self.set_mode(PilotMode::Stopped);
                return self.mode_stopped();
            }

            leg_index += 1;
            self.vehicle.leg_index = leg_index;
            info!("On mark, advancing to leg {}", leg_index);
        }

        let route = self.route.as_ref().ok_or(PilotMgrError::NoRoute)?;
        let leg = *route
            .get(leg_index)
            .ok_or(PilotMgrError::LegIndexOutOfRange(leg_index))?;

        let helm_deg = match leg {
            Leg::Line { to, .. } => {
                let bearing = heading_of_line(&self.vehicle.position_cm, &to);
                let error = wrap_signed_deg(bearing - self.vehicle.heading_deg);

                self.report.bearing_deg = bearing;
                self.report.heading_error_deg = error;

                clamp(
                    self.params.helm_kp * error,
                    DEM_MIN as f64,
                    DEM_MAX as f64,
                )
            }
            // An arc is flown at full helm towards the rounding direction,
            // which matches the turning radius the arc was planned at
            Leg::Arc { rot_dir, .. } => match rot_dir {
                RotDir::Cw => DEM_MAX as f64,
                RotDir::Ccw => DEM_MIN as f64,
            },
        };

        self.vehicle.helm_deg = helm_deg;
        self.vehicle.throttle = self.params.cruise_throttle;

        self.output_dems = HelmDems {
            helm_deg: helm_deg.round() as i16,
            throttle: self.params.cruise_throttle,
        };

        Ok(())
    }

    /// Hold zero demands until vision recovers.
    pub(super) fn mode_paused(&mut self, chan: &SharedChannel) -> Result<(), PilotMgrError> {
        if let Some(age) = chan.age_ms(ChanEntry::VisionX) {
            if age <= self.params.max_vision_age_ms {
                info!("Vision fix recovered ({} ms old), resuming", age);
                self.set_mode(PilotMode::Running);
            }
        }

        Ok(())
    }

    /// Terminal mode. On the first visit the demands are zeroed and the
    /// captain's log is flushed; later visits are no-ops.
    pub(super) fn mode_stopped(&mut self) -> Result<(), PilotMgrError> {
        if self.finalised {
            return Ok(());
        }

        self.finalised = true;
        self.vehicle.helm_deg = 0.0;
        self.vehicle.throttle = 0;

        if let Some(ref session) = self.session {
            let log_path = session.session_root.join("captains_log.csv");
            self.vehicle.log.flush_csv(&log_path)?;
            info!("Captain's log flushed to {:?}", log_path);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

impl PilotMgr {
    /// Consume a vision fix, but only when both coordinates are fresh.
    ///
    /// Vision writes the pair as two separate entries; consuming one half
    /// while the other is still in flight would throw a real fix away, so
    /// neither is consumed until both are new.
    fn take_fix(&mut self, chan: &SharedChannel) -> Option<(f32, f32)> {
        if !self.reader.is_fresh(chan, ChanEntry::VisionX)
            || !self.reader.is_fresh(chan, ChanEntry::VisionY)
        {
            return None;
        }

        let x = self.reader.take(chan, ChanEntry::VisionX)?;
        let y = self.reader.take(chan, ChanEntry::VisionY)?;

        Some((x, y))
    }

    /// Read the surveyed mark centres from the channel.
    fn read_mark_centres(&mut self, chan: &SharedChannel) -> Vec<Point2<f64>> {
        let count = chan
            .read(ChanEntry::MarkCount)
            .map(|(payload, _)| payload as usize)
            .unwrap_or(0)
            .min(MAX_MARKS);

        let mut centres = Vec::with_capacity(count);

        for i in 0..count {
            let x = chan.read(ChanEntry::MarkX(i));
            let y = chan.read(ChanEntry::MarkY(i));

            match (x, y) {
                (Some((x_px, _)), Some((y_px, _))) => {
                    centres.push(self.px_to_cm(x_px as f64, y_px as f64));
                }
                _ => warn!("Mark {} has no surveyed position, skipping", i),
            }
        }

        centres
    }

    /// Convert an image pixel coordinate into the arena frame.
    ///
    /// The image y axis points down, the arena y axis up.
    fn px_to_cm(&self, x_px: f64, y_px: f64) -> Point2<f64> {
        Point2::new(
            (x_px - self.params.arena_centre_px[0]) / self.params.arena_scale_px_per_cm,
            (self.params.arena_centre_px[1] - y_px) / self.params.arena_scale_px_per_cm,
        )
    }

    /// Project a marker fix back to the vehicle's centre of rotation.
    ///
    /// The marker rides on the steering assembly `marker_fore_cm` ahead of
    /// the centre, so its fore offset points along the steered direction
    /// (heading plus helm), not the hull heading. Roll leans the mast and
    /// displaces the fix sideways by `mast * sin(roll)`.
    fn project_fix(&self, fix_cm: &Point2<f64>) -> Point2<f64> {
        let marker_heading = self.vehicle.heading_deg + self.vehicle.helm_deg;
        let centre = reckon_line(fix_cm, marker_heading, -self.params.marker_fore_cm);

        let lateral = -self.params.marker_mast_cm * self.vehicle.roll_deg.to_radians().sin();

        reckon_line(&centre, self.vehicle.heading_deg + 90.0, lateral)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::pilot_mgr::PilotMgrParams;

    fn test_params() -> PilotMgrParams {
        PilotMgrParams {
            turn_radius_cm: 23.0,
            marker_fore_cm: 0.0,
            marker_mast_cm: 0.0,
            helm_bias_deg: 0.0,
            on_mark_threshold_cm: 15.0,
            max_vision_age_ms: 500,
            helm_kp: 2.0,
            arena_scale_px_per_cm: 1.0,
            arena_centre_px: [0.0, 0.0],
            gate_cm: [0.0, -100.0],
            mark_rot_dirs: vec![RotDir::Cw],
            calib_quality_threshold: 3,
            cruise_throttle: 60,
            log_capacity: 64,
        }
    }

    fn test_chan(name: &str) -> SharedChannel {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "regatta_modes_test_{}_{}",
            name,
            std::process::id()
        ));
        SharedChannel::create(path).unwrap()
    }

    #[test]
    fn test_calibration_gate() {
        let chan = test_chan("calib");
        let mut mgr = PilotMgr::with_params(test_params());

        // Below threshold: stay calibrating
        chan.write(ChanEntry::CalibQuality, 1.0);
        mgr.proc(&chan).unwrap();
        assert_eq!(mgr.mode(), PilotMode::Calibrating);

        // At threshold: move on
        chan.write(ChanEntry::CalibQuality, 3.0);
        mgr.proc(&chan).unwrap();
        assert_eq!(mgr.mode(), PilotMode::ArenaConfiguring);
    }

    #[test]
    fn test_arena_config_plans_route() {
        let chan = test_chan("arena");
        let mut mgr = PilotMgr::with_params(test_params());

        chan.write(ChanEntry::CalibQuality, 5.0);
        mgr.proc(&chan).unwrap();

        // One mark at arena (100, 50): image y is flipped
        chan.write(ChanEntry::MarkCount, 1.0);
        chan.write(ChanEntry::MarkX(0), 100.0);
        chan.write(ChanEntry::MarkY(0), -50.0);
        chan.write(ChanEntry::VisionX, 0.0);
        chan.write(ChanEntry::VisionY, 100.0);

        mgr.proc(&chan).unwrap();

        assert_eq!(mgr.mode(), PilotMode::AwaitingGo);
        assert_eq!(mgr.route().unwrap().len(), 3);

        // The vehicle was seeded at the fix, arena (0, -100)
        assert!((mgr.vehicle.position_cm[0]).abs() < 1e-9);
        assert!((mgr.vehicle.position_cm[1] + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_go_required_before_running() {
        let chan = test_chan("go");
        let mut mgr = PilotMgr::with_params(test_params());

        chan.write(ChanEntry::CalibQuality, 5.0);
        mgr.proc(&chan).unwrap();

        chan.write(ChanEntry::MarkCount, 0.0);
        chan.write(ChanEntry::VisionX, 0.0);
        chan.write(ChanEntry::VisionY, 100.0);
        mgr.proc(&chan).unwrap();

        // No go yet: demands stay zero and the mode holds
        let (dems, _) = mgr.proc(&chan).unwrap();
        assert_eq!(mgr.mode(), PilotMode::AwaitingGo);
        assert_eq!(dems, HelmDems::zero());

        chan.write_go();
        mgr.proc(&chan).unwrap();
        assert_eq!(mgr.mode(), PilotMode::Running);
    }

    #[test]
    fn test_kill_stops_from_any_mode() {
        let chan = test_chan("kill");
        let mut mgr = PilotMgr::with_params(test_params());

        chan.write_kill();
        let (dems, _) = mgr.proc(&chan).unwrap();

        assert_eq!(mgr.mode(), PilotMode::Stopped);
        assert_eq!(dems, HelmDems::zero());

        // Stopped is terminal, another cycle stays put
        mgr.proc(&chan).unwrap();
        assert_eq!(mgr.mode(), PilotMode::Stopped);
    }

    #[test]
    fn test_helm_clamped_on_large_error() {
        let chan = test_chan("clamp");
        let mut params = test_params();
        params.mark_rot_dirs = vec![];
        let mut mgr = PilotMgr::with_params(params);

        chan.write(ChanEntry::CalibQuality, 5.0);
        mgr.proc(&chan).unwrap();

        // Empty course: a single gate-to-gate line. Place the vehicle far
        // from the gate, facing exactly the wrong way
        chan.write(ChanEntry::MarkCount, 0.0);
        chan.write(ChanEntry::VisionX, 500.0);
        chan.write(ChanEntry::VisionY, 100.0);
        mgr.proc(&chan).unwrap();
        chan.write_go();
        mgr.proc(&chan).unwrap();

        chan.write(ChanEntry::Heading, 90.0);
        chan.write(ChanEntry::VisionX, 500.0);
        chan.write(ChanEntry::VisionY, 100.0);

        let (dems, report) = mgr.proc(&chan).unwrap();

        // Target is due west, the error is near 180 and the demand saturates
        assert!(report.heading_error_deg.abs() > 90.0);
        assert!(dems.helm_deg == DEM_MAX || dems.helm_deg == DEM_MIN);
        assert_eq!(dems.throttle, 60);
    }

    #[test]
    fn test_half_fresh_fix_not_discarded() {
        let chan = test_chan("half_fix");
        let mut params = test_params();
        params.mark_rot_dirs = vec![];
        let mut mgr = PilotMgr::with_params(params);

        chan.write(ChanEntry::CalibQuality, 5.0);
        mgr.proc(&chan).unwrap();
        chan.write(ChanEntry::MarkCount, 0.0);
        chan.write(ChanEntry::VisionX, 0.0);
        chan.write(ChanEntry::VisionY, 100.0);
        mgr.proc(&chan).unwrap();
        chan.write_go();
        mgr.proc(&chan).unwrap();

        // Only half the fix has landed: this cycle must dead-reckon and
        // must not consume the fresh half
        chan.write(ChanEntry::VisionX, 600.0);
        let (_, report) = mgr.proc(&chan).unwrap();
        assert!(report.dead_reckoned);

        // The other half arrives: the full fix is used, x included
        chan.write(ChanEntry::VisionY, 120.0);
        let (_, report) = mgr.proc(&chan).unwrap();
        assert!(!report.dead_reckoned);
        assert!((mgr.vehicle.position_cm[0] - 600.0).abs() < 1e-6);
        assert!((mgr.vehicle.position_cm[1] + 120.0).abs() < 1e-6);
    }

    #[test]
    fn test_marker_projection() {
        let mut params = test_params();
        params.marker_fore_cm = 10.0;
        params.marker_mast_cm = 20.0;
        let mut mgr = PilotMgr::with_params(params);

        // Hull north, helm hard to starboard: the marker sits east of the
        // centre, so the centre is the fix reckoned back westwards
        mgr.vehicle.heading_deg = 0.0;
        mgr.vehicle.helm_deg = 90.0;
        mgr.vehicle.roll_deg = 0.0;

        let centre = mgr.project_fix(&Point2::new(50.0, 50.0));
        assert!((centre[0] - 40.0).abs() < 1e-9);
        assert!((centre[1] - 50.0).abs() < 1e-9);

        // Rolling 30 degrees to starboard leans the mast east; the fix
        // displaces east of the true centre, so the correction pulls west
        mgr.vehicle.helm_deg = 0.0;
        mgr.vehicle.roll_deg = 30.0;

        let centre = mgr.project_fix(&Point2::new(50.0, 50.0));
        assert!((centre[0] - 40.0).abs() < 1e-9);
        assert!((centre[1] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_flush_failure_is_an_error() {
        use std::path::PathBuf;
        use util::session::Session;

        let chan = test_chan("flush_fail");
        let mut mgr = PilotMgr::with_params(test_params());

        // A session rooted in a directory that does not exist, so the CSV
        // flush at stop cannot succeed
        let root = PathBuf::from(format!(
            "/no_such_dir_{}/session",
            std::process::id()
        ));
        mgr.session = Some(Session {
            log_file_path: root.join("pilot_exec.log"),
            session_root: root,
        });

        chan.write_kill();

        // The failure must surface as an error, not a panic, so the caller
        // can still run its own teardown
        match mgr.proc(&chan) {
            Err(PilotMgrError::LogFlushError(_)) => (),
            other => panic!("expected a flush error, found {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_stale_vision_pauses_then_resumes() {
        let chan = test_chan("stale");
        let mut params = test_params();
        params.max_vision_age_ms = 0;
        params.mark_rot_dirs = vec![];
        let mut mgr = PilotMgr::with_params(params);

        chan.write(ChanEntry::CalibQuality, 5.0);
        mgr.proc(&chan).unwrap();
        chan.write(ChanEntry::MarkCount, 0.0);
        chan.write(ChanEntry::VisionX, 500.0);
        chan.write(ChanEntry::VisionY, 100.0);
        mgr.proc(&chan).unwrap();
        chan.write_go();
        mgr.proc(&chan).unwrap();

        // Running with no fresh fix and a zero age limit: pause. The entry
        // timestamps are milliseconds, so sleep long enough to age them
        std::thread::sleep(std::time::Duration::from_millis(5));
        let (dems, _) = mgr.proc(&chan).unwrap();
        assert_eq!(mgr.mode(), PilotMode::Paused);
        assert_eq!(dems, HelmDems::zero());

        // A fresh fix resumes without operator action
        mgr.params.max_vision_age_ms = 500;
        chan.write(ChanEntry::VisionX, 500.0);
        chan.write(ChanEntry::VisionY, 100.0);
        mgr.proc(&chan).unwrap();
        assert_eq!(mgr.mode(), PilotMode::Running);
    }
}
