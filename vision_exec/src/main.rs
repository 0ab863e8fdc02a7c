//! # Vision Executable
//!
//! This executable produces position fixes for the pilot. It polls the
//! overhead vision source and publishes the vehicle fix, the surveyed mark
//! positions and the mark count onto the shared channel. Absence of a fix
//! on any given poll is normal; the previously published fix simply ages
//! until the pilot's staleness limit suspends piloting.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

mod params;
mod source;

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::time::Duration;

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{info, trace, warn};

use course_if::chan::{ChanEntry, SharedChannel};
use course_if::eqpt::vision::{VisionError, VisionSource};
use params::VisionExecParams;
use source::ScriptSource;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// -----------------------------------------------------------------------------------------------
// MAIN
// -----------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session =
        Session::new("vision_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution
    info!("Regatta Vision Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: VisionExecParams =
        util::params::load("vision_exec.toml").wrap_err("Could not load params")?;

    info!("Parameters loaded");

    // ---- INIT CHANNEL ----

    let sw_root = host::get_regatta_sw_root()
        .map_err(|e| eyre!("Software root not resolvable: {}", e))?;
    let chan_path = sw_root.join(&params.chan_file_path);

    let chan = SharedChannel::open(&chan_path)
        .wrap_err_with(|| format!("Could not open the channel at {:?}", chan_path))?;

    info!("Channel opened at {:?}", chan_path);

    // ---- INIT SOURCE ----

    let script_path = sw_root.join(&params.script_file_path);
    let mut source = ScriptSource::from_file(&script_path)
        .wrap_err_with(|| format!("Could not load the script at {:?}", script_path))?;

    info!("Vision source initialised");

    let poll_timeout = Duration::from_millis(params.poll_timeout_ms);

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Stand down with everyone else
        if chan.is_killed() {
            info!("Kill received, stopping");
            break;
        }

        match source.poll(poll_timeout) {
            Ok(Some(frame)) => {
                trace!(
                    "Vision frame: vehicle at ({:.1}, {:.1}) px, {} mark(s)",
                    frame.vehicle_fix_px.0,
                    frame.vehicle_fix_px.1,
                    frame.waypoint_fixes_px.len()
                );

                // Marks first so a consumer woken by the vehicle fix never
                // sees a fresher fix than survey
                for (i, fix) in frame.waypoint_fixes_px.iter().enumerate() {
                    chan.write(ChanEntry::MarkX(i), fix.0 as f32);
                    chan.write(ChanEntry::MarkY(i), fix.1 as f32);
                }
                chan.write(ChanEntry::MarkCount, frame.waypoint_fixes_px.len() as f32);

                chan.write(ChanEntry::VisionX, frame.vehicle_fix_px.0 as f32);
                chan.write(ChanEntry::VisionY, frame.vehicle_fix_px.1 as f32);
            }
            Ok(None) => {
                if source.exhausted() {
                    info!("End of the scripted run reached, stopping");
                    break;
                }
            }
            // An oversized frame is dropped, any other source error is fatal
            Err(VisionError::TooManyWaypoints(n)) => {
                warn!("Dropping frame with {} waypoint fixes", n);
            }
            Err(e) => {
                return Err(e).wrap_err("The vision source failed");
            }
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}
