//! Pilot executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Kill check
//!         - Piloting manager processing:
//!             - Channel data acquisition
//!             - Mode execution and steering
//!         - Helm demand output
//!         - Cycle management
//!
//! Attitude acquisition runs on the AHRS client's own thread; vision fixes
//! arrive from the vision executable over the shared channel.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use pilot_lib::{
    ahrs_client::AhrsClient,
    helm_client::HelmClient,
    pilot_mgr::PilotMgr,
};

mod params;

use params::PilotExecParams;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{error, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use course_if::chan::SharedChannel;
use course_if::eqpt::ahrs::SimAhrs;
use course_if::eqpt::helm::SimHelm;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session =
        Session::new("pilot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution
    info!("Regatta Pilot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: PilotExecParams =
        util::params::load("pilot_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE CHANNEL ----

    let sw_root = host::get_regatta_sw_root()
        .map_err(|e| eyre!("Software root not resolvable: {}", e))?;
    let chan_path = sw_root.join(&exec_params.chan_file_path);

    // The orchestrator creates the channel before spawning this process
    let chan = Arc::new(
        SharedChannel::open(&chan_path)
            .wrap_err_with(|| format!("Could not open the channel at {:?}", chan_path))?,
    );

    info!("Channel opened at {:?}", chan_path);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let ahrs_client = AhrsClient::spawn(
        Box::new(SimAhrs::new(
            exec_params.sim_ahrs_heading_deg,
            exec_params.sim_ahrs_roll_deg,
            exec_params.sim_ahrs_target_quality,
        )),
        chan.clone(),
        Duration::from_millis(exec_params.ahrs_poll_timeout_ms),
    );
    info!("AhrsClient init complete");

    let mut pilot_mgr = PilotMgr::init("pilot_mgr.toml", session.clone())
        .wrap_err("Failed to initialise PilotMgr")?;
    info!("PilotMgr init complete");

    let mut helm_client = HelmClient::new(
        Box::new(SimHelm::default()),
        pilot_mgr.params.helm_bias_deg,
        Duration::from_millis(exec_params.helm_min_send_interval_ms),
    );
    info!("HelmClient init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- PILOTING PROCESSING ----

        // An error here must still fall through to the shutdown block so
        // the kill is raised and the helm zeroed
        let (dems, _rpt) = match pilot_mgr.proc(&chan) {
            Ok(out) => out,
            Err(e) => {
                error!("Error during PilotMgr processing, stopping: {}", e);
                break;
            }
        };

        // ---- DEMAND OUTPUT ----

        if pilot_mgr.is_stopped() {
            info!("PilotMgr stopped, ending main loop");
            break;
        }

        // A helm transport failure is fatal: the vehicle cannot be trusted
        // to stand down on command, so everyone stops
        if let Err(e) = helm_client.send_dems(&dems) {
            error!("Could not send helm demands, stopping: {}", e);
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(exec_params.cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - exec_params.cycle_period_s
            ),
        }
    }

    // ---- SHUTDOWN ----

    // Kill first so the AHRS thread is released even if zeroing fails
    chan.write_kill();

    if let Err(e) = helm_client.zero() {
        error!("Could not zero the helm during shutdown: {}", e);
    }

    ahrs_client.join();

    info!("End of execution");

    Ok(())
}
