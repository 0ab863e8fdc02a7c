//! # Orchestrator Executable
//!
//! The orchestrator owns the run: it creates the shared channel, spawns the
//! vision and pilot executables as child processes and mediates the
//! operator's two inputs - go and kill. The kill entry in the channel is
//! the single stand-down path: raised here on Ctrl-C or an operator kill
//! command, raised by either child on a fatal fault, and observed by
//! everyone. Once raised it is never lowered; the run is over.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

mod params;

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::io::BufRead;
use std::process::{Child, Command};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{error, info, warn};

use course_if::chan::SharedChannel;
use params::OrchExecParams;
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
    let session = Session::new("orch_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution
    info!("Regatta Orchestrator Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: OrchExecParams =
        util::params::load("orch_exec.toml").wrap_err("Could not load params")?;

    info!("Parameters loaded");

    // ---- CREATE CHANNEL ----

    let sw_root = host::get_regatta_sw_root()
        .map_err(|e| eyre!("Software root not resolvable: {}", e))?;
    let chan_path = sw_root.join(&params.chan_file_path);

    // Created fresh each run so no stale go, kill or fix survives from the
    // last one
    let chan = Arc::new(
        SharedChannel::create(&chan_path)
            .wrap_err_with(|| format!("Could not create the channel at {:?}", chan_path))?,
    );

    info!("Channel created at {:?}", chan_path);

    // ---- SIGNAL HANDLING ----

    let sig_chan = chan.clone();
    ctrlc::set_handler(move || {
        eprintln!("Ctrl-C received, raising kill");
        sig_chan.write_kill();
    })
    .wrap_err("Failed to set the Ctrl-C handler")?;

    // ---- OPERATOR INPUT ----

    // Stdin is read on its own thread so a quiet console never blocks
    // child supervision
    let op_chan = chan.clone();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();

        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };

            match line.trim() {
                "go" => {
                    info!("Operator go");
                    op_chan.write_go();
                }
                "kill" => {
                    info!("Operator kill");
                    op_chan.write_kill();
                }
                "" => (),
                other => warn!("Unknown command {:?}, expected \"go\" or \"kill\"", other),
            }
        }
    });

    info!("Operator console ready: type \"go\" to start, \"kill\" to stand down");

    // ---- SPAWN CHILDREN ----

    let mut vision = spawn_child(&params.vision_exec_cmd).wrap_err("Could not spawn vision")?;
    info!("Vision executable spawned, pid {}", vision.id());

    let mut pilot = spawn_child(&params.pilot_exec_cmd).wrap_err("Could not spawn pilot")?;
    info!("Pilot executable spawned, pid {}", pilot.id());

    // ---- SUPERVISION LOOP ----

    let reap_period = Duration::from_millis(params.reap_period_ms);
    let mut vision_done = false;
    let mut pilot_done = false;

    loop {
        if !vision_done {
            vision_done = reap(&mut vision, "vision")?;
        }
        if !pilot_done {
            pilot_done = reap(&mut pilot, "pilot")?;
        }

        // Either child exiting ends the run for both
        if vision_done || pilot_done {
            chan.write_kill();
        }

        if vision_done && pilot_done {
            break;
        }

        std::thread::sleep(reap_period);
    }

    // ---- SHUTDOWN ----

    info!("Both children have exited");
    info!("End of execution");

    Ok(())
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Spawn a child process from a whitespace-separated command line.
fn spawn_child(cmd: &str) -> Result<Child> {
    let mut parts = cmd.split_whitespace();
    let program = parts.next().ok_or_else(|| eyre!("Empty command line"))?;

    Command::new(program)
        .args(parts)
        .spawn()
        .wrap_err_with(|| format!("Could not spawn {:?}", cmd))
}

/// Check whether a child has exited, logging its status if it has.
fn reap(child: &mut Child, name: &str) -> Result<bool> {
    match child.try_wait().wrap_err("try_wait failed")? {
        Some(status) => {
            if status.success() {
                info!("The {} executable has exited cleanly", name);
            } else {
                error!("The {} executable has exited with {}", name, status);
            }
            Ok(true)
        }
        None => Ok(false),
    }
}
