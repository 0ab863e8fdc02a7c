//! # Course interface library
//!
//! This library defines the interfaces shared between the executables of the
//! regatta vehicle software:
//!
//! - [`chan`] - the shared state channel, a lock-free memory-mapped region
//!   through which the vision producer, the AHRS reader and the piloting
//!   controller exchange timestamped values across process boundaries.
//! - [`eqpt`] - equipment interface types: helm demands, AHRS frames and
//!   vision frames, together with the traits fronting their transports.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod chan;
pub mod eqpt;
