//! # Equipment interfaces
//!
//! Data types and transport-facing traits for the vehicle's equipment: the
//! helm actuator, the AHRS and the overhead vision source. The transports
//! themselves (serial line, HTTP capture) are external collaborators; each
//! has a sim implementation for bench runs and tests.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod ahrs;
pub mod helm;
pub mod vision;
