//! # Navigation module
//!
//! Course geometry and route planning for the pilot. [`geom`] provides the
//! pure conversion and construction functions (vector/slope/angle/theta/
//! heading, perpendicular tangent points, dead reckoning, arc sweeps);
//! [`route`] turns an ordered set of marks into the sequence of line and arc
//! legs the pilot flies.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod geom;
pub mod route;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use geom::*;
pub use route::*;
