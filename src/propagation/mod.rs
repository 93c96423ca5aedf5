//! Orbital propagation module
//!
//! SGP4 propagation via satkit, the simulation clock, and the track builder
//! that turns a fleet into position samples and trajectory paths.

mod clock;
mod orbit_track;
mod propagator;

pub use clock::*;
pub use orbit_track::*;
pub use propagator::*;
