//! Weighted consistent hashing continuum.
//!
//! A [`Continuum`] maps cache keys to backend servers with the classic
//! fixed-point ring scheme: every server contributes many pseudo-random
//! 32-bit points, a key hashes to a single 32-bit value, and the first
//! server point at or past that value (wrapping at the top) owns the key.
//! Servers with larger weights contribute proportionally more points, and
//! a membership change remaps only the keys whose owning arc moved.
//!
//! Continuums are immutable once built. To pick up a changed server list,
//! build a new one and swap it in behind an `Arc`; readers holding the old
//! one are unaffected.

mod continuum;
mod error;

pub use continuum::{Continuum, Servers};
pub use error::RingError;
