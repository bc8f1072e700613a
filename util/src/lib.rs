//! Utility library for the differential drive software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod atomic;
pub mod host;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod time;
