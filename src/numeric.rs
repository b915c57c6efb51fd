//! Basic numerical concepts used throughout the program

#![allow(missing_docs)]

// Floating-point precision is configured here. NanoAOD stores most kinematic
// branches in single precision, but every derived quantity is computed and
// saved in double precision.
pub type Float = f64;
pub use std::f64 as floats;
