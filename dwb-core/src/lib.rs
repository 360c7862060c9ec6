//! Heading and position controllers for the Differential-Wheel Bot on no-std embedded platforms.
//!
//! For a runnable host simulation, see the `dwb-app/sim-bot` crate.
#![no_std]

pub mod utils;
