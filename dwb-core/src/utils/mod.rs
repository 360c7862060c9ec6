//! Utility re-exports for the Differential-Wheel Bot.
//!
//! - `platform`: traits for the pose source, drive actuator, clock and the
//!   other hardware collaborators, plus the adapters we ship for them
//! - `controllers`: heading and position controllers and the timed primitives
//! - `math`: angle and distance helpers shared by the controllers
//! - `routines`: maneuver scripts, start light, self test and session state
//! - `sim`: a differential-drive world under virtual time

pub mod controllers;
pub mod math;
pub mod platform;
pub mod routines;
pub mod sim;

pub use controllers::{ControllerConfig, DriveController, Outcome};
pub use embassy_time::{Duration, Instant};
pub use platform::{Clock, DriveActuator, Pose, PoseSource};
