//! Hardware seams for the Differential-Wheel Bot.
//!
//! The controllers only talk to the robot through the traits in this module:
//! a polled pose source (RPS), a two-wheel duty-cycle actuator, a blocking
//! clock, and an abort flag. The remaining traits cover the collaborators the
//! routines need (CdS cell, claw servo, status screen).
//!
//! - `clock`: `Clock` over the embassy time driver
//! - `shared_pose`: lock-protected pose slot written by the RPS receiver
//! - `pca9685`: `DriveActuator` over a PCA9685 PWM expander

pub mod clock;
pub mod pca9685;
pub mod shared_pose;

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};

use crate::utils::math::geometry::{normalize_degrees, sanitize};

pub use clock::EmbassyClock;
pub use pca9685::{DriveError, Pca9685Drive, Wheel};
pub use shared_pose::SharedPose;

/// Largest duty cycle magnitude a wheel accepts, in percent.
pub const MAX_PERCENT: f32 = 100.0;

/// Clamp a duty cycle into `[-100, 100]`. NaN becomes 0.
pub fn clamp_percent(percent: f32) -> f32 {
    sanitize(percent, -MAX_PERCENT, MAX_PERCENT, 0.0)
}

/// Convert fractional seconds into a `Duration`. Negative or NaN input is zero.
pub fn secs(seconds: f32) -> Duration {
    let s = sanitize(seconds, 0.0, 1.0e6, 0.0);
    Duration::from_micros((s * 1.0e6) as u64)
}

/// Absolute robot pose as reported by RPS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    /// Degrees in `[0, 360)`, counter-clockwise from +X.
    pub heading: f32,
}

impl Pose {
    /// Build a pose, wrapping `heading` into `[0, 360)`.
    pub fn new(
        x: f32,
        y: f32,
        heading: f32,
    ) -> Self {
        Self {
            x,
            y,
            heading: normalize_degrees(heading),
        }
    }

    /// Interpret a raw RPS reading.
    ///
    /// RPS reports negative sentinels when the robot is out of range or the
    /// beacon has not been seen yet; those readings map to `None`.
    pub fn from_rps(
        x: f32,
        y: f32,
        heading: f32,
    ) -> Option<Self> {
        let finite = x.is_finite() && y.is_finite() && heading.is_finite();
        if finite && x > 0.0 && y > 0.0 && heading >= 0.0 {
            Some(Self::new(x, y, heading))
        } else {
            None
        }
    }
}

/// Left/right wheel duty cycles in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveCommand {
    pub left: f32,
    pub right: f32,
}

impl DriveCommand {
    pub const STOP: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    /// Build a command, clamping both sides into `[-100, 100]`.
    pub fn new(
        left: f32,
        right: f32,
    ) -> Self {
        Self {
            left: clamp_percent(left),
            right: clamp_percent(right),
        }
    }

    /// Both wheels at the same duty cycle. Negative drives backward.
    pub fn straight(percent: f32) -> Self {
        Self::new(percent, percent)
    }

    /// Wheels equal and opposite. Positive spins clockwise (left wheel forward).
    pub fn spin(percent: f32) -> Self {
        Self::new(percent, -percent)
    }

    pub fn is_stop(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

/// Polled source of the robot's absolute pose.
pub trait PoseSource {
    /// Latest pose, or `None` while the signal is lost.
    fn current_pose(&mut self) -> Option<Pose>;
}

/// Independent left/right wheel outputs.
///
/// Implementations clamp out-of-range values instead of rejecting them, and
/// handle their own hardware faults.
pub trait DriveActuator {
    fn set_left(
        &mut self,
        percent: f32,
    );

    fn set_right(
        &mut self,
        percent: f32,
    );

    fn stop(&mut self) {
        self.set_left(0.0);
        self.set_right(0.0);
    }

    fn apply(
        &mut self,
        command: DriveCommand,
    ) {
        self.set_left(command.left);
        self.set_right(command.right);
    }
}

/// Monotonic time plus a blocking sleep.
pub trait Clock {
    fn now(&self) -> Instant;

    fn sleep(
        &mut self,
        duration: Duration,
    );

    /// Time since `start`, saturating at zero.
    fn elapsed_since(
        &self,
        start: Instant,
    ) -> Duration {
        self.now()
            .checked_duration_since(start)
            .unwrap_or(Duration::from_ticks(0))
    }
}

/// Cooperative cancellation flag polled between loop iterations.
pub trait AbortSignal {
    fn is_aborted(&self) -> bool;
}

/// An abort signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAbort;

impl AbortSignal for NoAbort {
    fn is_aborted(&self) -> bool {
        false
    }
}

impl AbortSignal for AtomicBool {
    fn is_aborted(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl<T: AbortSignal + ?Sized> AbortSignal for &T {
    fn is_aborted(&self) -> bool {
        (**self).is_aborted()
    }
}

/// Analog light sensor (CdS cell) reading in volts.
pub trait LightSensor {
    fn voltage(&mut self) -> f32;
}

/// Positional servo driving the claw.
pub trait ClawServo {
    fn set_degree(
        &mut self,
        degrees: f32,
    );
}

/// Text output on the operator screen.
pub trait StatusDisplay {
    fn clear(&mut self);

    fn write_line(
        &mut self,
        line: &str,
    );
}

impl<T: PoseSource + ?Sized> PoseSource for &mut T {
    fn current_pose(&mut self) -> Option<Pose> {
        (**self).current_pose()
    }
}

impl<T: DriveActuator + ?Sized> DriveActuator for &mut T {
    fn set_left(
        &mut self,
        percent: f32,
    ) {
        (**self).set_left(percent)
    }

    fn set_right(
        &mut self,
        percent: f32,
    ) {
        (**self).set_right(percent)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn apply(
        &mut self,
        command: DriveCommand,
    ) {
        (**self).apply(command)
    }
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(
        &mut self,
        duration: Duration,
    ) {
        (**self).sleep(duration)
    }
}

impl<T: StatusDisplay + ?Sized> StatusDisplay for &mut T {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn write_line(
        &mut self,
        line: &str,
    ) {
        (**self).write_line(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rps_rejects_sentinels() {
        assert!(Pose::from_rps(-1.0, -1.0, -1.0).is_none());
        assert!(Pose::from_rps(-2.0, 12.0, 90.0).is_none());
        assert!(Pose::from_rps(12.0, 12.0, -1.0).is_none());
        assert!(Pose::from_rps(f32::NAN, 12.0, 0.0).is_none());
        let pose = Pose::from_rps(12.0, 30.0, 360.0).unwrap();
        assert_eq!(pose.heading, 0.0);
    }

    #[test]
    fn test_drive_command_clamps() {
        let cmd = DriveCommand::new(150.0, -180.0);
        assert_eq!(cmd, DriveCommand::new(100.0, -100.0));
        assert_eq!(DriveCommand::spin(25.0), DriveCommand::new(25.0, -25.0));
        assert!(DriveCommand::straight(f32::NAN).is_stop());
    }

    #[test]
    fn test_secs_conversion() {
        assert_eq!(secs(1.5), Duration::from_millis(1500));
        assert_eq!(secs(-3.0), Duration::from_ticks(0));
    }

    #[test]
    fn test_abort_flag() {
        let flag = AtomicBool::new(false);
        assert!(!(&flag).is_aborted());
        flag.store(true, Ordering::Release);
        assert!(flag.is_aborted());
        assert!(!NoAbort.is_aborted());
    }
}
