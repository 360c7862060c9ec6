//! Drive controllers for the Differential-Wheel Bot.
//!
//! `DriveController` owns the pose source, the drive actuator and the clock
//! for as long as it lives, so only one control loop can command the wheels at
//! a time. Every call is a fresh, bounded loop that returns an `Outcome` and
//! leaves the wheels stopped.
//!
//! - `heading`: bang-bang heading correction (`drive_to_heading`)
//! - `approach`: orient then drive to a point (`drive_to_position`)
//! - `timed`: open-loop straight/turn/pause primitives

pub mod approach;
pub mod heading;
pub mod timed;

use core::fmt;

use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};

use crate::utils::{
    math::geometry::approach_ratio,
    platform::{secs, AbortSignal, Clock, DriveActuator, NoAbort, PoseSource},
};

/// Result of a controller call.
///
/// None of these are fatal; the caller decides whether a failure aborts a
/// maneuver sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Heading within tolerance.
    Converged,
    /// Position within the arrival radius.
    Arrived,
    /// Open-loop primitive ran for its full duration.
    Completed,
    /// Tolerance not satisfied within the time budget.
    TimedOut,
    /// RPS reported no pose.
    SignalLost,
    /// The abort flag was raised.
    Aborted,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Converged | Outcome::Arrived | Outcome::Completed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let text = match self {
            Outcome::Converged => "converged",
            Outcome::Arrived => "arrived",
            Outcome::Completed => "completed",
            Outcome::TimedOut => "timed out",
            Outcome::SignalLost => "RPS signal lost",
            Outcome::Aborted => "aborted",
        };
        f.write_str(text)
    }
}

/// What the approach controller does when its initial turn does not converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingFailurePolicy {
    /// Return the heading stage's outcome.
    #[default]
    Abort,
    /// Log a warning and drive on the current heading anyway. Large bearing
    /// errors are then left alone until the next periodic re-heading.
    Proceed,
}

/// Controller tunables. Speeds are in percent, angles in degrees, distances
/// in RPS units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Wheel duty cycle used while turning toward a heading.
    pub turn_speed: f32,
    /// Wheel duty cycle at the start of an approach.
    pub cruise_speed: f32,
    pub heading_tolerance: f32,
    pub heading_timeout_secs: f32,
    pub arrival_radius: f32,
    pub approach_timeout_secs: f32,
    /// Lowest fraction of `cruise_speed` used near the target.
    pub creep_ratio: f32,
    pub poll_interval_ms: u64,
    /// Re-run the heading controller every this many approach iterations (0 disables).
    pub reheading_interval: u32,
    /// Re-run the heading controller when the bearing error exceeds this.
    pub reheading_threshold: f32,
    /// How long a lost RPS signal is tolerated inside a loop.
    pub signal_grace_ms: u64,
    pub heading_failure: HeadingFailurePolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            turn_speed: 25.0,
            cruise_speed: 25.0,
            heading_tolerance: 3.0,
            heading_timeout_secs: 5.0,
            arrival_radius: 3.0,
            approach_timeout_secs: 20.0,
            creep_ratio: 0.2,
            poll_interval_ms: 20,
            reheading_interval: 25,
            reheading_threshold: 10.0,
            signal_grace_ms: 500,
            heading_failure: HeadingFailurePolicy::Abort,
        }
    }
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn heading_timeout(&self) -> Duration {
        secs(self.heading_timeout_secs)
    }

    pub fn approach_timeout(&self) -> Duration {
        secs(self.approach_timeout_secs)
    }

    pub fn signal_grace(&self) -> Duration {
        Duration::from_millis(self.signal_grace_ms)
    }

    /// Forward duty cycle with `remaining` of `initial` distance left.
    pub fn approach_speed(
        &self,
        remaining: f32,
        initial: f32,
    ) -> f32 {
        self.cruise_speed * approach_ratio(remaining, initial, self.creep_ratio)
    }
}

/// Closed-loop and timed drive control over the platform traits.
pub struct DriveController<P, D, C, A = NoAbort> {
    pub(crate) pose: P,
    pub(crate) drive: D,
    pub(crate) clock: C,
    pub(crate) abort: A,
    pub(crate) config: ControllerConfig,
}

impl<P, D, C> DriveController<P, D, C, NoAbort>
where
    P: PoseSource,
    D: DriveActuator,
    C: Clock,
{
    /// Create a controller. `None` uses `ControllerConfig::default()`.
    pub fn new(
        pose: P,
        drive: D,
        clock: C,
        config: Option<ControllerConfig>,
    ) -> Self {
        Self {
            pose,
            drive,
            clock,
            abort: NoAbort,
            config: config.unwrap_or_default(),
        }
    }
}

impl<P, D, C, A> DriveController<P, D, C, A>
where
    P: PoseSource,
    D: DriveActuator,
    C: Clock,
    A: AbortSignal,
{
    /// Replace the abort signal polled between iterations.
    pub fn with_abort<B: AbortSignal>(
        self,
        abort: B,
    ) -> DriveController<P, D, C, B> {
        DriveController {
            pose: self.pose,
            drive: self.drive,
            clock: self.clock,
            abort,
            config: self.config,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ControllerConfig {
        &mut self.config
    }

    /// Direct access to the wheels for routines that bypass the controllers.
    pub fn drive_mut(&mut self) -> &mut D {
        &mut self.drive
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn pose_mut(&mut self) -> &mut P {
        &mut self.pose
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn into_parts(self) -> (P, D, C) {
        (self.pose, self.drive, self.clock)
    }

    pub(crate) fn elapsed_since(
        &self,
        start: Instant,
    ) -> Duration {
        self.clock.elapsed_since(start)
    }

    /// Stop the wheels if this call moved them, then report `outcome`.
    pub(crate) fn finish(
        &mut self,
        engaged: bool,
        outcome: Outcome,
    ) -> Outcome {
        if engaged {
            self.drive.stop();
        }
        if outcome.is_success() {
            tracing::debug!(%outcome, "controller finished");
        } else {
            tracing::warn!(%outcome, "controller finished without success");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_lab_constants() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.turn_speed, 25.0);
        assert_eq!(cfg.heading_tolerance, 3.0);
        assert_eq!(cfg.heading_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.arrival_radius, 3.0);
    }

    #[test]
    fn test_approach_speed_half_distance() {
        let cfg = ControllerConfig::default();
        assert!(libm::fabsf(cfg.approach_speed(5.0, 10.0) - 12.5) < 1e-4);
        // floor holds near the target
        assert!(libm::fabsf(cfg.approach_speed(0.1, 10.0) - 5.0) < 1e-4);
    }

    #[test]
    fn test_partial_config_json() {
        let cfg: ControllerConfig =
            serde_json::from_str(r#"{"cruise_speed": 40.0, "heading_failure": "proceed"}"#)
                .unwrap();
        assert_eq!(cfg.cruise_speed, 40.0);
        assert_eq!(cfg.heading_failure, HeadingFailurePolicy::Proceed);
        assert_eq!(cfg.turn_speed, 25.0);
    }

    #[test]
    fn test_outcome_text() {
        extern crate std;
        use std::string::ToString;
        assert_eq!(Outcome::SignalLost.to_string(), "RPS signal lost");
        assert!(Outcome::Arrived.is_success());
        assert!(!Outcome::TimedOut.is_success());
    }
}
