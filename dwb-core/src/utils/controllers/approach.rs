//! Position approach controller.
//!
//! Turn toward the target, then drive forward with the duty cycle scaled by
//! the remaining distance ratio, never below `creep_ratio` of cruise speed.
//! Forward driving accumulates heading drift, so the heading controller is
//! re-run periodically and whenever the bearing error grows too large.

use embassy_time::{Duration, Instant};
use libm::fabsf;

use super::{DriveController, HeadingFailurePolicy, Outcome};
use crate::utils::{
    math::geometry::{bearing_deg, distance, heading_error},
    platform::{AbortSignal, Clock, DriveActuator, DriveCommand, Pose, PoseSource},
};

impl<P, D, C, A> DriveController<P, D, C, A>
where
    P: PoseSource,
    D: DriveActuator,
    C: Clock,
    A: AbortSignal,
{
    /// Drive to `(target_x, target_y)` and stop within `arrival_radius`.
    ///
    /// The whole call, including heading corrections, is bounded by
    /// `timeout`. Returns `Arrived`, `TimedOut`, `SignalLost` or `Aborted`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn drive_to_position(
        &mut self,
        target_x: f32,
        target_y: f32,
        arrival_radius: f32,
        timeout: Duration,
    ) -> Outcome {
        let start = self.clock.now();
        let radius = fabsf(arrival_radius);
        let poll = self.config.poll_interval();
        let grace = self.config.signal_grace();
        let interval = self.config.reheading_interval;
        let tolerance = fabsf(self.config.heading_tolerance);
        // below the heading tolerance a fresh correction could never satisfy it
        let threshold = fabsf(self.config.reheading_threshold).max(tolerance);

        let Some(origin) = self.pose.current_pose() else {
            tracing::warn!("no RPS signal, approach skipped");
            return Outcome::SignalLost;
        };
        let initial = distance(origin.x, origin.y, target_x, target_y);
        if initial <= radius {
            tracing::info!(initial, radius, "already at target");
            return Outcome::Arrived;
        }

        let bearing = bearing_deg(origin.x, origin.y, target_x, target_y);
        tracing::info!(bearing, initial, "turning toward target");
        // set after a tolerated heading failure, until the next periodic check
        let mut hold_course = match self.reorient(bearing, origin, start, timeout) {
            Ok(converged) => !converged,
            Err(outcome) => return outcome,
        };

        let mut engaged = false;
        let mut lost_since: Option<Instant> = None;
        let mut iterations: u32 = 0;

        loop {
            match self.pose.current_pose() {
                Some(current) => {
                    lost_since = None;
                    let remaining = distance(current.x, current.y, target_x, target_y);
                    if remaining <= radius {
                        return self.finish(engaged, Outcome::Arrived);
                    }
                    if self.elapsed_since(start) >= timeout {
                        return self.finish(engaged, Outcome::TimedOut);
                    }
                    if self.abort.is_aborted() {
                        return self.finish(engaged, Outcome::Aborted);
                    }

                    iterations = iterations.wrapping_add(1);
                    let bearing = bearing_deg(current.x, current.y, target_x, target_y);
                    let drift = heading_error(current.heading, bearing);
                    let periodic = interval > 0 && iterations % interval == 0;
                    let off = fabsf(drift);
                    if off > tolerance && (periodic || (!hold_course && off > threshold)) {
                        tracing::debug!(drift, periodic, "re-checking heading");
                        if engaged {
                            self.drive.stop();
                            engaged = false;
                        }
                        match self.reorient(bearing, current, start, timeout) {
                            Ok(converged) => hold_course = !converged,
                            Err(outcome) => return outcome,
                        }
                        continue;
                    }

                    let speed = self.config.approach_speed(remaining, initial);
                    self.drive.apply(DriveCommand::straight(speed));
                    engaged = true;
                    tracing::debug!(x = current.x, y = current.y, remaining, speed, "approaching");
                }
                None => {
                    if engaged {
                        self.drive.stop();
                        engaged = false;
                    }
                    let now = self.clock.now();
                    let since = *lost_since.get_or_insert(now);
                    if self.elapsed_since(since) >= grace {
                        return self.finish(engaged, Outcome::SignalLost);
                    }
                    if self.elapsed_since(start) >= timeout {
                        return self.finish(engaged, Outcome::TimedOut);
                    }
                    if self.abort.is_aborted() {
                        return self.finish(engaged, Outcome::Aborted);
                    }
                    tracing::debug!("RPS signal dropped while approaching");
                }
            }
            self.clock.sleep(poll);
        }
    }

    /// Run the heading controller toward `bearing` from `current`, within what
    /// is left of the approach budget.
    ///
    /// `Ok(true)` means the heading converged, `Ok(false)` that it did not but
    /// the failure policy lets the approach drive on. `Err` ends the approach.
    fn reorient(
        &mut self,
        bearing: f32,
        current: Pose,
        start: Instant,
        timeout: Duration,
    ) -> Result<bool, Outcome> {
        let remaining = timeout
            .checked_sub(self.elapsed_since(start))
            .unwrap_or(Duration::from_ticks(0));
        let budget = remaining.min(self.config.heading_timeout());
        let tolerance = self.config.heading_tolerance;

        match self.turn_toward(bearing, tolerance, current, self.clock.now(), budget) {
            Outcome::Converged => Ok(true),
            Outcome::TimedOut
                if self.config.heading_failure == HeadingFailurePolicy::Proceed
                    && self.elapsed_since(start) < timeout =>
            {
                tracing::warn!(bearing, "heading not reached, proceeding anyway");
                Ok(false)
            }
            other => Err(other),
        }
    }
}
