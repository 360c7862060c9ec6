//! Heading controller.
//!
//! Bang-bang correction: while the heading error is outside tolerance the
//! wheels spin equal and opposite at `turn_speed` in the direction of the
//! shortest rotation.

use embassy_time::{Duration, Instant};
use libm::fabsf;

use super::{DriveController, Outcome};
use crate::utils::{
    math::geometry::{heading_error, normalize_degrees},
    platform::{AbortSignal, Clock, DriveActuator, DriveCommand, Pose, PoseSource},
};

impl<P, D, C, A> DriveController<P, D, C, A>
where
    P: PoseSource,
    D: DriveActuator,
    C: Clock,
    A: AbortSignal,
{
    /// Turn in place until the heading is within `tolerance_deg` of `target_deg`.
    ///
    /// Returns `Converged`, `TimedOut`, `SignalLost` or `Aborted`. If the pose
    /// is missing on entry, or the robot already faces the target, the wheels
    /// are never written.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn drive_to_heading(
        &mut self,
        target_deg: f32,
        tolerance_deg: f32,
        timeout: Duration,
    ) -> Outcome {
        let start = self.clock.now();
        let Some(first) = self.pose.current_pose() else {
            tracing::warn!("no RPS signal, heading correction skipped");
            return Outcome::SignalLost;
        };
        self.turn_toward(target_deg, tolerance_deg, first, start, timeout)
    }

    /// Heading loop starting from an already read pose, bounded by `budget`
    /// measured from `start`. Later dropouts get the signal grace period.
    pub(crate) fn turn_toward(
        &mut self,
        target_deg: f32,
        tolerance_deg: f32,
        first: Pose,
        start: Instant,
        budget: Duration,
    ) -> Outcome {
        let target = normalize_degrees(target_deg);
        let tolerance = fabsf(tolerance_deg);
        let poll = self.config.poll_interval();
        let grace = self.config.signal_grace();
        let turn_speed = fabsf(self.config.turn_speed);

        let mut pose = Some(first);
        let mut engaged = false;
        let mut lost_since: Option<Instant> = None;

        loop {
            match pose {
                Some(current) => {
                    lost_since = None;
                    let error = heading_error(current.heading, target);
                    if fabsf(error) <= tolerance {
                        return self.finish(engaged, Outcome::Converged);
                    }
                    if self.elapsed_since(start) >= budget {
                        return self.finish(engaged, Outcome::TimedOut);
                    }
                    if self.abort.is_aborted() {
                        return self.finish(engaged, Outcome::Aborted);
                    }
                    // positive error is counter-clockwise, i.e. right wheel forward
                    let spin = if error > 0.0 { -turn_speed } else { turn_speed };
                    self.drive.apply(DriveCommand::spin(spin));
                    engaged = true;
                    tracing::debug!(heading = current.heading, target, error, "turning");
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
                    if self.elapsed_since(start) >= budget {
                        return self.finish(engaged, Outcome::TimedOut);
                    }
                    if self.abort.is_aborted() {
                        return self.finish(engaged, Outcome::Aborted);
                    }
                    tracing::debug!("RPS signal dropped while turning");
                }
            }
            self.clock.sleep(poll);
            pose = self.pose.current_pose();
        }
    }
}
