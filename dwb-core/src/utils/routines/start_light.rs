//! Start light detection.
//!
//! The CdS cell reads about 2.9 V in the dark, 1.6 V under blue light and
//! 0.5 V under the red start light. The run begins once the reading drops
//! below a threshold.

use embassy_time::Duration;

use crate::utils::{
    controllers::{DriveController, Outcome},
    platform::{AbortSignal, Clock, DriveActuator, LightSensor, PoseSource},
};

/// Reading below which the start light counts as on.
pub const DEFAULT_THRESHOLD: f32 = 1.0;
/// How long to wait for the light before giving up.
pub const DEFAULT_TIMEOUT_SECS: f32 = 120.0;

impl<P, D, C, A> DriveController<P, D, C, A>
where
    P: PoseSource,
    D: DriveActuator,
    C: Clock,
    A: AbortSignal,
{
    /// Poll `sensor` until it reads below `threshold` volts.
    ///
    /// Returns `Completed`, `TimedOut` or `Aborted`. The wheels are not touched.
    pub fn wait_for_start_light<L: LightSensor + ?Sized>(
        &mut self,
        sensor: &mut L,
        threshold: f32,
        timeout: Duration,
    ) -> Outcome {
        let start = self.clock.now();
        let poll = self.config.poll_interval();
        loop {
            let volts = sensor.voltage();
            if volts < threshold {
                tracing::info!(volts, "start light detected");
                return Outcome::Completed;
            }
            if self.elapsed_since(start) >= timeout {
                tracing::warn!(volts, threshold, "start light never came on");
                return Outcome::TimedOut;
            }
            if self.abort.is_aborted() {
                return Outcome::Aborted;
            }
            self.clock.sleep(poll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{
        platform::Pose,
        sim::{SimParams, SimWorld},
    };

    #[test]
    fn test_waits_until_light() {
        let world = SimWorld::new(Pose::new(10.0, 10.0, 0.0), None);
        let mut ctrl = DriveController::new(world.pose(), world.drive(), world.clock(), None);
        let outcome =
            ctrl.wait_for_start_light(&mut world.light(), DEFAULT_THRESHOLD, Duration::from_secs(5));
        assert_eq!(outcome, Outcome::Completed);
        assert!(world.now().as_millis() >= 500);
        assert_eq!(world.writes(), 0);
    }

    #[test]
    fn test_times_out_in_the_dark() {
        let params = SimParams {
            light_on_after_secs: None,
            ..SimParams::default()
        };
        let world = SimWorld::new(Pose::new(10.0, 10.0, 0.0), Some(params));
        let mut ctrl = DriveController::new(world.pose(), world.drive(), world.clock(), None);
        let outcome =
            ctrl.wait_for_start_light(&mut world.light(), DEFAULT_THRESHOLD, Duration::from_secs(2));
        assert_eq!(outcome, Outcome::TimedOut);
    }
}
