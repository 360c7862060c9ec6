//! Open-loop timed primitives used by maneuver scripts.

use embassy_time::Duration;

use super::{DriveController, Outcome};
use crate::utils::platform::{AbortSignal, Clock, DriveActuator, DriveCommand, PoseSource};

impl<P, D, C, A> DriveController<P, D, C, A>
where
    P: PoseSource,
    D: DriveActuator,
    C: Clock,
    A: AbortSignal,
{
    /// Both wheels at `speed_pct` for `duration`, then stop. Negative drives backward.
    pub fn drive_straight(
        &mut self,
        speed_pct: f32,
        duration: Duration,
    ) -> Outcome {
        tracing::debug!(speed_pct, ?duration, "drive straight");
        self.hold(DriveCommand::straight(speed_pct), duration)
    }

    /// Wheels equal and opposite for `duration`, then stop.
    ///
    /// Positive `speed_pct` turns clockwise (left wheel forward).
    pub fn turn_in_place(
        &mut self,
        speed_pct: f32,
        duration: Duration,
    ) -> Outcome {
        tracing::debug!(speed_pct, ?duration, "turn in place");
        self.hold(DriveCommand::spin(speed_pct), duration)
    }

    /// Wait with the wheels untouched.
    pub fn pause(
        &mut self,
        duration: Duration,
    ) -> Outcome {
        let start = self.clock.now();
        loop {
            let elapsed = self.elapsed_since(start);
            if elapsed >= duration {
                return Outcome::Completed;
            }
            if self.abort.is_aborted() {
                return Outcome::Aborted;
            }
            self.clock.sleep(self.config.poll_interval().min(duration - elapsed));
        }
    }

    fn hold(
        &mut self,
        command: DriveCommand,
        duration: Duration,
    ) -> Outcome {
        let start = self.clock.now();
        self.drive.apply(command);
        loop {
            let elapsed = self.elapsed_since(start);
            if elapsed >= duration {
                return self.finish(true, Outcome::Completed);
            }
            if self.abort.is_aborted() {
                return self.finish(true, Outcome::Aborted);
            }
            self.clock.sleep(self.config.poll_interval().min(duration - elapsed));
        }
    }
}
