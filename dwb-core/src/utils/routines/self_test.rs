//! Motor and claw self test.
//!
//! Runs each wheel forward then backward for a second, then swings the claw
//! servo, announcing every step on the status screen.

use embassy_time::Duration;

use crate::utils::{
    controllers::{DriveController, Outcome},
    platform::{AbortSignal, ClawServo, Clock, DriveActuator, PoseSource, StatusDisplay},
};

const STEP: Duration = Duration::from_secs(1);

#[derive(Clone, Copy)]
enum Step {
    Left(f32),
    Right(f32),
    Claw(f32),
}

/// Exercise both wheels at cruise speed and the claw at 90° and 0°.
///
/// Returns `Completed`, or `Aborted` if the abort flag is raised between
/// steps. The wheels are stopped either way.
pub fn self_test<P, D, C, A, V, S>(
    ctrl: &mut DriveController<P, D, C, A>,
    servo: &mut V,
    display: &mut S,
) -> Outcome
where
    P: PoseSource,
    D: DriveActuator,
    C: Clock,
    A: AbortSignal,
    V: ClawServo + ?Sized,
    S: StatusDisplay + ?Sized,
{
    let speed = ctrl.config.cruise_speed;
    let steps = [
        ("Moving left motor forward", Step::Left(speed)),
        ("Moving left motor backward", Step::Left(-speed)),
        ("Moving right motor forward", Step::Right(speed)),
        ("Moving right motor backward", Step::Right(-speed)),
        ("Testing claw servo forward", Step::Claw(90.0)),
        ("Testing claw servo backward", Step::Claw(0.0)),
    ];

    for (label, step) in steps {
        if ctrl.abort.is_aborted() {
            ctrl.drive.stop();
            display.write_line("Self test aborted");
            return Outcome::Aborted;
        }
        display.clear();
        display.write_line(label);
        tracing::info!("{}", label);
        match step {
            Step::Left(pct) => ctrl.drive.set_left(pct),
            Step::Right(pct) => ctrl.drive.set_right(pct),
            Step::Claw(deg) => servo.set_degree(deg),
        }
        ctrl.clock.sleep(STEP);
        // each motor stops after its backward run
        match step {
            Step::Left(pct) if pct < 0.0 => ctrl.drive.set_left(0.0),
            Step::Right(pct) if pct < 0.0 => ctrl.drive.set_right(0.0),
            _ => {}
        }
    }

    ctrl.drive.stop();
    display.clear();
    Outcome::Completed
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::AtomicBool;

    use super::*;
    use crate::utils::{platform::Pose, routines::testing::RecordingDisplay, sim::SimWorld};

    #[test]
    fn test_self_test_runs_every_step() {
        let world = SimWorld::new(Pose::new(30.0, 30.0, 0.0), None);
        let mut ctrl = DriveController::new(world.pose(), world.drive(), world.clock(), None);
        let mut display = RecordingDisplay::default();

        let outcome = self_test(&mut ctrl, &mut world.servo(), &mut display);

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(display.lines.len(), 6);
        assert_eq!(display.lines[0], "Moving left motor forward");
        assert_eq!(world.servo_degree(), Some(0.0));
        assert!(world.command().is_stop());
        assert_eq!(world.now().as_secs(), 6);
    }

    #[test]
    fn test_self_test_honours_abort() {
        let world = SimWorld::new(Pose::new(30.0, 30.0, 0.0), None);
        let flag = AtomicBool::new(true);
        let mut ctrl = DriveController::new(world.pose(), world.drive(), world.clock(), None)
            .with_abort(&flag);
        let mut display = RecordingDisplay::default();

        assert_eq!(
            self_test(&mut ctrl, &mut world.servo(), &mut display),
            Outcome::Aborted
        );
        assert!(world.command().is_stop());
        assert_eq!(world.servo_degree(), None);
    }
}
