//! Maneuver scripts.
//!
//! A course is a list of `Maneuver` steps run in order. Steps serialize as
//! JSON with tag `"m"`, e.g. `{"m":"straight","speed":-25.0,"secs":1.65}`.

use core::fmt::{self, Write};

use heapless::String;
use serde::{Deserialize, Serialize};

use super::{report, session::SessionState, start_light, LINE_LEN};
use crate::utils::{
    controllers::{DriveController, Outcome},
    platform::{secs, AbortSignal, Clock, DriveActuator, LightSensor, PoseSource, StatusDisplay},
};

/// One step of a course.
///
/// Speeds are duty cycles in percent. Optional fields fall back to the
/// controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "m", rename_all = "snake_case")]
pub enum Maneuver {
    /// Both wheels at `speed` for `secs`. Negative drives backward.
    Straight { speed: f32, secs: f32 },
    /// Turn in place for `secs`. Positive `speed` is clockwise.
    Turn { speed: f32, secs: f32 },
    /// Wait with the wheels stopped.
    Pause { secs: f32 },
    /// Closed-loop turn to an absolute heading.
    Heading {
        angle: f32,
        tolerance: Option<f32>,
        timeout_secs: Option<f32>,
    },
    /// Closed-loop drive to an RPS position.
    Goto {
        x: f32,
        y: f32,
        radius: Option<f32>,
        timeout_secs: Option<f32>,
    },
    /// Block until the CdS cell sees the start light.
    WaitLight {
        threshold: Option<f32>,
        timeout_secs: Option<f32>,
    },
}

/// The competition course: wait for the light, then the fixed timed run.
pub const DEFAULT_COURSE: [Maneuver; 14] = [
    Maneuver::WaitLight {
        threshold: None,
        timeout_secs: None,
    },
    Maneuver::Straight { speed: -25.0, secs: 1.65 },
    // about 90°
    Maneuver::Turn { speed: -24.0, secs: 1.25 },
    Maneuver::Straight { speed: -25.0, secs: 2.22 },
    Maneuver::Turn { speed: -24.0, secs: 1.25 },
    Maneuver::Straight { speed: -35.0, secs: 4.0 },
    Maneuver::Turn { speed: 25.0, secs: 0.8 },
    Maneuver::Straight { speed: -25.0, secs: 0.5 },
    Maneuver::Turn { speed: -25.0, secs: 1.0 },
    Maneuver::Straight { speed: -25.0, secs: 3.0 },
    Maneuver::Pause { secs: 5.0 },
    Maneuver::Straight { speed: 25.0, secs: 3.0 },
    Maneuver::Turn { speed: -25.0, secs: 1.25 },
    Maneuver::Straight { speed: -25.0, secs: 3.0 },
];

impl Maneuver {
    /// Execute this step on `ctrl`.
    pub fn run<P, D, C, A, L>(
        &self,
        ctrl: &mut DriveController<P, D, C, A>,
        light: &mut L,
    ) -> Outcome
    where
        P: PoseSource,
        D: DriveActuator,
        C: Clock,
        A: AbortSignal,
        L: LightSensor + ?Sized,
    {
        match *self {
            Maneuver::Straight { speed, secs: s } => ctrl.drive_straight(speed, secs(s)),
            Maneuver::Turn { speed, secs: s } => ctrl.turn_in_place(speed, secs(s)),
            Maneuver::Pause { secs: s } => ctrl.pause(secs(s)),
            Maneuver::Heading {
                angle,
                tolerance,
                timeout_secs,
            } => {
                let tolerance = tolerance.unwrap_or(ctrl.config().heading_tolerance);
                let timeout = timeout_secs.map_or(ctrl.config().heading_timeout(), secs);
                ctrl.drive_to_heading(angle, tolerance, timeout)
            }
            Maneuver::Goto {
                x,
                y,
                radius,
                timeout_secs,
            } => {
                let radius = radius.unwrap_or(ctrl.config().arrival_radius);
                let timeout = timeout_secs.map_or(ctrl.config().approach_timeout(), secs);
                ctrl.drive_to_position(x, y, radius, timeout)
            }
            Maneuver::WaitLight {
                threshold,
                timeout_secs,
            } => ctrl.wait_for_start_light(
                light,
                threshold.unwrap_or(start_light::DEFAULT_THRESHOLD),
                secs(timeout_secs.unwrap_or(start_light::DEFAULT_TIMEOUT_SECS)),
            ),
        }
    }
}

impl fmt::Display for Maneuver {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Maneuver::Straight { speed, secs } => write!(f, "straight {speed}% {secs}s"),
            Maneuver::Turn { speed, secs } => write!(f, "turn {speed}% {secs}s"),
            Maneuver::Pause { secs } => write!(f, "pause {secs}s"),
            Maneuver::Heading { angle, .. } => write!(f, "heading {angle}"),
            Maneuver::Goto { x, y, .. } => write!(f, "goto ({x}, {y})"),
            Maneuver::WaitLight { .. } => f.write_str("wait for light"),
        }
    }
}

/// Summary of a script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptReport {
    /// Steps started, including the one that failed.
    pub steps_run: usize,
    pub failures: usize,
    pub last: Option<Outcome>,
}

impl ScriptReport {
    pub fn succeeded(&self) -> bool {
        self.failures == 0
    }
}

/// Run `steps` in order, reporting to `display`.
///
/// Failures are always shown; successful steps only in verbose mode. The run
/// stops at the first failure unless `continue_on_failure` is set.
pub fn run_script<P, D, C, A, L, S>(
    ctrl: &mut DriveController<P, D, C, A>,
    light: &mut L,
    display: &mut S,
    steps: &[Maneuver],
    session: &SessionState,
    continue_on_failure: bool,
) -> ScriptReport
where
    P: PoseSource,
    D: DriveActuator,
    C: Clock,
    A: AbortSignal,
    L: LightSensor + ?Sized,
    S: StatusDisplay + ?Sized,
{
    let mut summary = ScriptReport {
        steps_run: 0,
        failures: 0,
        last: None,
    };

    for (index, step) in steps.iter().enumerate() {
        let outcome = step.run(ctrl, light);
        summary.steps_run += 1;
        summary.last = Some(outcome);
        tracing::info!(step = index + 1, %step, %outcome, "maneuver finished");

        if session.verbose || !outcome.is_success() {
            let mut label: String<LINE_LEN> = String::new();
            let _ = write!(label, "{}. {}", index + 1, step);
            report(display, &label, outcome);
        }
        if !outcome.is_success() {
            summary.failures += 1;
            if !continue_on_failure || outcome == Outcome::Aborted {
                display.write_line("Program stopped.");
                return summary;
            }
        }
    }

    display.write_line("Program finished.");
    display.write_line("Ready to shutoff.");
    summary
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::utils::{
        platform::Pose,
        routines::testing::RecordingDisplay,
        sim::{SimParams, SimWorld},
    };

    #[test]
    fn test_parse_script_json() {
        let steps: std::vec::Vec<Maneuver> = serde_json::from_str(
            r#"[
                {"m":"straight","speed":-25.0,"secs":1.65},
                {"m":"goto","x":30.0,"y":40.0},
                {"m":"wait_light"}
            ]"#,
        )
        .unwrap();
        assert_eq!(steps[0], Maneuver::Straight { speed: -25.0, secs: 1.65 });
        assert_eq!(
            steps[1],
            Maneuver::Goto {
                x: 30.0,
                y: 40.0,
                radius: None,
                timeout_secs: None
            }
        );
        assert!(matches!(steps[2], Maneuver::WaitLight { threshold: None, .. }));
    }

    #[test]
    fn test_default_course_completes() {
        let world = SimWorld::new(Pose::new(60.0, 60.0, 90.0), None);
        let mut ctrl = DriveController::new(world.pose(), world.drive(), world.clock(), None);
        let mut display = RecordingDisplay::default();

        let summary = run_script(
            &mut ctrl,
            &mut world.light(),
            &mut display,
            &DEFAULT_COURSE,
            &SessionState::default(),
            false,
        );

        assert!(summary.succeeded());
        assert_eq!(summary.steps_run, DEFAULT_COURSE.len());
        assert_eq!(display.lines, ["Program finished.", "Ready to shutoff."]);
        assert!(world.command().is_stop());
    }

    #[test]
    fn test_failure_stops_script() {
        let params = SimParams {
            light_on_after_secs: None,
            ..SimParams::default()
        };
        let world = SimWorld::new(Pose::new(60.0, 60.0, 90.0), Some(params));
        let mut ctrl = DriveController::new(world.pose(), world.drive(), world.clock(), None);
        let mut display = RecordingDisplay::default();
        let steps = [
            Maneuver::WaitLight {
                threshold: None,
                timeout_secs: Some(1.0),
            },
            Maneuver::Straight { speed: 25.0, secs: 1.0 },
        ];

        let summary = run_script(
            &mut ctrl,
            &mut world.light(),
            &mut display,
            &steps,
            &SessionState::default(),
            false,
        );

        assert_eq!(summary.steps_run, 1);
        assert_eq!(summary.last, Some(Outcome::TimedOut));
        assert_eq!(display.lines[0], "1. wait for light: timed out");
        assert_eq!(world.writes(), 0);
    }

    #[test]
    fn test_verbose_reports_each_step() {
        let world = SimWorld::new(Pose::new(60.0, 60.0, 90.0), None);
        let mut ctrl = DriveController::new(world.pose(), world.drive(), world.clock(), None);
        let mut display = RecordingDisplay::default();
        let session = SessionState::default().apply(crate::utils::routines::MenuAction::Verbose);
        let steps = [
            Maneuver::Pause { secs: 0.5 },
            Maneuver::Heading {
                angle: 180.0,
                tolerance: None,
                timeout_secs: None,
            },
        ];

        let summary = run_script(&mut ctrl, &mut world.light(), &mut display, &steps, &session, false);

        assert!(summary.succeeded());
        assert_eq!(display.lines[0], "1. pause 0.5s: completed");
        assert_eq!(display.lines[1], "2. heading 180: converged");
    }
}
