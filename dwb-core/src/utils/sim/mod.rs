//! Differential-drive simulation under virtual time.
//!
//! `SimWorld` holds the true robot state. Time only moves when a `SimClock`
//! sleeps, so controller runs are deterministic and instant on the host. RPS
//! readings are sampled into a `SharedPose` every `rps_period_ms`, which makes
//! the controllers see the same stale values a real beacon receiver produces.
//!
//! ```rust
//! use dwb_core::utils::{sim::SimWorld, DriveController, Pose, Duration, Outcome};
//! let world = SimWorld::new(Pose::new(20.0, 20.0, 350.0), None);
//! let mut ctrl = DriveController::new(world.pose(), world.drive(), world.clock(), None);
//! assert_eq!(ctrl.drive_to_heading(10.0, 3.0, Duration::from_secs(5)), Outcome::Converged);
//! ```

use core::cell::RefCell;

use embassy_time::{Duration, Instant};
use libm::{cosf, sinf};
use serde::{Deserialize, Serialize};

use crate::utils::platform::{
    clamp_percent, Clock, ClawServo, DriveActuator, DriveCommand, LightSensor, Pose, PoseSource,
    SharedPose,
};

/// CdS cell reading with the start light off.
pub const DARK_VOLTAGE: f32 = 2.9;
/// CdS cell reading under the red start light.
pub const RED_VOLTAGE: f32 = 0.5;

/// Physical parameters of the simulated robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Wheel surface speed at 100 % duty, in RPS units per second.
    pub max_wheel_speed: f32,
    /// Distance between the wheels.
    pub track_width: f32,
    /// Multiplier on the right wheel's speed, for drift.
    pub right_wheel_gain: f32,
    pub rps_period_ms: u64,
    pub step_ms: u64,
    /// Seconds after start until the start light turns on, if ever.
    pub light_on_after_secs: Option<f32>,
    /// RPS reports no signal between these two times (seconds).
    pub dropout_secs: Option<(f32, f32)>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            max_wheel_speed: 20.0,
            track_width: 8.0,
            right_wheel_gain: 1.0,
            rps_period_ms: 10,
            step_ms: 1,
            light_on_after_secs: Some(0.5),
            dropout_secs: None,
        }
    }
}

#[derive(Debug)]
struct SimState {
    x: f32,
    y: f32,
    /// radians, counter-clockwise from +X
    theta: f32,
    command: DriveCommand,
    now_us: u64,
    last_rps_us: u64,
    signal: bool,
    writes: u32,
    nonzero_writes: u32,
    servo_degree: Option<f32>,
}

/// The simulated robot and its surroundings.
pub struct SimWorld {
    params: SimParams,
    state: RefCell<SimState>,
    rps: SharedPose,
}

impl SimWorld {
    /// Place the robot at `start`. `None` uses `SimParams::default()`.
    pub fn new(
        start: Pose,
        params: Option<SimParams>,
    ) -> Self {
        let world = Self {
            params: params.unwrap_or_default(),
            state: RefCell::new(SimState {
                x: start.x,
                y: start.y,
                theta: start.heading.to_radians(),
                command: DriveCommand::STOP,
                now_us: 0,
                last_rps_us: 0,
                signal: true,
                writes: 0,
                nonzero_writes: 0,
                servo_degree: None,
            }),
            rps: SharedPose::new(),
        };
        world.sample_rps();
        world
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn pose(&self) -> SimPose<'_> {
        SimPose { world: self }
    }

    pub fn drive(&self) -> SimDrive<'_> {
        SimDrive { world: self }
    }

    pub fn clock(&self) -> SimClock<'_> {
        SimClock { world: self }
    }

    pub fn light(&self) -> SimLight<'_> {
        SimLight { world: self }
    }

    pub fn servo(&self) -> SimServo<'_> {
        SimServo { world: self }
    }

    /// Ground-truth pose, independent of the RPS signal.
    pub fn true_pose(&self) -> Pose {
        let s = self.state.borrow();
        Pose::new(s.x, s.y, s.theta.to_degrees())
    }

    /// Turn the RPS signal on or off. Takes effect immediately.
    pub fn set_signal(
        &self,
        on: bool,
    ) {
        self.state.borrow_mut().signal = on;
        self.sample_rps();
    }

    /// Last command written to the wheels.
    pub fn command(&self) -> DriveCommand {
        self.state.borrow().command
    }

    /// Total wheel writes (one per side per command).
    pub fn writes(&self) -> u32 {
        self.state.borrow().writes
    }

    /// Wheel writes with a nonzero duty cycle.
    pub fn nonzero_writes(&self) -> u32 {
        self.state.borrow().nonzero_writes
    }

    pub fn servo_degree(&self) -> Option<f32> {
        self.state.borrow().servo_degree
    }

    pub fn now(&self) -> Instant {
        Instant::from_micros(self.state.borrow().now_us)
    }

    /// Integrate the robot forward by `duration`.
    pub fn advance(
        &self,
        duration: Duration,
    ) {
        let step_us = self.params.step_ms.max(1) * 1_000;
        let rps_us = self.params.rps_period_ms * 1_000;
        let mut left_us = duration.as_micros();

        while left_us > 0 {
            let dt_us = left_us.min(step_us);
            left_us -= dt_us;

            let publish = {
                let mut s = self.state.borrow_mut();
                let dt = dt_us as f32 / 1.0e6;
                let v_left = s.command.left / 100.0 * self.params.max_wheel_speed;
                let v_right =
                    s.command.right / 100.0 * self.params.max_wheel_speed * self.params.right_wheel_gain;
                let v = (v_left + v_right) / 2.0;
                let omega = (v_right - v_left) / self.params.track_width;

                s.x += v * cosf(s.theta) * dt;
                s.y += v * sinf(s.theta) * dt;
                s.theta += omega * dt;
                s.now_us += dt_us;

                s.now_us - s.last_rps_us >= rps_us
            };
            if publish {
                self.sample_rps();
            }
        }
    }

    fn sample_rps(&self) {
        let (pose, signal) = {
            let mut s = self.state.borrow_mut();
            s.last_rps_us = s.now_us;
            let t = s.now_us as f32 / 1.0e6;
            let dropped = matches!(self.params.dropout_secs, Some((from, to)) if t >= from && t < to);
            (Pose::from_rps(s.x, s.y, s.theta.to_degrees()), s.signal && !dropped)
        };
        self.rps.publish(if signal { pose } else { None });
    }

    fn write_wheel(
        &self,
        left: Option<f32>,
        right: Option<f32>,
    ) {
        let mut s = self.state.borrow_mut();
        for (side, value) in [(0, left), (1, right)] {
            let Some(pct) = value else { continue };
            let pct = clamp_percent(pct);
            if side == 0 {
                s.command.left = pct;
            } else {
                s.command.right = pct;
            }
            s.writes += 1;
            if pct != 0.0 {
                s.nonzero_writes += 1;
            }
        }
    }
}

/// RPS view of a `SimWorld`.
pub struct SimPose<'a> {
    world: &'a SimWorld,
}

impl PoseSource for SimPose<'_> {
    fn current_pose(&mut self) -> Option<Pose> {
        (&self.world.rps).current_pose()
    }
}

/// Wheel outputs of a `SimWorld`.
pub struct SimDrive<'a> {
    world: &'a SimWorld,
}

impl DriveActuator for SimDrive<'_> {
    fn set_left(
        &mut self,
        percent: f32,
    ) {
        self.world.write_wheel(Some(percent), None);
    }

    fn set_right(
        &mut self,
        percent: f32,
    ) {
        self.world.write_wheel(None, Some(percent));
    }
}

/// Virtual clock of a `SimWorld`; sleeping advances the physics.
pub struct SimClock<'a> {
    world: &'a SimWorld,
}

impl Clock for SimClock<'_> {
    fn now(&self) -> Instant {
        self.world.now()
    }

    fn sleep(
        &mut self,
        duration: Duration,
    ) {
        self.world.advance(duration);
    }
}

/// CdS cell facing the start light.
pub struct SimLight<'a> {
    world: &'a SimWorld,
}

impl LightSensor for SimLight<'_> {
    fn voltage(&mut self) -> f32 {
        let on = match self.world.params.light_on_after_secs {
            Some(after) => self.world.now().as_micros() as f32 / 1.0e6 >= after,
            None => false,
        };
        if on {
            RED_VOLTAGE
        } else {
            DARK_VOLTAGE
        }
    }
}

/// Claw servo that remembers its last angle.
pub struct SimServo<'a> {
    world: &'a SimWorld,
}

impl ClawServo for SimServo<'_> {
    fn set_degree(
        &mut self,
        degrees: f32,
    ) {
        self.world.state.borrow_mut().servo_degree = Some(degrees);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line_motion() {
        let world = SimWorld::new(Pose::new(10.0, 10.0, 0.0), None);
        world.drive().apply(DriveCommand::straight(50.0));
        world.advance(Duration::from_secs(1));
        let pose = world.true_pose();
        assert!(libm::fabsf(pose.x - 20.0) < 1e-2);
        assert!(libm::fabsf(pose.y - 10.0) < 1e-2);
    }

    #[test]
    fn test_spin_counter_clockwise() {
        let world = SimWorld::new(Pose::new(10.0, 10.0, 0.0), None);
        // right wheel forward
        world.drive().apply(DriveCommand::spin(-25.0));
        world.advance(Duration::from_millis(500));
        let heading = world.true_pose().heading;
        assert!(heading > 30.0 && heading < 40.0, "heading {heading}");
    }

    #[test]
    fn test_signal_loss_hides_pose() {
        let world = SimWorld::new(Pose::new(10.0, 10.0, 0.0), None);
        let mut rps = world.pose();
        assert!(rps.current_pose().is_some());
        world.set_signal(false);
        assert!(rps.current_pose().is_none());
        world.set_signal(true);
        assert!(rps.current_pose().is_some());
    }

    #[test]
    fn test_rps_is_sampled() {
        let world = SimWorld::new(Pose::new(10.0, 10.0, 0.0), None);
        world.drive().apply(DriveCommand::straight(100.0));
        world.advance(Duration::from_millis(5));
        // no new sample before the 10ms period
        assert_eq!(world.pose().current_pose().unwrap().x, 10.0);
        world.advance(Duration::from_millis(5));
        assert!(world.pose().current_pose().unwrap().x > 10.0);
    }

    #[test]
    fn test_light_turns_on() {
        let world = SimWorld::new(Pose::new(10.0, 10.0, 0.0), None);
        assert_eq!(world.light().voltage(), DARK_VOLTAGE);
        world.advance(Duration::from_millis(600));
        assert_eq!(world.light().voltage(), RED_VOLTAGE);
    }
}
