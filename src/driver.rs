//! Input driver: the robot actuation interface.
//!
//! Turns a discrete command ("move forward 2 units") into timed pulses of the
//! same `InputState` the keyboard writes, so the per-frame update moves the
//! robot exactly as if a key were held. Every wait is a cancellation point;
//! any flag the driver sets is released before the call returns.

use std::f64::consts::PI;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::robot::{Robot, RobotHandle};
use crate::types::{Component, Control};

/// One forward/backward pulse cycle.
pub const MOVE_CYCLE: Duration = Duration::from_millis(100);
/// One rotation pulse cycle.
pub const ROTATE_CYCLE: Duration = Duration::from_millis(50);
/// Pause after the last pulse of a move or rotation.
pub const SETTLE: Duration = Duration::from_millis(200);
pub const HATCH_SETTLE: Duration = Duration::from_millis(1000);
pub const TRANSFORM_SETTLE: Duration = Duration::from_millis(2000);
pub const JUMP_SETTLE: Duration = Duration::from_millis(2000);
pub const LIGHTS_SETTLE: Duration = Duration::from_millis(500);
pub const FLY_SETTLE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActuationError {
    #[error("cancelled")]
    Cancelled,
    #[error("{0} component is disabled")]
    ComponentDisabled(Component),
    #[error("actuation fault: {0}")]
    Fault(String),
}

/// Discrete robot commands. Each call returns once its modeled duration has
/// elapsed, or early with `ActuationError::Cancelled`.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn move_forward(&self, distance: f64, cancel: &CancelToken) -> Result<(), ActuationError>;
    async fn move_backward(&self, distance: f64, cancel: &CancelToken) -> Result<(), ActuationError>;
    async fn rotate_left(&self, degrees: f64, cancel: &CancelToken) -> Result<(), ActuationError>;
    async fn rotate_right(&self, degrees: f64, cancel: &CancelToken) -> Result<(), ActuationError>;
    async fn toggle_hatch(&self, cancel: &CancelToken) -> Result<(), ActuationError>;
    async fn transform_robot(&self, cancel: &CancelToken) -> Result<(), ActuationError>;
    async fn wait(&self, seconds: f64, cancel: &CancelToken) -> Result<(), ActuationError>;
    async fn jump(&self, cancel: &CancelToken) -> Result<(), ActuationError>;
    async fn toggle_lights(&self, cancel: &CancelToken) -> Result<(), ActuationError>;
    async fn toggle_fly(&self, cancel: &CancelToken) -> Result<(), ActuationError>;

    /// Drop every input flag this actuator may have set.
    fn release_all(&self);
}

/// Pulse cycles for a move: `floor(distance × 10)`, never negative.
pub fn move_cycles(distance: f64) -> u32 {
    let cycles = (distance * 10.0).floor();
    if cycles.is_finite() && cycles > 0.0 {
        cycles as u32
    } else {
        0
    }
}

/// Pulse cycles for a rotation: `floor(|radians| / rotate_speed)`.
pub fn rotate_cycles(degrees: f64, rotate_speed: f64) -> u32 {
    if rotate_speed.is_nan() || rotate_speed <= 0.0 {
        return 0;
    }
    let radians = degrees * PI / 180.0;
    let cycles = (radians.abs() / rotate_speed).floor();
    if cycles.is_finite() {
        cycles as u32
    } else {
        0
    }
}

/// A pressed control that is released when dropped, including when the
/// owning future is cancelled mid-pulse.
struct HeldControl<'a> {
    robot: &'a RobotHandle,
    control: Control,
}

impl<'a> HeldControl<'a> {
    fn press(robot: &'a RobotHandle, control: Control) -> Self {
        robot.set_input(control, true);
        HeldControl { robot, control }
    }
}

impl Drop for HeldControl<'_> {
    fn drop(&mut self) {
        self.robot.set_input(self.control, false);
    }
}

/// Actuator backed by the live robot's input state.
#[derive(Debug, Clone)]
pub struct InputDriver {
    robot: RobotHandle,
}

impl InputDriver {
    pub fn new(robot: RobotHandle) -> Self {
        InputDriver { robot }
    }

    async fn pulse(
        &self,
        control: Control,
        cycles: u32,
        cycle: Duration,
        cancel: &CancelToken,
    ) -> Result<(), ActuationError> {
        debug!(%control, cycles, "pulsing input");
        for _ in 0..cycles {
            if cancel.is_cancelled() {
                return Err(ActuationError::Cancelled);
            }
            let _held = HeldControl::press(&self.robot, control);
            pause(cancel, cycle).await?;
        }
        pause(cancel, SETTLE).await
    }

    async fn gated(
        &self,
        component: Component,
        settle: Duration,
        cancel: &CancelToken,
        effect: impl FnOnce(&mut Robot) + Send,
    ) -> Result<(), ActuationError> {
        if cancel.is_cancelled() {
            return Err(ActuationError::Cancelled);
        }
        let enabled = self.robot.with(|r| {
            let enabled = r.components().is_enabled(component);
            if enabled {
                effect(r);
            }
            enabled
        });
        if !enabled {
            return Err(ActuationError::ComponentDisabled(component));
        }
        info!(%component, "component action");
        pause(cancel, settle).await
    }
}

async fn pause(cancel: &CancelToken, duration: Duration) -> Result<(), ActuationError> {
    if cancel.sleep(duration).await {
        Ok(())
    } else {
        Err(ActuationError::Cancelled)
    }
}

#[async_trait]
impl Actuator for InputDriver {
    async fn move_forward(&self, distance: f64, cancel: &CancelToken) -> Result<(), ActuationError> {
        self.pulse(Control::Forward, move_cycles(distance), MOVE_CYCLE, cancel)
            .await
    }

    async fn move_backward(&self, distance: f64, cancel: &CancelToken) -> Result<(), ActuationError> {
        self.pulse(Control::Backward, move_cycles(distance), MOVE_CYCLE, cancel)
            .await
    }

    async fn rotate_left(&self, degrees: f64, cancel: &CancelToken) -> Result<(), ActuationError> {
        let speed = self.robot.with(|r| r.kinematics().rotate_speed);
        self.pulse(Control::RotateLeft, rotate_cycles(degrees, speed), ROTATE_CYCLE, cancel)
            .await
    }

    async fn rotate_right(&self, degrees: f64, cancel: &CancelToken) -> Result<(), ActuationError> {
        let speed = self.robot.with(|r| r.kinematics().rotate_speed);
        self.pulse(Control::RotateRight, rotate_cycles(degrees, speed), ROTATE_CYCLE, cancel)
            .await
    }

    async fn toggle_hatch(&self, cancel: &CancelToken) -> Result<(), ActuationError> {
        if cancel.is_cancelled() {
            return Err(ActuationError::Cancelled);
        }
        let hatch = self.robot.with(|r| r.toggle_hatch());
        info!(?hatch, "hatch toggled");
        pause(cancel, HATCH_SETTLE).await
    }

    async fn transform_robot(&self, cancel: &CancelToken) -> Result<(), ActuationError> {
        if cancel.is_cancelled() {
            return Err(ActuationError::Cancelled);
        }
        let form = self.robot.with(|r| r.toggle_form());
        info!(?form, "transform started");
        pause(cancel, TRANSFORM_SETTLE).await
    }

    async fn wait(&self, seconds: f64, cancel: &CancelToken) -> Result<(), ActuationError> {
        let duration = if seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        pause(cancel, duration).await
    }

    async fn jump(&self, cancel: &CancelToken) -> Result<(), ActuationError> {
        self.gated(Component::Jump, JUMP_SETTLE, cancel, |r| r.jump())
            .await
    }

    async fn toggle_lights(&self, cancel: &CancelToken) -> Result<(), ActuationError> {
        self.gated(Component::Lights, LIGHTS_SETTLE, cancel, |r| {
            r.toggle_lights();
        })
        .await
    }

    async fn toggle_fly(&self, cancel: &CancelToken) -> Result<(), ActuationError> {
        self.gated(Component::Fly, FLY_SETTLE, cancel, |r| {
            r.toggle_fly();
        })
        .await
    }

    fn release_all(&self) {
        self.robot.clear_input();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelSource;
    use crate::robot::{Kinematics, HOVER_HEIGHT};
    use crate::types::{Form, HatchState, GROUND_HEIGHT};
    use tokio::time::Instant;

    fn driver() -> (InputDriver, RobotHandle) {
        let robot = RobotHandle::new(Robot::new(Kinematics::default()));
        (InputDriver::new(robot.clone()), robot)
    }

    fn assert_took(start: Instant, expected_ms: u64) {
        let elapsed = start.elapsed();
        let expected = Duration::from_millis(expected_ms);
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(10),
            "expected ~{expected:?}, took {elapsed:?}"
        );
    }

    #[test]
    fn move_cycles_floor_ten_per_unit() {
        assert_eq!(move_cycles(1.5), 15);
        assert_eq!(move_cycles(1.0), 10);
        assert_eq!(move_cycles(0.05), 0);
        assert_eq!(move_cycles(-2.0), 0);
        assert_eq!(move_cycles(f64::NAN), 0);
    }

    #[test]
    fn rotate_cycles_follow_rotate_speed() {
        assert_eq!(rotate_cycles(90.0, 0.05), 31);
        assert_eq!(rotate_cycles(-90.0, 0.05), 31);
        assert_eq!(rotate_cycles(180.0, 0.05), 62);
        assert_eq!(rotate_cycles(90.0, 0.0), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn move_forward_pulses_then_settles() {
        let (driver, robot) = driver();
        let start = Instant::now();
        driver.move_forward(1.5, &CancelToken::never()).await.unwrap();
        assert_took(start, 15 * 100 + 200);
        assert!(!robot.input().any_held());
    }

    #[tokio::test(start_paused = true)]
    async fn rotate_left_uses_fifty_ms_cycles() {
        let (driver, _robot) = driver();
        let start = Instant::now();
        driver.rotate_left(90.0, &CancelToken::never()).await.unwrap();
        assert_took(start, 31 * 50 + 200);
    }

    #[tokio::test(start_paused = true)]
    async fn forward_is_held_during_a_pulse() {
        let (driver, robot) = driver();
        let probe = robot.clone();
        let check = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            probe.input().is_held(Control::Forward)
        });
        driver.move_forward(0.3, &CancelToken::never()).await.unwrap();
        assert!(check.await.unwrap());
        assert!(!robot.input().is_held(Control::Forward));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_move_releases_forward() {
        let (driver, robot) = driver();
        let source = CancelSource::new();
        let token = source.token();
        let task = tokio::spawn(async move { driver.move_forward(5.0, &token).await });

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(robot.input().is_held(Control::Forward));
        source.cancel();

        assert_eq!(task.await.unwrap(), Err(ActuationError::Cancelled));
        assert!(!robot.input().is_held(Control::Forward));
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_hatch_twice_closes_it_again() {
        let (driver, robot) = driver();
        let never = CancelToken::never();
        let start = Instant::now();
        driver.toggle_hatch(&never).await.unwrap();
        assert_eq!(robot.pose().hatch, HatchState::Open);
        driver.toggle_hatch(&never).await.unwrap();
        assert_eq!(robot.pose().hatch, HatchState::Closed);
        assert_took(start, 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn gated_component_is_rejected_until_enabled() {
        let (driver, robot) = driver();
        let never = CancelToken::never();
        assert_eq!(
            driver.toggle_lights(&never).await,
            Err(ActuationError::ComponentDisabled(Component::Lights))
        );
        assert!(!robot.pose().lights_on);

        robot.with(|r| r.set_component(Component::Lights, true));
        let start = Instant::now();
        driver.toggle_lights(&never).await.unwrap();
        assert!(robot.pose().lights_on);
        assert_took(start, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn move_backward_and_rotate_right_hold_their_controls() {
        let (driver, robot) = driver();
        let probe = robot.clone();
        let check = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            probe.input().is_held(Control::Backward)
        });
        let start = Instant::now();
        driver.move_backward(0.5, &CancelToken::never()).await.unwrap();
        assert_took(start, 5 * 100 + 200);
        assert!(check.await.unwrap());

        let probe = robot.clone();
        let check = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(25)).await;
            probe.input().is_held(Control::RotateRight)
        });
        let start = Instant::now();
        driver.rotate_right(45.0, &CancelToken::never()).await.unwrap();
        assert_took(start, 15 * 50 + 200);
        assert!(check.await.unwrap());
        assert!(!robot.input().any_held());
    }

    #[tokio::test(start_paused = true)]
    async fn transform_settles_for_two_seconds() {
        let (driver, robot) = driver();
        let start = Instant::now();
        driver.transform_robot(&CancelToken::never()).await.unwrap();
        assert_took(start, 2000);
        assert_eq!(robot.pose().form, Form::Cube);
    }

    #[tokio::test(start_paused = true)]
    async fn jump_and_fly_settle_and_apply_their_effects() {
        let (driver, robot) = driver();
        robot.with(|r| {
            r.set_component(Component::Jump, true);
            r.set_component(Component::Fly, true);
        });
        let never = CancelToken::never();

        let start = Instant::now();
        driver.jump(&never).await.unwrap();
        assert_took(start, 2000);
        robot.with(|r| r.tick(1.0));
        assert!(robot.pose().position.y > GROUND_HEIGHT);

        let start = Instant::now();
        driver.toggle_fly(&never).await.unwrap();
        assert_took(start, 1000);
        assert!(robot.pose().flying);
        // Let the jump finish and the hover reach its height.
        robot.with(|r| r.tick(2.5));
        assert!((robot.pose().position.y - (GROUND_HEIGHT + HOVER_HEIGHT)).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_hatch_settle_keeps_the_new_state() {
        let (driver, robot) = driver();
        let source = CancelSource::new();
        let token = source.token();
        let start = Instant::now();
        let task = tokio::spawn(async move { driver.toggle_hatch(&token).await });

        tokio::time::sleep(Duration::from_millis(300)).await;
        source.cancel();

        assert_eq!(task.await.unwrap(), Err(ActuationError::Cancelled));
        assert_took(start, 300);
        assert_eq!(robot.pose().hatch, HatchState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_a_plain_delay() {
        let (driver, robot) = driver();
        let start = Instant::now();
        driver.wait(1.5, &CancelToken::never()).await.unwrap();
        assert_took(start, 1500);
        assert!(!robot.input().any_held());
    }
}
