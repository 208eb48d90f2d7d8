//! Application session: the single composition point.
//!
//! Owns the live robot, the interpreter bound to it, and the program task.
//! The host talks to the core only through this type. While a program runs,
//! manual input is ignored so the interpreter is the only input producer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::RobotTuning;
use crate::driver::InputDriver;
use crate::interpreter::{ActionInterpreter, RunError, RunOutcome};
use crate::program::step::ProgramStep;
use crate::robot::{Appearance, Robot, RobotHandle};
use crate::types::{Component, ComponentFlags, Control, Form, HatchState, InputState, RobotPose};

/// A program running in the background.
#[derive(Debug)]
pub struct ProgramHandle {
    task: JoinHandle<Result<RunOutcome, RunError>>,
}

impl ProgramHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the program to end. A panicking step is reported as a failure.
    pub async fn finished(self) -> Result<RunOutcome, RunError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(RunError::ExecutionFailed(format!("program task aborted: {e}"))),
        }
    }
}

pub struct ApplicationSession {
    robot: RobotHandle,
    interpreter: Arc<ActionInterpreter<InputDriver>>,
}

impl ApplicationSession {
    pub fn new(tuning: &RobotTuning) -> Self {
        let robot = RobotHandle::new(Robot::new(tuning.kinematics()));
        let interpreter = ActionInterpreter::new(InputDriver::new(robot.clone()), tuning.moves);
        ApplicationSession {
            robot,
            interpreter: Arc::new(interpreter),
        }
    }

    // -----------------------------------------------------------------------
    // Program control
    // -----------------------------------------------------------------------

    /// Start `steps` on the current tokio runtime.
    ///
    /// Rejected with `AlreadyRunning` while a program is active; the running
    /// program is left untouched.
    pub fn start_program(&self, steps: Vec<ProgramStep>) -> Result<ProgramHandle, RunError> {
        let session = self.interpreter.begin()?;
        // Manual holds from before the start must not leak into the program.
        self.robot.clear_input();
        let interpreter = Arc::clone(&self.interpreter);
        let task = tokio::spawn(async move { interpreter.execute(session, &steps).await });
        Ok(ProgramHandle { task })
    }

    pub fn stop_program(&self) {
        self.interpreter.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.interpreter.is_running()
    }

    pub fn steps_executed(&self) -> usize {
        self.interpreter.steps_executed()
    }

    pub fn reset_robot_pose(&self) {
        info!("robot pose reset");
        self.robot.with(|r| r.reset());
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    pub fn components(&self) -> ComponentFlags {
        self.robot.with(|r| r.components())
    }

    pub fn set_component(&self, component: Component, enabled: bool) {
        info!(%component, enabled, "component switched");
        self.robot.with(|r| r.set_component(component, enabled));
    }

    pub fn toggle_component(&self, component: Component) -> bool {
        let enabled = !self.components().is_enabled(component);
        self.set_component(component, enabled);
        enabled
    }

    // -----------------------------------------------------------------------
    // Manual input
    // -----------------------------------------------------------------------

    /// Hold or release a control from the keyboard. Returns `false` when the
    /// input was ignored because a program is running.
    pub fn set_manual(&self, control: Control, held: bool) -> bool {
        if self.is_running() {
            debug!(%control, "manual input ignored while a program runs");
            return false;
        }
        self.robot.set_input(control, held);
        true
    }

    pub fn press(&self, control: Control) -> bool {
        self.set_manual(control, true)
    }

    pub fn release(&self, control: Control) -> bool {
        self.set_manual(control, false)
    }

    pub fn toggle_hatch(&self) -> Option<HatchState> {
        if self.is_running() {
            return None;
        }
        Some(self.robot.with(|r| r.toggle_hatch()))
    }

    pub fn toggle_form(&self) -> Option<Form> {
        if self.is_running() {
            return None;
        }
        Some(self.robot.with(|r| r.toggle_form()))
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    /// Advance the robot by one engine frame of `dt` seconds.
    pub fn tick(&self, dt: f64) {
        self.robot.with(|r| r.tick(dt));
    }

    pub fn pose(&self) -> RobotPose {
        self.robot.pose()
    }

    pub fn input(&self) -> InputState {
        self.robot.input()
    }

    pub fn appearance(&self) -> Appearance {
        self.robot.with(|r| r.appearance())
    }

    /// Tick the robot at `frame_rate` until the program behind `handle` ends.
    /// Used when no view is attached.
    pub async fn drive(
        &self,
        handle: ProgramHandle,
        frame_rate: u32,
    ) -> Result<RunOutcome, RunError> {
        let period = frame_period(frame_rate);
        let dt = period.as_secs_f64();
        let mut frames = time::interval(period);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
        while !handle.is_finished() {
            frames.tick().await;
            self.tick(dt);
        }
        handle.finished().await
    }
}

/// Wall-clock length of one engine frame.
pub fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_secs(1) / frame_rate.max(1)
}
