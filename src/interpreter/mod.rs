//! Action interpreter: the runtime step executor.
//!
//! Walks a resolved `ProgramStep` list against an `Actuator`, one step at a
//! time, and stops cleanly when cancelled. The interpreter treats the step
//! list as an immutable script; it never consults the source program.
//!
//! At most one session runs at a time. A session is claimed synchronously
//! with `begin` so the caller can spawn the execution without racing a
//! second start.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::{CancelSource, CancelToken};
use crate::driver::{ActuationError, Actuator};
use crate::program::step::{count_leaves, ProgramStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("a program is already running")]
    AlreadyRunning,
    #[error("program failed: {0}")]
    ExecutionFailed(String),
}

/// Distances of the forward moves implied by the moving group steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupMoves {
    /// Move after each `RepeatWhileMoving` iteration.
    #[serde(default = "default_group_move")]
    pub repeat_move_distance: f64,
    /// Move that runs alongside a `WhileMoving` body.
    #[serde(default = "default_group_move")]
    pub while_moving_distance: f64,
}

fn default_group_move() -> f64 {
    1.0
}

impl Default for GroupMoves {
    fn default() -> Self {
        GroupMoves {
            repeat_move_distance: default_group_move(),
            while_moving_distance: default_group_move(),
        }
    }
}

/// Why a step sequence stopped early.
#[derive(Debug)]
enum Halt {
    Cancelled,
    Failed(String),
}

type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Halt>> + Send + 'a>>;

#[derive(Debug, Default)]
struct SessionState {
    running: AtomicBool,
    cancel: CancelSource,
    steps_executed: AtomicUsize,
}

/// Proof that the caller holds the single running session. Dropping it ends
/// the session.
#[derive(Debug)]
pub struct Session {
    state: Arc<SessionState>,
    token: CancelToken,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
    }
}

pub struct ActionInterpreter<A> {
    actuator: A,
    moves: GroupMoves,
    state: Arc<SessionState>,
}

impl<A: Actuator> ActionInterpreter<A> {
    pub fn new(actuator: A, moves: GroupMoves) -> Self {
        ActionInterpreter {
            actuator,
            moves,
            state: Arc::new(SessionState::default()),
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Leaf steps performed by the current (or last) session.
    pub fn steps_executed(&self) -> usize {
        self.state.steps_executed.load(Ordering::SeqCst)
    }

    /// Ask the running session to stop. Idempotent; a no-op when idle.
    pub fn cancel(&self) {
        if self.is_running() {
            info!("stop requested");
            self.state.cancel.cancel();
        }
    }

    /// Claim the session slot without side effects on failure.
    pub fn begin(&self) -> Result<Session, RunError> {
        if self
            .state
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RunError::AlreadyRunning);
        }
        self.state.cancel.reset();
        self.state.steps_executed.store(0, Ordering::SeqCst);
        Ok(Session {
            state: Arc::clone(&self.state),
            token: self.state.cancel.token(),
        })
    }

    pub async fn run(&self, steps: &[ProgramStep]) -> Result<RunOutcome, RunError> {
        let session = self.begin()?;
        self.execute(session, steps).await
    }

    /// Run `steps` inside a session obtained from `begin`.
    pub async fn execute(
        &self,
        session: Session,
        steps: &[ProgramStep],
    ) -> Result<RunOutcome, RunError> {
        info!(steps = count_leaves(steps), "program started");
        let result = self.run_block(steps, &session.token).await;
        self.actuator.release_all();

        let outcome = match result {
            Ok(()) if session.token.is_cancelled() => Ok(RunOutcome::Cancelled),
            Ok(()) => Ok(RunOutcome::Completed),
            Err(Halt::Cancelled) => Ok(RunOutcome::Cancelled),
            Err(Halt::Failed(reason)) => {
                warn!(%reason, "program failed");
                Err(RunError::ExecutionFailed(reason))
            }
        };
        if let Ok(outcome) = &outcome {
            info!(?outcome, executed = self.steps_executed(), "program finished");
        }
        drop(session);
        outcome
    }

    fn run_block<'a>(&'a self, steps: &'a [ProgramStep], cancel: &'a CancelToken) -> StepFuture<'a> {
        Box::pin(async move {
            for step in steps {
                self.run_step(step, cancel).await?;
            }
            Ok(())
        })
    }

    async fn run_step(&self, step: &ProgramStep, cancel: &CancelToken) -> Result<(), Halt> {
        if cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        let actuator = &self.actuator;
        let result = match step {
            ProgramStep::MoveForward { distance } => actuator.move_forward(*distance, cancel).await,
            ProgramStep::MoveBackward { distance } => actuator.move_backward(*distance, cancel).await,
            ProgramStep::RotateLeft { degrees } => actuator.rotate_left(*degrees, cancel).await,
            ProgramStep::RotateRight { degrees } => actuator.rotate_right(*degrees, cancel).await,
            ProgramStep::ToggleHatch => actuator.toggle_hatch(cancel).await,
            ProgramStep::Transform => actuator.transform_robot(cancel).await,
            ProgramStep::Wait { seconds } => actuator.wait(*seconds, cancel).await,
            ProgramStep::Jump => actuator.jump(cancel).await,
            ProgramStep::ToggleLights => actuator.toggle_lights(cancel).await,
            ProgramStep::ToggleFly => actuator.toggle_fly(cancel).await,
            ProgramStep::WhileMoving { steps } => return self.while_moving(steps, cancel).await,
            ProgramStep::RepeatWhileMoving { count, steps } => {
                return self.repeat_while_moving(*count, steps, cancel).await;
            }
        };
        self.conclude(step.name(), result)
    }

    /// Nested steps alongside one forward move; done when both are.
    async fn while_moving(&self, steps: &[ProgramStep], cancel: &CancelToken) -> Result<(), Halt> {
        let distance = self.moves.while_moving_distance;
        let mover = async {
            let result = self.actuator.move_forward(distance, cancel).await;
            self.conclude("move_forward", result)
        };
        tokio::try_join!(mover, self.run_block(steps, cancel)).map(|_| ())
    }

    async fn repeat_while_moving(
        &self,
        count: u32,
        steps: &[ProgramStep],
        cancel: &CancelToken,
    ) -> Result<(), Halt> {
        let distance = self.moves.repeat_move_distance;
        for iteration in 1..=count {
            if cancel.is_cancelled() {
                return Err(Halt::Cancelled);
            }
            self.run_block(steps, cancel).await?;
            let result = self.actuator.move_forward(distance, cancel).await;
            self.conclude("move_forward", result)?;
            debug!(iteration, count, "repeat iteration finished");
        }
        Ok(())
    }

    fn conclude(&self, name: &'static str, result: Result<(), ActuationError>) -> Result<(), Halt> {
        match result {
            Ok(()) => {
                self.state.steps_executed.fetch_add(1, Ordering::SeqCst);
                debug!(step = name, "step finished");
                Ok(())
            }
            Err(ActuationError::ComponentDisabled(component)) => {
                info!(step = name, %component, "component disabled, step skipped");
                Ok(())
            }
            Err(ActuationError::Cancelled) => Err(Halt::Cancelled),
            Err(ActuationError::Fault(reason)) => Err(Halt::Failed(reason)),
        }
    }
}
