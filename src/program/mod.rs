//! Program compiler: blocks in, steps out.
//!
//! Turns a `SourceProgram` (what the user assembled) into an immutable list
//! of `ProgramStep`s. Field values are resolved and range-checked here, once;
//! generic repeat blocks are unrolled and constant conditionals are decided.
//! The interpreter never looks back at the source program.

pub mod source;
pub mod step;

use source::{Block, Condition, SourceProgram};
use step::{count_leaves, ProgramStep};

/// Editor range for distance and seconds fields.
pub const MIN_AMOUNT: f64 = 0.1;
pub const MAX_AMOUNT: f64 = 10.0;
/// Editor range for repeat counts.
pub const MAX_REPEAT: u32 = 100;
/// Upper bound on leaf steps after unrolling.
pub const MAX_STEPS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("{path}: field `{field}` is not a finite number")]
    NonFinite { path: String, field: &'static str },
    #[error("program expands to more than {limit} steps")]
    TooLarge { limit: usize },
    #[error("{path}: `{block}` blocks cannot be compiled")]
    Unsupported { path: String, block: &'static str },
}

pub struct Compiler;

impl Compiler {
    /// Compile a source program into its resolved step list.
    pub fn compile(source: &SourceProgram) -> Result<Vec<ProgramStep>, CompileError> {
        let steps = Self::compile_blocks(&source.blocks, "blocks")?;
        if count_leaves(&steps) > MAX_STEPS {
            return Err(CompileError::TooLarge { limit: MAX_STEPS });
        }
        Ok(steps)
    }

    fn compile_blocks(blocks: &[Block], path: &str) -> Result<Vec<ProgramStep>, CompileError> {
        let mut steps = Vec::with_capacity(blocks.len());
        for (i, block) in blocks.iter().enumerate() {
            let path = format!("{path}[{i}] ({})", block.type_name());
            Self::compile_block(block, &path, &mut steps)?;
            if count_leaves(&steps) > MAX_STEPS {
                return Err(CompileError::TooLarge { limit: MAX_STEPS });
            }
        }
        Ok(steps)
    }

    fn compile_block(
        block: &Block,
        path: &str,
        out: &mut Vec<ProgramStep>,
    ) -> Result<(), CompileError> {
        let step = match block {
            Block::RobotMoveForward { distance } => ProgramStep::MoveForward {
                distance: amount(*distance, path, "distance")?,
            },
            Block::RobotMoveBackward { distance } => ProgramStep::MoveBackward {
                distance: amount(*distance, path, "distance")?,
            },
            Block::RobotRotateLeft { angle } => ProgramStep::RotateLeft {
                degrees: finite(*angle, path, "angle")?,
            },
            Block::RobotRotateRight { angle } => ProgramStep::RotateRight {
                degrees: finite(*angle, path, "angle")?,
            },
            Block::RobotToggleHatch => ProgramStep::ToggleHatch,
            Block::RobotTransform => ProgramStep::Transform,
            Block::RobotWait { seconds } => ProgramStep::Wait {
                seconds: amount(*seconds, path, "seconds")?,
            },
            Block::RobotJump => ProgramStep::Jump,
            Block::RobotToggleLights => ProgramStep::ToggleLights,
            Block::RobotToggleFly => ProgramStep::ToggleFly,
            Block::RobotWhileMoving { body } => ProgramStep::WhileMoving {
                steps: Self::compile_blocks(body, &format!("{path}.body"))?,
            },
            Block::RobotRepeatWhileMoving { times, body } => ProgramStep::RepeatWhileMoving {
                count: repeat_count(*times, path)?,
                steps: Self::compile_blocks(body, &format!("{path}.body"))?,
            },
            Block::ControlsIf {
                condition,
                body,
                else_body,
            } => {
                let (branch, label) = if holds(condition.as_ref(), path)? {
                    (body, "body")
                } else {
                    (else_body, "else_body")
                };
                out.extend(Self::compile_blocks(branch, &format!("{path}.{label}"))?);
                return Ok(());
            }
            Block::ControlsWhileUntil { .. } => {
                return Err(CompileError::Unsupported {
                    path: path.to_string(),
                    block: block.type_name(),
                });
            }
            Block::ControlsRepeatExt { times, body } => {
                let count = repeat_count(*times, path)?;
                let body = Self::compile_blocks(body, &format!("{path}.body"))?;
                for _ in 0..count {
                    out.extend(body.iter().cloned());
                    if count_leaves(out) > MAX_STEPS {
                        return Err(CompileError::TooLarge { limit: MAX_STEPS });
                    }
                }
                return Ok(());
            }
        };
        out.push(step);
        Ok(())
    }
}

fn finite(value: f64, path: &str, field: &'static str) -> Result<f64, CompileError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CompileError::NonFinite {
            path: path.to_string(),
            field,
        })
    }
}

fn amount(value: f64, path: &str, field: &'static str) -> Result<f64, CompileError> {
    Ok(finite(value, path, field)?.clamp(MIN_AMOUNT, MAX_AMOUNT))
}

fn holds(condition: Option<&Condition>, path: &str) -> Result<bool, CompileError> {
    match condition {
        None => Ok(false),
        Some(Condition::LogicCompare { op, a, b }) => {
            let path = format!("{path}.condition");
            Ok(op.holds(finite(*a, &path, "a")?, finite(*b, &path, "b")?))
        }
    }
}

fn repeat_count(value: f64, path: &str) -> Result<u32, CompileError> {
    let times = finite(value, path, "times")?.floor();
    Ok(times.clamp(0.0, MAX_REPEAT as f64) as u32)
}
