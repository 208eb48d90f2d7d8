//! Resolved program steps: what the interpreter executes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ProgramStep {
    MoveForward { distance: f64 },
    MoveBackward { distance: f64 },
    RotateLeft { degrees: f64 },
    RotateRight { degrees: f64 },
    ToggleHatch,
    Transform,
    Wait { seconds: f64 },
    Jump,
    ToggleLights,
    ToggleFly,
    /// Nested steps run alongside one forward move; done when both are.
    WhileMoving { steps: Vec<ProgramStep> },
    /// `count` rounds of: nested steps, then one forward move.
    RepeatWhileMoving { count: u32, steps: Vec<ProgramStep> },
}

impl ProgramStep {
    pub fn name(&self) -> &'static str {
        match self {
            ProgramStep::MoveForward { .. } => "move_forward",
            ProgramStep::MoveBackward { .. } => "move_backward",
            ProgramStep::RotateLeft { .. } => "rotate_left",
            ProgramStep::RotateRight { .. } => "rotate_right",
            ProgramStep::ToggleHatch => "toggle_hatch",
            ProgramStep::Transform => "transform",
            ProgramStep::Wait { .. } => "wait",
            ProgramStep::Jump => "jump",
            ProgramStep::ToggleLights => "toggle_lights",
            ProgramStep::ToggleFly => "toggle_fly",
            ProgramStep::WhileMoving { .. } => "while_moving",
            ProgramStep::RepeatWhileMoving { .. } => "repeat_while_moving",
        }
    }

    /// Number of leaf steps, counting nested groups and repetitions.
    pub fn leaf_count(&self) -> usize {
        match self {
            ProgramStep::WhileMoving { steps } => 1 + count_leaves(steps),
            ProgramStep::RepeatWhileMoving { count, steps } => {
                *count as usize * (1 + count_leaves(steps))
            }
            _ => 1,
        }
    }
}

pub fn count_leaves(steps: &[ProgramStep]) -> usize {
    steps.iter().map(ProgramStep::leaf_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_count_includes_group_moves() {
        let program = vec![
            ProgramStep::MoveForward { distance: 1.0 },
            ProgramStep::RepeatWhileMoving {
                count: 3,
                steps: vec![ProgramStep::ToggleHatch],
            },
            ProgramStep::WhileMoving {
                steps: vec![ProgramStep::Jump, ProgramStep::Wait { seconds: 1.0 }],
            },
        ];
        assert_eq!(count_leaves(&program), 1 + 6 + 3);
    }

    #[test]
    fn steps_serialize_with_a_step_tag() {
        let json = serde_json::to_string(&ProgramStep::RotateLeft { degrees: 90.0 }).unwrap();
        assert_eq!(json, r#"{"step":"rotate_left","degrees":90.0}"#);
    }
}
