//! Authored program types: the persisted block format.
//!
//! These types describe *what the user assembled*, block by block, with field
//! values exactly as the editor stored them. The compiler reads them and
//! resolves them into `ProgramStep`s.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProgram {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Top-level blocks in execution order.
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    RobotMoveForward {
        #[serde(deserialize_with = "deserialize_number_compat")]
        distance: f64,
    },
    RobotMoveBackward {
        #[serde(deserialize_with = "deserialize_number_compat")]
        distance: f64,
    },
    RobotRotateLeft {
        #[serde(deserialize_with = "deserialize_number_compat")]
        angle: f64,
    },
    RobotRotateRight {
        #[serde(deserialize_with = "deserialize_number_compat")]
        angle: f64,
    },
    RobotToggleHatch,
    RobotTransform,
    RobotWait {
        #[serde(deserialize_with = "deserialize_number_compat")]
        seconds: f64,
    },
    RobotJump,
    RobotToggleLights,
    RobotToggleFly,
    RobotWhileMoving {
        #[serde(default)]
        body: Vec<Block>,
    },
    RobotRepeatWhileMoving {
        #[serde(deserialize_with = "deserialize_number_compat")]
        times: f64,
        #[serde(default)]
        body: Vec<Block>,
    },
    /// Generic loop block; unrolled by the compiler.
    #[serde(alias = "controls_repeat")]
    ControlsRepeatExt {
        #[serde(deserialize_with = "deserialize_number_compat")]
        times: f64,
        #[serde(default)]
        body: Vec<Block>,
    },
    /// Conditional on a constant comparison, decided at compile time.
    /// A missing condition is false.
    ControlsIf {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<Condition>,
        #[serde(default)]
        body: Vec<Block>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        else_body: Vec<Block>,
    },
    /// Condition-driven loop. Loaded so the compiler can name it; not compilable.
    #[serde(rename = "controls_whileUntil")]
    ControlsWhileUntil {
        #[serde(default)]
        body: Vec<Block>,
    },
}

/// Value blocks that can fill a `controls_if` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    LogicCompare {
        op: CompareOp,
        #[serde(deserialize_with = "deserialize_number_compat")]
        a: f64,
        #[serde(deserialize_with = "deserialize_number_compat")]
        b: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn holds(self, a: f64, b: f64) -> bool {
        match self {
            CompareOp::Eq => a == b,
            CompareOp::Neq => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Lte => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Gte => a >= b,
        }
    }
}

impl Block {
    pub fn type_name(&self) -> &'static str {
        match self {
            Block::RobotMoveForward { .. } => "robot_move_forward",
            Block::RobotMoveBackward { .. } => "robot_move_backward",
            Block::RobotRotateLeft { .. } => "robot_rotate_left",
            Block::RobotRotateRight { .. } => "robot_rotate_right",
            Block::RobotToggleHatch => "robot_toggle_hatch",
            Block::RobotTransform => "robot_transform",
            Block::RobotWait { .. } => "robot_wait",
            Block::RobotJump => "robot_jump",
            Block::RobotToggleLights => "robot_toggle_lights",
            Block::RobotToggleFly => "robot_toggle_fly",
            Block::RobotWhileMoving { .. } => "robot_while_moving",
            Block::RobotRepeatWhileMoving { .. } => "robot_repeat_while_moving",
            Block::ControlsRepeatExt { .. } => "controls_repeat_ext",
            Block::ControlsIf { .. } => "controls_if",
            Block::ControlsWhileUntil { .. } => "controls_whileUntil",
        }
    }
}

impl SourceProgram {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Serde deserializer that accepts either a plain number (`5` or `1.5`) or a
/// numeric string (`"1.5"`), since block fields are persisted as text.
pub fn deserialize_number_compat<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{Error, Visitor};
    use std::fmt;

    struct NumberVisitor;

    impl Visitor<'_> for NumberVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or a numeric string")
        }

        fn visit_u64<E: Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_i64<E: Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_f64<E: Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<f64, E> {
            v.trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid number {v:?}")))
        }
    }

    d.deserialize_any(NumberVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_accept_numbers_and_numeric_strings() {
        let json = r#"{
            "blocks": [
                {"type": "robot_move_forward", "distance": 2},
                {"type": "robot_rotate_left", "angle": "90"},
                {"type": "robot_wait", "seconds": " 1.5 "},
                {"type": "robot_toggle_hatch"}
            ]
        }"#;
        let program: SourceProgram = serde_json::from_str(json).unwrap();
        assert_eq!(
            program.blocks,
            vec![
                Block::RobotMoveForward { distance: 2.0 },
                Block::RobotRotateLeft { angle: 90.0 },
                Block::RobotWait { seconds: 1.5 },
                Block::RobotToggleHatch,
            ]
        );
    }

    #[test]
    fn logic_blocks_load_by_their_editor_names() {
        let json = r#"{"blocks": [
            {"type": "controls_repeat_ext", "times": "2", "body": []},
            {"type": "controls_repeat", "times": 3},
            {"type": "controls_if",
             "condition": {"type": "logic_compare", "op": "LTE", "a": 1, "b": "2"},
             "body": [{"type": "robot_jump"}]},
            {"type": "controls_whileUntil", "mode": "WHILE", "body": []}
        ]}"#;
        let program: SourceProgram = serde_json::from_str(json).unwrap();
        assert_eq!(
            program.blocks,
            vec![
                Block::ControlsRepeatExt { times: 2.0, body: Vec::new() },
                Block::ControlsRepeatExt { times: 3.0, body: Vec::new() },
                Block::ControlsIf {
                    condition: Some(Condition::LogicCompare {
                        op: CompareOp::Lte,
                        a: 1.0,
                        b: 2.0,
                    }),
                    body: vec![Block::RobotJump],
                    else_body: Vec::new(),
                },
                Block::ControlsWhileUntil { body: Vec::new() },
            ]
        );
        assert_eq!(program.blocks[3].type_name(), "controls_whileUntil");
    }

    #[test]
    fn compare_ops_follow_their_names() {
        assert!(CompareOp::Eq.holds(2.0, 2.0));
        assert!(CompareOp::Neq.holds(1.0, 2.0));
        assert!(CompareOp::Lt.holds(1.0, 2.0));
        assert!(!CompareOp::Lt.holds(2.0, 2.0));
        assert!(CompareOp::Lte.holds(2.0, 2.0));
        assert!(CompareOp::Gt.holds(3.0, 2.0));
        assert!(CompareOp::Gte.holds(2.0, 2.0));
        assert!(!CompareOp::Gte.holds(1.0, 2.0));
    }

    #[test]
    fn garbage_field_is_rejected() {
        let json = r#"{"blocks": [{"type": "robot_wait", "seconds": "soon"}]}"#;
        assert!(serde_json::from_str::<SourceProgram>(json).is_err());
    }

    #[test]
    fn save_then_load_round_trips() {
        let program = SourceProgram {
            name: Some("square".into()),
            blocks: vec![Block::ControlsRepeatExt {
                times: 4.0,
                body: vec![
                    Block::RobotMoveForward { distance: 1.0 },
                    Block::RobotRotateRight { angle: 90.0 },
                ],
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.json");
        program.save(&path).unwrap();
        assert_eq!(SourceProgram::load(&path).unwrap(), program);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = SourceProgram::load("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }
}
