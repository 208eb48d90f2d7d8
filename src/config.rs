use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::interpreter::GroupMoves;
use crate::robot::Kinematics;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToyConfig {
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default)]
    pub robot: RobotTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub rotate_left: String,
    pub rotate_right: String,
    pub toggle_hatch: String,
    pub transform: String,
    pub run_program: String,
    pub stop_program: String,
    pub reset_pose: String,
    pub toggle_jump: String,
    pub toggle_lights: String,
    pub toggle_fly: String,
    pub fullscreen: String,
    pub quit: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            forward: "w".into(),
            backward: "s".into(),
            left: "a".into(),
            right: "d".into(),
            rotate_left: "q".into(),
            rotate_right: "e".into(),
            toggle_hatch: "Space".into(),
            transform: "c".into(),
            run_program: "r".into(),
            stop_program: "x".into(),
            reset_pose: "0".into(),
            toggle_jump: "1".into(),
            toggle_lights: "2".into(),
            toggle_fly: "3".into(),
            fullscreen: "F11".into(),
            quit: "Esc".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotTuning {
    pub move_speed: f64,
    pub rotate_speed: f64,
    /// Engine ticks per second of the frame loop.
    pub frame_rate: u32,
    #[serde(flatten)]
    pub moves: GroupMoves,
}

impl Default for RobotTuning {
    fn default() -> Self {
        let kinematics = Kinematics::default();
        RobotTuning {
            move_speed: kinematics.move_speed,
            rotate_speed: kinematics.rotate_speed,
            frame_rate: 60,
            moves: GroupMoves::default(),
        }
    }
}

impl RobotTuning {
    pub fn kinematics(&self) -> Kinematics {
        Kinematics {
            move_speed: self.move_speed,
            rotate_speed: self.rotate_speed,
        }
    }
}

impl ToyConfig {
    /// Load the user config, falling back to defaults when missing or invalid.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), "invalid config ({e}), using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("robot-blocks");
        path.push("config.json");
        path
    }
}

/// Parse a binding string such as `"w"`, `"Space"`, `"Ctrl-r"` or `"F5"`.
pub fn parse_binding(binding: &str) -> Option<(KeyModifiers, KeyCode)> {
    let (modifiers, key) = if let Some(rest) = binding.strip_prefix("Ctrl-") {
        (KeyModifiers::CONTROL, rest)
    } else if let Some(rest) = binding.strip_prefix("Alt-") {
        (KeyModifiers::ALT, rest)
    } else {
        (KeyModifiers::NONE, binding)
    };

    let code = match key {
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Enter" => KeyCode::Enter,
        "Esc" => KeyCode::Esc,
        "Space" => KeyCode::Char(' '),
        "Tab" => KeyCode::Tab,
        "Backspace" => KeyCode::Backspace,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        s => {
            if let Some(n) = s.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                KeyCode::F(n)
            } else {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c.to_ascii_lowercase()),
                    _ => return None,
                }
            }
        }
    };
    Some((modifiers, code))
}

/// Check whether a crossterm `KeyEvent` matches a binding string from config.
///
/// Plain bindings reject Ctrl/Alt so `"r"` never fires on Ctrl-r. Letter
/// keys match regardless of Shift.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    let Some((modifiers, code)) = parse_binding(binding) else {
        return false;
    };
    let held = event.modifiers & (KeyModifiers::CONTROL | KeyModifiers::ALT);
    if held != modifiers {
        return false;
    }
    match (code, event.code) {
        (KeyCode::Char(want), KeyCode::Char(got)) => want == got.to_ascii_lowercase(),
        (want, got) => want == got,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_letter_ignores_shift_but_not_ctrl() {
        assert!(matches_binding("w", &key(KeyCode::Char('w'), KeyModifiers::NONE)));
        assert!(matches_binding("w", &key(KeyCode::Char('W'), KeyModifiers::SHIFT)));
        assert!(!matches_binding("w", &key(KeyCode::Char('w'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn named_and_modified_bindings() {
        assert!(matches_binding("Space", &key(KeyCode::Char(' '), KeyModifiers::NONE)));
        assert!(matches_binding("F11", &key(KeyCode::F(11), KeyModifiers::NONE)));
        assert!(matches_binding("Ctrl-r", &key(KeyCode::Char('r'), KeyModifiers::CONTROL)));
        assert!(!matches_binding("Ctrl-r", &key(KeyCode::Char('r'), KeyModifiers::NONE)));
        assert!(!matches_binding("Esc", &key(KeyCode::Enter, KeyModifiers::NONE)));
        assert_eq!(parse_binding("nonsense"), None);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config: ToyConfig = serde_json::from_str(
            r#"{"key_bindings": {"forward": "Up"}, "robot": {"move_speed": 0.2, "repeat_move_distance": 2.0}}"#,
        )
        .unwrap();
        assert_eq!(config.key_bindings.forward, "Up");
        assert_eq!(config.key_bindings.backward, "s");
        assert_eq!(config.robot.move_speed, 0.2);
        assert_eq!(config.robot.rotate_speed, 0.05);
        assert_eq!(config.robot.moves.repeat_move_distance, 2.0);
        assert_eq!(config.robot.moves.while_moving_distance, 1.0);
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = ToyConfig::load_from(&path);
        assert_eq!(config.robot, RobotTuning::default());
        assert_eq!(config.key_bindings.quit, "Esc");
    }
}
