//! Shared boundary types for the robot toy.
//!
//! This module defines the state that crosses component boundaries:
//! - Input producers → frame update: `InputState` keyed by `Control`
//! - Session/user → driver: `ComponentFlags` keyed by `Component`
//! - Frame update → view: `RobotPose`

use std::fmt;
use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Controls and held-input state
// ---------------------------------------------------------------------------

/// A logical control the frame update polls every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Forward,
    Backward,
    Left,
    Right,
    RotateLeft,
    RotateRight,
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::Forward,
        Control::Backward,
        Control::Left,
        Control::Right,
        Control::RotateLeft,
        Control::RotateRight,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Control::Forward => "forward",
            Control::Backward => "backward",
            Control::Left => "left",
            Control::Right => "right",
            Control::RotateLeft => "rotate-left",
            Control::RotateRight => "rotate-right",
        };
        f.write_str(name)
    }
}

/// Held status per control. Last writer wins; the session decides who may write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    held: [bool; Control::ALL.len()],
}

impl InputState {
    pub fn is_held(&self, control: Control) -> bool {
        self.held[control.index()]
    }

    pub fn set(&mut self, control: Control, held: bool) {
        self.held[control.index()] = held;
    }

    pub fn clear(&mut self) {
        self.held = [false; Control::ALL.len()];
    }

    pub fn any_held(&self) -> bool {
        self.held.iter().any(|h| *h)
    }
}

// ---------------------------------------------------------------------------
// Optional components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Jump,
    Lights,
    Fly,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Component::Jump => "jump",
            Component::Lights => "lights",
            Component::Fly => "fly",
        })
    }
}

/// Which optional capabilities the user has switched on. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFlags {
    #[serde(default)]
    pub jump: bool,
    #[serde(default)]
    pub lights: bool,
    #[serde(default)]
    pub fly: bool,
}

impl ComponentFlags {
    pub fn is_enabled(&self, component: Component) -> bool {
        match component {
            Component::Jump => self.jump,
            Component::Lights => self.lights,
            Component::Fly => self.fly,
        }
    }

    pub fn set(&mut self, component: Component, enabled: bool) {
        match component {
            Component::Jump => self.jump = enabled,
            Component::Lights => self.lights = enabled,
            Component::Fly => self.fly = enabled,
        }
    }
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ONE: Vec3 = Vec3::splat(1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    pub const fn splat(v: f64) -> Self {
        Vec3 { x: v, y: v, z: v }
    }

    /// Unit vector on the ground plane for a heading, +z at yaw 0.
    pub fn heading(yaw: f64) -> Self {
        Vec3::new(yaw.sin(), 0.0, yaw.cos())
    }

    pub fn lerp(self, to: Vec3, t: f64) -> Vec3 {
        self + (to + self * -1.0) * t
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HatchState {
    #[default]
    Closed,
    Open,
}

impl HatchState {
    pub fn toggled(self) -> Self {
        match self {
            HatchState::Closed => HatchState::Open,
            HatchState::Open => HatchState::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Form {
    #[default]
    Robot,
    Cube,
}

impl Form {
    pub fn toggled(self) -> Self {
        match self {
            Form::Robot => Form::Cube,
            Form::Cube => Form::Robot,
        }
    }
}

/// Resting height of the robot's origin above the ground.
pub const GROUND_HEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotPose {
    pub position: Vec3,
    /// Rotation about the vertical axis in radians.
    pub yaw: f64,
    pub hatch: HatchState,
    pub form: Form,
    pub lights_on: bool,
    pub flying: bool,
    /// Leg animation phase, advanced while moving.
    pub walk_cycle: f64,
}

impl Default for RobotPose {
    fn default() -> Self {
        RobotPose {
            position: Vec3::new(0.0, GROUND_HEIGHT, 0.0),
            yaw: 0.0,
            hatch: HatchState::Closed,
            form: Form::Robot,
            lights_on: false,
            flying: false,
            walk_cycle: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_tracks_each_control_independently() {
        let mut input = InputState::default();
        input.set(Control::Forward, true);
        input.set(Control::RotateRight, true);
        assert!(input.is_held(Control::Forward));
        assert!(!input.is_held(Control::Backward));
        assert!(input.is_held(Control::RotateRight));

        input.clear();
        assert!(!input.any_held());
    }

    #[test]
    fn hatch_and_form_toggle_back_and_forth() {
        assert_eq!(HatchState::Closed.toggled().toggled(), HatchState::Closed);
        assert_eq!(Form::Robot.toggled(), Form::Cube);
    }

    #[test]
    fn heading_points_along_z_at_zero_yaw() {
        let h = Vec3::heading(0.0);
        assert!((h.z - 1.0).abs() < 1e-12);
        assert!(h.x.abs() < 1e-12);
    }
}
