//! Robot: the live robot instance and its per-frame update.
//!
//! The robot owns its pose and the held-input state. Every frame the host
//! calls `tick`, which reads the input state, advances the pose by one
//! engine step and progresses the canned animations. Interpreter-driven
//! and manual input go through the same `InputState`.

pub mod animation;

use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::types::{
    Component, ComponentFlags, Control, Form, HatchState, InputState, RobotPose, Vec3,
    GROUND_HEIGHT,
};
use animation::{
    jump_height, Tween, FLY_FRAMES, HATCH_FRAMES, JUMP_FRAMES, TRANSFORM_FRAMES,
};

/// Open hatch angle around its hinge.
pub const HATCH_OPEN_ANGLE: f64 = PI / 2.5;
pub const CUBE_BODY_SCALE: Vec3 = Vec3::new(1.2, 1.5, 1.3);
/// Head and hatch shrink to (almost) nothing in cube form.
pub const CUBE_PART_SCALE: Vec3 = Vec3::splat(0.01);
pub const JUMP_PEAK: f64 = 1.5;
pub const HOVER_HEIGHT: f64 = 2.0;
/// Leg phase advance per moving frame.
const WALK_CYCLE_STEP: f64 = 0.15;

/// Per-tick speeds of the frame update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// Ground displacement per tick while a move control is held.
    pub move_speed: f64,
    /// Yaw increment in radians per tick while a rotate control is held.
    pub rotate_speed: f64,
}

impl Default for Kinematics {
    fn default() -> Self {
        Kinematics {
            move_speed: 0.1,
            rotate_speed: 0.05,
        }
    }
}

/// Animated visual parameters, read by the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    pub hatch_angle: f64,
    pub body_scale: Vec3,
    pub head_scale: Vec3,
    pub hatch_scale: Vec3,
}

#[derive(Debug, Clone)]
struct Animations {
    hatch_angle: Tween<f64>,
    body_scale: Tween<Vec3>,
    head_scale: Tween<Vec3>,
    hatch_scale: Tween<Vec3>,
    hover: Tween<f64>,
    jump: Option<Tween<f64>>,
}

impl Default for Animations {
    fn default() -> Self {
        Animations {
            hatch_angle: Tween::settled(0.0),
            body_scale: Tween::settled(Vec3::ONE),
            head_scale: Tween::settled(Vec3::ONE),
            hatch_scale: Tween::settled(Vec3::ONE),
            hover: Tween::settled(0.0),
            jump: None,
        }
    }
}

impl Animations {
    fn advance(&mut self, dt: f64) {
        self.hatch_angle.advance(dt);
        self.body_scale.advance(dt);
        self.head_scale.advance(dt);
        self.hatch_scale.advance(dt);
        self.hover.advance(dt);
        if let Some(jump) = &mut self.jump {
            jump.advance(dt);
            if jump.is_finished() {
                self.jump = None;
            }
        }
    }

    fn height_offset(&self) -> f64 {
        let jump = self
            .jump
            .as_ref()
            .map(|j| jump_height(j.value(), JUMP_PEAK))
            .unwrap_or(0.0);
        self.hover.value() + jump
    }
}

#[derive(Debug, Clone)]
pub struct Robot {
    pose: RobotPose,
    input: InputState,
    components: ComponentFlags,
    kinematics: Kinematics,
    animations: Animations,
}

impl Robot {
    pub fn new(kinematics: Kinematics) -> Self {
        Robot {
            pose: RobotPose::default(),
            input: InputState::default(),
            components: ComponentFlags::default(),
            kinematics,
            animations: Animations::default(),
        }
    }

    pub fn pose(&self) -> RobotPose {
        self.pose
    }

    pub fn input(&self) -> InputState {
        self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn components(&self) -> ComponentFlags {
        self.components
    }

    pub fn set_component(&mut self, component: Component, enabled: bool) {
        self.components.set(component, enabled);
    }

    pub fn kinematics(&self) -> Kinematics {
        self.kinematics
    }

    pub fn appearance(&self) -> Appearance {
        Appearance {
            hatch_angle: self.animations.hatch_angle.value(),
            body_scale: self.animations.body_scale.value(),
            head_scale: self.animations.head_scale.value(),
            hatch_scale: self.animations.hatch_scale.value(),
        }
    }

    /// One engine frame: apply held controls, then progress animations by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        let speed = self.kinematics.move_speed;
        let yaw = self.pose.yaw;
        let mut step = Vec3::default();
        let mut moving = false;

        if self.input.is_held(Control::Forward) {
            step = step + Vec3::heading(yaw) * speed;
            moving = true;
        }
        if self.input.is_held(Control::Backward) {
            step = step + Vec3::heading(yaw) * -speed;
            moving = true;
        }
        if self.input.is_held(Control::Left) {
            step = step + Vec3::heading(yaw - FRAC_PI_2) * speed;
            moving = true;
        }
        if self.input.is_held(Control::Right) {
            step = step + Vec3::heading(yaw + FRAC_PI_2) * speed;
            moving = true;
        }
        if self.input.is_held(Control::RotateLeft) {
            self.pose.yaw += self.kinematics.rotate_speed;
        }
        if self.input.is_held(Control::RotateRight) {
            self.pose.yaw -= self.kinematics.rotate_speed;
        }

        self.pose.position = self.pose.position + step;
        if moving {
            self.pose.walk_cycle += WALK_CYCLE_STEP;
        }

        self.animations.advance(dt);
        self.pose.position.y = (GROUND_HEIGHT + self.animations.height_offset()).max(GROUND_HEIGHT);
    }

    /// Flip the hatch and swing it toward its new resting angle.
    pub fn toggle_hatch(&mut self) -> HatchState {
        self.pose.hatch = self.pose.hatch.toggled();
        let target = match self.pose.hatch {
            HatchState::Open => HATCH_OPEN_ANGLE,
            HatchState::Closed => 0.0,
        };
        let current = self.animations.hatch_angle.value();
        self.animations.hatch_angle = Tween::new(current, target, HATCH_FRAMES);
        self.pose.hatch
    }

    /// Flip between robot and cube form, scaling body, head and hatch together.
    pub fn toggle_form(&mut self) -> Form {
        self.pose.form = self.pose.form.toggled();
        let (body, part) = match self.pose.form {
            Form::Cube => (CUBE_BODY_SCALE, CUBE_PART_SCALE),
            Form::Robot => (Vec3::ONE, Vec3::ONE),
        };
        let anims = &mut self.animations;
        anims.body_scale = Tween::new(anims.body_scale.value(), body, TRANSFORM_FRAMES);
        anims.head_scale = Tween::new(anims.head_scale.value(), part, TRANSFORM_FRAMES);
        anims.hatch_scale = Tween::new(anims.hatch_scale.value(), part, TRANSFORM_FRAMES);
        self.pose.form
    }

    pub fn jump(&mut self) {
        self.animations.jump = Some(Tween::new(0.0, 1.0, JUMP_FRAMES));
    }

    pub fn toggle_lights(&mut self) -> bool {
        self.pose.lights_on = !self.pose.lights_on;
        self.pose.lights_on
    }

    pub fn toggle_fly(&mut self) -> bool {
        self.pose.flying = !self.pose.flying;
        let target = if self.pose.flying { HOVER_HEIGHT } else { 0.0 };
        let current = self.animations.hover.value();
        self.animations.hover = Tween::new(current, target, FLY_FRAMES);
        self.pose.flying
    }

    /// Back to the canonical pose with every animation settled.
    /// Installed components are kept.
    pub fn reset(&mut self) {
        self.pose = RobotPose::default();
        self.animations = Animations::default();
    }
}

/// Shared handle to the live robot.
///
/// The frame loop, the driver and manual input handlers all hold a clone.
/// The lock is never held across an await.
#[derive(Debug, Clone)]
pub struct RobotHandle {
    inner: Arc<Mutex<Robot>>,
}

impl RobotHandle {
    pub fn new(robot: Robot) -> Self {
        RobotHandle {
            inner: Arc::new(Mutex::new(robot)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Robot) -> R) -> R {
        let mut robot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut robot)
    }

    pub fn pose(&self) -> RobotPose {
        self.with(|r| r.pose())
    }

    pub fn input(&self) -> InputState {
        self.with(|r| r.input())
    }

    pub fn set_input(&self, control: Control, held: bool) {
        self.with(|r| r.input_mut().set(control, held));
    }

    pub fn clear_input(&self) {
        self.with(|r| r.input_mut().clear());
    }
}
