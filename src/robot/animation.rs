//! Keyframe tweens for the canned robot animations.
//!
//! Animations are authored in animation frames at a fixed rate and advanced
//! by wall-clock time, so a slow frame loop never stretches them.

use crate::types::Vec3;

/// Animation frame rate the canned animations are authored in.
pub const ANIMATION_FPS: f64 = 30.0;

/// Hatch swing: 30 frames (one second).
pub const HATCH_FRAMES: u32 = 30;
/// Robot ↔ cube scaling: 60 frames (two seconds).
pub const TRANSFORM_FRAMES: u32 = 60;
/// Jump arc: 60 frames (two seconds).
pub const JUMP_FRAMES: u32 = 60;
/// Take-off / landing: 30 frames (one second).
pub const FLY_FRAMES: u32 = 30;

/// Values a tween can interpolate.
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(self, to: f64, t: f64) -> f64 {
        self + (to - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(self, to: Vec3, t: f64) -> Vec3 {
        Vec3::lerp(self, to, t)
    }
}

/// A two-key linear animation from `from` (frame 0) to `to` (frame `frames`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T> {
    from: T,
    to: T,
    frames: u32,
    elapsed: f64,
}

impl<T: Lerp> Tween<T> {
    pub fn new(from: T, to: T, frames: u32) -> Self {
        Tween {
            from,
            to,
            frames,
            elapsed: 0.0,
        }
    }

    /// A tween that has already finished at `value`.
    pub fn settled(value: T) -> Self {
        Tween::new(value, value, 0)
    }

    /// Advance by `dt` seconds of wall-clock time.
    pub fn advance(&mut self, dt: f64) {
        if dt > 0.0 {
            self.elapsed += dt * ANIMATION_FPS;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.frames as f64
    }

    /// Evaluate the current value. Clamped to the end keys outside the window.
    pub fn value(&self) -> T {
        if self.frames == 0 || self.is_finished() {
            return self.to;
        }
        if self.elapsed <= 0.0 {
            return self.from;
        }
        self.from.lerp(self.to, self.elapsed / self.frames as f64)
    }
}

/// Height offset of a jump: a sine arc over the jump window.
pub fn jump_height(progress: f64, peak: f64) -> f64 {
    if !(0.0..=1.0).contains(&progress) {
        return 0.0;
    }
    (progress * std::f64::consts::PI).sin() * peak
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tween_interpolates_linearly_and_clamps() {
        let mut t = Tween::new(0.0, 3.0, 30);
        assert_eq!(t.value(), 0.0);

        t.advance(0.5); // 15 frames
        assert!((t.value() - 1.5).abs() < 1e-9);

        t.advance(10.0);
        assert!(t.is_finished());
        assert_eq!(t.value(), 3.0);
    }

    #[test]
    fn settled_tween_is_already_done() {
        let t = Tween::settled(Vec3::ONE);
        assert!(t.is_finished());
        assert_eq!(t.value(), Vec3::ONE);
    }

    #[test]
    fn jump_arc_starts_and_ends_on_the_ground() {
        assert!(jump_height(0.0, 1.5).abs() < 1e-9);
        assert!((jump_height(0.5, 1.5) - 1.5).abs() < 1e-9);
        assert!(jump_height(1.0, 1.5).abs() < 1e-9);
        assert_eq!(jump_height(1.2, 1.5), 0.0);
    }
}
