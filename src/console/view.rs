//! Top-down ASCII view of the robot.
//!
//! Pure rasterization: pose and appearance in, text rows out. The camera
//! follows the robot; world +x is screen right and world +z is screen down,
//! so a robot at yaw 0 faces the bottom of the screen.

use std::f64::consts::FRAC_PI_4;

use crate::robot::Appearance;
use crate::types::{ComponentFlags, RobotPose};

/// Terminal cells per world unit. Cells are roughly twice as tall as wide.
pub const COLS_PER_UNIT: f64 = 4.0;
pub const ROWS_PER_UNIT: f64 = 2.0;
/// World spacing of the ground markers.
const GRID_SPACING: i64 = 2;

const ARROWS: [char; 8] = ['→', '↗', '↑', '↖', '←', '↙', '↓', '↘'];

/// Arrow pointing along the robot's heading on screen.
pub fn heading_glyph(yaw: f64) -> char {
    // Heading on screen: x right, y down.
    let (dx, dy) = (yaw.sin(), yaw.cos());
    let octant = ((-dy).atan2(dx) / FRAC_PI_4).round() as i64;
    ARROWS[octant.rem_euclid(8) as usize]
}

#[derive(Debug)]
struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<Vec<char>>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Canvas {
            width,
            height,
            cells: vec![vec![' '; width]; height],
        }
    }

    fn put(&mut self, col: i64, row: i64, ch: char) {
        if col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height {
            self.cells[row as usize][col as usize] = ch;
        }
    }

    fn into_rows(self) -> Vec<String> {
        self.cells.into_iter().map(|row| row.into_iter().collect()).collect()
    }
}

/// Draw the scene into `width × height` rows of text.
pub fn render_scene(
    pose: &RobotPose,
    look: &Appearance,
    components: &ComponentFlags,
    width: u16,
    height: u16,
) -> Vec<String> {
    let mut canvas = Canvas::new(width as usize, height as usize);
    let (cx, cy) = (width as i64 / 2, height as i64 / 2);
    let to_cell = |x: f64, z: f64| -> (i64, i64) {
        (
            cx + ((x - pose.position.x) * COLS_PER_UNIT).round() as i64,
            cy + ((z - pose.position.z) * ROWS_PER_UNIT).round() as i64,
        )
    };

    // Ground markers at fixed world positions so motion is visible.
    let half_w = width as f64 / COLS_PER_UNIT / 2.0 + 1.0;
    let half_h = height as f64 / ROWS_PER_UNIT / 2.0 + 1.0;
    let (x0, x1) = (
        (pose.position.x - half_w).floor() as i64,
        (pose.position.x + half_w).ceil() as i64,
    );
    let (z0, z1) = (
        (pose.position.z - half_h).floor() as i64,
        (pose.position.z + half_h).ceil() as i64,
    );
    for gz in z0..=z1 {
        for gx in x0..=x1 {
            if gx.rem_euclid(GRID_SPACING) == 0 && gz.rem_euclid(GRID_SPACING) == 0 {
                let (col, row) = to_cell(gx as f64, gz as f64);
                let mark = if gx == 0 && gz == 0 { '+' } else { '·' };
                canvas.put(col, row, mark);
            }
        }
    }

    // Flying robots are drawn one row up with a shadow on the ground.
    let airborne = pose.position.y - crate::types::GROUND_HEIGHT > 0.25;
    let lift = if airborne { 1 } else { 0 };
    if airborne {
        canvas.put(cx - 1, cy, '~');
        canvas.put(cx, cy, '~');
        canvas.put(cx + 1, cy, '~');
    }
    let row = cy - lift;

    let cube = look.body_scale.x > 1.1;
    let (open, close) = if cube { ('▐', '▌') } else { ('[', ']') };
    canvas.put(cx - 1, row, open);
    canvas.put(cx, row, heading_glyph(pose.yaw));
    canvas.put(cx + 1, row, close);

    // The hatch sits on top of the body; it is hidden in cube form.
    if look.hatch_scale.x > 0.5 && look.hatch_angle > 0.1 {
        canvas.put(cx, row - 1, 'o');
    }
    if pose.lights_on {
        canvas.put(cx - 2, row, '*');
        canvas.put(cx + 2, row, '*');
    }
    if components.jump && !airborne {
        canvas.put(cx, row + 1, '^');
    }

    canvas.into_rows()
}

/// One-line summary under the view.
pub fn status_line(
    pose: &RobotPose,
    components: &ComponentFlags,
    running: bool,
    steps_executed: usize,
    message: Option<&str>,
) -> String {
    let on = |enabled: bool| if enabled { "on" } else { "off" };
    let mut line = format!(
        " x {:+.1} z {:+.1} h {:.1} | yaw {:+.0}° | {:?}/{:?} | jump {} lights {} fly {}",
        pose.position.x,
        pose.position.z,
        pose.position.y,
        pose.yaw.to_degrees(),
        pose.form,
        pose.hatch,
        on(components.jump),
        on(components.lights),
        on(components.fly),
    );
    if running {
        line.push_str(&format!(" | running ({steps_executed} steps), keys locked"));
    }
    if let Some(message) = message {
        line.push_str(" | ");
        line.push_str(message);
    }
    line
}
