//! Console: the interactive terminal host.
//!
//! Runs the engine frame loop, feeds keyboard events to the session and
//! draws the robot every frame. The loaded program runs as a tokio task on
//! the same runtime; the frame loop and the program interleave at awaits.

pub mod view;

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use crossterm::{cursor, event, execute, queue, style, terminal};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::ToyConfig;
use crate::input::{self, Action, ManualHolds};
use crate::interpreter::{RunError, RunOutcome};
use crate::menubar::{line_width, print_menu_item};
use crate::program::step::ProgramStep;
use crate::session::{frame_period, ApplicationSession, ProgramHandle};

/// Rows above the view reserved for the menu bar.
const CANVAS_OFFSET: u16 = 1;
const MIN_WIDTH: u16 = 40;
const MIN_HEIGHT: u16 = 10;

const MENU_ITEMS: &[&str] = &[
    "[wasd] move",
    "[q][e] turn",
    "[Space] hatch",
    "[c] transform",
    "[1][2][3] parts",
    "[r]un",
    "[x] stop",
    "[0] reset",
    "[Esc] quit",
    "[F11] full",
];

pub struct Console {
    session: ApplicationSession,
    config: ToyConfig,
    program: Option<Vec<ProgramStep>>,
    running: Option<ProgramHandle>,
    holds: ManualHolds,
    message: Option<String>,
    fullscreen: bool,
}

impl Console {
    pub fn new(config: ToyConfig, program: Option<Vec<ProgramStep>>) -> Self {
        let message = match &program {
            Some(steps) => format!("program loaded ({} steps), press r to run", steps.len()),
            None => "no program loaded, manual control only".to_string(),
        };
        Console {
            session: ApplicationSession::new(&config.robot),
            config,
            program,
            running: None,
            holds: ManualHolds::default(),
            message: Some(message),
            fullscreen: false,
        }
    }

    /// Take over the terminal until the user quits.
    ///
    /// The terminal is restored on exit, including on error.
    pub async fn run(&mut self) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        if term_w < MIN_WIDTH || term_h < MIN_HEIGHT {
            bail!("Terminal too small: need {MIN_WIDTH}x{MIN_HEIGHT}, have {term_w}x{term_h}");
        }

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        let result = self.frame_loop(&mut stdout).await;

        self.session.stop_program();
        if let Some(handle) = self.running.take() {
            let outcome = handle.finished().await;
            info!(?outcome, "program ended on quit");
        }
        let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();

        result
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    async fn frame_loop(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        let period = frame_period(self.config.robot.frame_rate);
        let dt = period.as_secs_f64();
        let mut frames = time::interval(period);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            frames.tick().await;

            while event::poll(Duration::ZERO)? {
                let event = event::read()?;
                let action = input::handle_event(
                    &self.session,
                    &self.config.key_bindings,
                    &mut self.holds,
                    event,
                    Instant::now(),
                );
                match action {
                    Action::Continue => {}
                    Action::Redraw => execute!(stdout, terminal::Clear(terminal::ClearType::All))?,
                    Action::RunProgram => self.start_program(),
                    Action::StopProgram => {
                        if self.session.is_running() {
                            self.session.stop_program();
                            self.message = Some("stopping...".into());
                        }
                    }
                    Action::ToggleFullscreen => {
                        self.fullscreen = !self.fullscreen;
                        if self.fullscreen {
                            stdout.write_all(b"\x1b[10;1t")?;
                        } else {
                            stdout.write_all(b"\x1b[10;0t")?;
                        }
                        stdout.flush()?;
                    }
                    Action::Quit => return Ok(()),
                }
            }

            self.holds.expire(&self.session, Instant::now());
            self.session.tick(dt);
            self.reap_program().await;
            self.draw(stdout)?;
        }
    }

    fn start_program(&mut self) {
        let Some(steps) = &self.program else {
            self.message = Some("no program loaded".into());
            return;
        };
        match self.session.start_program(steps.clone()) {
            Ok(handle) => {
                self.holds.forget();
                self.running = Some(handle);
                self.message = Some("program running".into());
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    /// Collect the outcome of a program that has just ended.
    async fn reap_program(&mut self) {
        if !self.running.as_ref().is_some_and(ProgramHandle::is_finished) {
            return;
        }
        let Some(handle) = self.running.take() else {
            return;
        };
        let message = match handle.finished().await {
            Ok(RunOutcome::Completed) => "program completed".to_string(),
            Ok(RunOutcome::Cancelled) => "program stopped".to_string(),
            Err(RunError::AlreadyRunning) => "a program is already running".to_string(),
            Err(RunError::ExecutionFailed(reason)) => {
                warn!(%reason, "program failed");
                format!("program failed: {reason}")
            }
        };
        info!(%message, "program ended");
        self.message = Some(message);
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn draw(&self, stdout: &mut io::Stdout) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        self.draw_menubar(stdout, term_w)?;

        let view_h = term_h.saturating_sub(CANVAS_OFFSET + 1);
        let rows = view::render_scene(
            &self.session.pose(),
            &self.session.appearance(),
            &self.session.components(),
            term_w,
            view_h,
        );
        for (y, row) in rows.iter().enumerate() {
            queue!(
                stdout,
                cursor::MoveTo(0, y as u16 + CANVAS_OFFSET),
                style::Print(row),
            )?;
        }

        let status = view::status_line(
            &self.session.pose(),
            &self.session.components(),
            self.session.is_running(),
            self.session.steps_executed(),
            self.message.as_deref(),
        );
        let status: String = status.chars().take(term_w as usize).collect();
        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);
        queue!(
            stdout,
            cursor::MoveTo(0, term_h.saturating_sub(1)),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )?;
        stdout.flush()?;
        Ok(())
    }

    fn draw_menubar(&self, stdout: &mut io::Stdout, term_w: u16) -> Result<()> {
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(" "),
        )?;
        // Drop trailing items that would not fit on one line.
        let mut count = MENU_ITEMS.len();
        while count > 0 && line_width(&MENU_ITEMS[..count]) + 1 > term_w as usize {
            count -= 1;
        }
        for (i, item) in MENU_ITEMS[..count].iter().enumerate() {
            if i > 0 {
                queue!(stdout, style::Print("  "))?;
            }
            print_menu_item(stdout, item)?;
        }
        Ok(())
    }
}
