use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyEvent, KeyEventKind};

use crate::config::{matches_binding, KeyBindings};
use crate::session::ApplicationSession;
use crate::types::{Component, Control};

/// Most terminals only report presses and auto-repeats, so a movement key
/// counts as held until this long after its last press.
pub const HOLD_TIMEOUT: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Continue,
    Redraw,
    RunProgram,
    StopProgram,
    ToggleFullscreen,
    Quit,
}

/// Keyboard-held controls and when each one lapses.
#[derive(Debug, Default)]
pub struct ManualHolds {
    until: HashMap<Control, Instant>,
}

impl ManualHolds {
    fn hold(&mut self, session: &ApplicationSession, control: Control, now: Instant) -> bool {
        if !session.press(control) {
            return false;
        }
        self.until.insert(control, now + HOLD_TIMEOUT);
        true
    }

    fn release(&mut self, session: &ApplicationSession, control: Control) {
        if self.until.remove(&control).is_some() {
            session.release(control);
        }
    }

    /// Release every hold whose key has not repeated in time.
    pub fn expire(&mut self, session: &ApplicationSession, now: Instant) {
        let lapsed: Vec<Control> = self
            .until
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(control, _)| *control)
            .collect();
        for control in lapsed {
            self.release(session, control);
        }
    }

    /// Forget all holds. Used when a program takes over the input state.
    pub fn forget(&mut self) {
        self.until.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.until.is_empty()
    }
}

pub fn handle_event(
    session: &ApplicationSession,
    bindings: &KeyBindings,
    holds: &mut ManualHolds,
    event: Event,
    now: Instant,
) -> Action {
    match event {
        Event::Key(key) => handle_key(session, bindings, holds, key, now),
        Event::Resize(_, _) => Action::Redraw,
        _ => Action::Continue,
    }
}

fn movement_control(bindings: &KeyBindings, key: &KeyEvent) -> Option<Control> {
    [
        (&bindings.forward, Control::Forward),
        (&bindings.backward, Control::Backward),
        (&bindings.left, Control::Left),
        (&bindings.right, Control::Right),
        (&bindings.rotate_left, Control::RotateLeft),
        (&bindings.rotate_right, Control::RotateRight),
    ]
    .into_iter()
    .find(|(binding, _)| matches_binding(binding, key))
    .map(|(_, control)| control)
}

fn handle_key(
    session: &ApplicationSession,
    bindings: &KeyBindings,
    holds: &mut ManualHolds,
    key: KeyEvent,
    now: Instant,
) -> Action {
    if let Some(control) = movement_control(bindings, &key) {
        return match key.kind {
            KeyEventKind::Release => {
                holds.release(session, control);
                Action::Continue
            }
            // Ignored while a program runs; the status line shows the lock.
            KeyEventKind::Press | KeyEventKind::Repeat => {
                holds.hold(session, control, now);
                Action::Continue
            }
        };
    }

    // Everything below acts on presses only.
    if key.kind == KeyEventKind::Release {
        return Action::Continue;
    }

    if matches_binding(&bindings.quit, &key) {
        return Action::Quit;
    }
    if matches_binding(&bindings.fullscreen, &key) {
        return Action::ToggleFullscreen;
    }
    if matches_binding(&bindings.run_program, &key) {
        return Action::RunProgram;
    }
    if matches_binding(&bindings.stop_program, &key) {
        return Action::StopProgram;
    }
    if matches_binding(&bindings.reset_pose, &key) {
        holds.forget();
        session.reset_robot_pose();
        return Action::Redraw;
    }
    if matches_binding(&bindings.toggle_hatch, &key) {
        session.toggle_hatch();
        return Action::Redraw;
    }
    if matches_binding(&bindings.transform, &key) {
        session.toggle_form();
        return Action::Redraw;
    }
    for (binding, component) in [
        (&bindings.toggle_jump, Component::Jump),
        (&bindings.toggle_lights, Component::Lights),
        (&bindings.toggle_fly, Component::Fly),
    ] {
        if matches_binding(binding, &key) {
            session.toggle_component(component);
            return Action::Redraw;
        }
    }

    Action::Continue
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    use super::*;
    use crate::config::RobotTuning;
    use crate::program::step::ProgramStep;
    use crate::types::HatchState;

    fn press(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn release(c: char) -> Event {
        Event::Key(KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        })
    }

    fn fixture() -> (ApplicationSession, KeyBindings, ManualHolds) {
        (
            ApplicationSession::new(&RobotTuning::default()),
            KeyBindings::default(),
            ManualHolds::default(),
        )
    }

    #[test]
    fn movement_key_holds_until_timeout() {
        let (session, bindings, mut holds) = fixture();
        let t0 = Instant::now();
        handle_event(&session, &bindings, &mut holds, press('w'), t0);
        assert!(session.input().is_held(Control::Forward));

        holds.expire(&session, t0 + Duration::from_millis(100));
        assert!(session.input().is_held(Control::Forward));

        holds.expire(&session, t0 + HOLD_TIMEOUT);
        assert!(!session.input().is_held(Control::Forward));
        assert!(holds.is_empty());
    }

    #[test]
    fn release_event_lets_go_immediately() {
        let (session, bindings, mut holds) = fixture();
        let now = Instant::now();
        handle_event(&session, &bindings, &mut holds, press('q'), now);
        assert!(session.input().is_held(Control::RotateLeft));
        handle_event(&session, &bindings, &mut holds, release('q'), now);
        assert!(!session.input().is_held(Control::RotateLeft));
    }

    #[test]
    fn program_and_app_keys_map_to_actions() {
        let (session, bindings, mut holds) = fixture();
        let now = Instant::now();
        let mut act = |event| handle_event(&session, &bindings, &mut holds, event, now);
        assert_eq!(act(press('r')), Action::RunProgram);
        assert_eq!(act(press('x')), Action::StopProgram);
        assert_eq!(
            act(Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE))),
            Action::Quit
        );
        assert_eq!(act(Event::Resize(80, 24)), Action::Redraw);
    }

    #[test]
    fn toggles_reach_the_robot() {
        let (session, bindings, mut holds) = fixture();
        let now = Instant::now();
        handle_event(&session, &bindings, &mut holds, press(' '), now);
        assert_eq!(session.pose().hatch, HatchState::Open);

        handle_event(&session, &bindings, &mut holds, press('2'), now);
        assert!(session.components().lights);
        handle_event(&session, &bindings, &mut holds, press('2'), now);
        assert!(!session.components().lights);
    }

    #[tokio::test(start_paused = true)]
    async fn movement_is_ignored_while_a_program_runs() {
        let (session, bindings, mut holds) = fixture();
        let handle = session
            .start_program(vec![ProgramStep::Wait { seconds: 1.0 }])
            .unwrap();

        let action = handle_event(&session, &bindings, &mut holds, press('d'), Instant::now());
        assert_eq!(action, Action::Continue);
        assert!(!session.input().is_held(Control::Right));
        assert!(holds.is_empty());

        handle.finished().await.unwrap();
    }
}
