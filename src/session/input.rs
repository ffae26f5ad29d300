//! Keyboard handling: key mapping plus the page-turn state machine.
//!
//! Pure logic, no I/O. The session feeds key events in and executes the
//! returned commands against the rendition.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::debug;

use crate::config::FontConfig;
use crate::engine::{Direction, Turn};

/// Actions produced by key mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FontLarger,
    FontSmaller,
    FontReset,
    Turn(Turn),
}

/// Map a key event to an `Action`.
///
/// The font modifier is Ctrl or Super (Cmd). Arrows only count without
/// modifiers; for right-to-left books Left means "next".
/// Returns `None` for keys the reader does not handle.
pub fn map_key_event(key: KeyEvent, direction: Direction) -> Option<Action> {
    let KeyEvent {
        code,
        modifiers,
        kind,
        ..
    } = key;
    if kind == KeyEventKind::Release {
        return None;
    }
    let modified = modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER);

    match code {
        KeyCode::Char('=') | KeyCode::Char('+') if modified => Some(Action::FontLarger),
        KeyCode::Char('-') if modified => Some(Action::FontSmaller),
        KeyCode::Char('0') if modified => Some(Action::FontReset),
        KeyCode::Left if modifiers.is_empty() => Some(Action::Turn(match direction {
            Direction::Rtl => Turn::Next,
            Direction::Ltr => Turn::Prev,
        })),
        KeyCode::Right if modifiers.is_empty() => Some(Action::Turn(match direction {
            Direction::Rtl => Turn::Prev,
            Direction::Ltr => Turn::Next,
        })),
        _ => None,
    }
}

/// New font size in percent after `action`.
fn adjust_font(current: u32, action: Action, font: &FontConfig) -> u32 {
    let raw = match action {
        Action::FontLarger => current.saturating_add(font.step),
        Action::FontSmaller => current.saturating_sub(font.step),
        Action::FontReset => return font.default_size,
        Action::Turn(_) => return current,
    };
    let raw = font.min.map_or(raw, |min| raw.max(min));
    font.max.map_or(raw, |max| raw.min(max))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Turning(Turn),
}

/// Work for the session to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetFontSize(u32),
    Turn(Turn),
}

/// Result of offering a key to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not a reader key; the host keeps its default behavior.
    Ignored,
    /// A reader key: the host must suppress its default behavior. Carries a
    /// command unless the key was swallowed by an in-flight page turn.
    Handled(Option<Command>),
}

pub struct InputHandler {
    state: TurnState,
    font: FontConfig,
}

impl InputHandler {
    pub fn new(font: FontConfig) -> Self {
        Self {
            state: TurnState::Idle,
            font,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Interpret `key` given the book's direction and the current font size.
    ///
    /// A page turn moves the machine to `Turning`; further arrow presses are
    /// swallowed until `complete_turn` is called.
    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        direction: Direction,
        font_size: u32,
    ) -> KeyOutcome {
        let Some(action) = map_key_event(key, direction) else {
            return KeyOutcome::Ignored;
        };
        match action {
            Action::Turn(turn) => match self.state {
                TurnState::Idle => {
                    debug!("input: {turn:?} (idle → turning)");
                    self.state = TurnState::Turning(turn);
                    KeyOutcome::Handled(Some(Command::Turn(turn)))
                }
                TurnState::Turning(pending) => {
                    debug!("input: {turn:?} swallowed, {pending:?} still in flight");
                    KeyOutcome::Handled(None)
                }
            },
            font_action => {
                let size = adjust_font(font_size, font_action, &self.font);
                debug!("input: {font_action:?} font {font_size}% → {size}%");
                KeyOutcome::Handled(Some(Command::SetFontSize(size)))
            }
        }
    }

    /// Return to `Idle`. Yields the turn that was in flight, if any.
    pub fn complete_turn(&mut self) -> Option<Turn> {
        match std::mem::replace(&mut self.state, TurnState::Idle) {
            TurnState::Turning(turn) => Some(turn),
            TurnState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn simple_key(code: KeyCode) -> KeyEvent {
        key(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        key(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn font() -> FontConfig {
        FontConfig {
            step: 2,
            min: None,
            max: None,
            default_size: 100,
        }
    }

    fn font_after(key: KeyEvent, from: u32) -> KeyOutcome {
        InputHandler::new(font()).handle_key(key, Direction::Ltr, from)
    }

    #[test]
    fn test_ctrl_equals_grows_font() {
        assert_eq!(
            font_after(ctrl('='), 100),
            KeyOutcome::Handled(Some(Command::SetFontSize(102)))
        );
        assert_eq!(
            font_after(ctrl('+'), 100),
            KeyOutcome::Handled(Some(Command::SetFontSize(102)))
        );
    }

    #[test]
    fn test_ctrl_minus_shrinks_font() {
        assert_eq!(
            font_after(ctrl('-'), 100),
            KeyOutcome::Handled(Some(Command::SetFontSize(98)))
        );
    }

    #[test]
    fn test_ctrl_zero_resets_font() {
        for from in [2, 98, 100, 250] {
            assert_eq!(
                font_after(ctrl('0'), from),
                KeyOutcome::Handled(Some(Command::SetFontSize(100)))
            );
        }
    }

    #[test]
    fn test_super_is_a_modifier_too() {
        let k = key(KeyCode::Char('='), KeyModifiers::SUPER);
        assert_eq!(
            font_after(k, 100),
            KeyOutcome::Handled(Some(Command::SetFontSize(102)))
        );
    }

    #[test]
    fn test_unmodified_font_keys_ignored() {
        assert_eq!(font_after(simple_key(KeyCode::Char('=')), 100), KeyOutcome::Ignored);
        assert_eq!(font_after(simple_key(KeyCode::Char('0')), 100), KeyOutcome::Ignored);
    }

    #[test]
    fn test_font_unbounded_by_default() {
        assert_eq!(adjust_font(1, Action::FontSmaller, &font()), 0);
        assert_eq!(adjust_font(1000, Action::FontLarger, &font()), 1002);
    }

    #[test]
    fn test_font_bounds_clamp() {
        let bounded = FontConfig {
            min: Some(50),
            max: Some(200),
            ..font()
        };
        assert_eq!(adjust_font(50, Action::FontSmaller, &bounded), 50);
        assert_eq!(adjust_font(199, Action::FontLarger, &bounded), 200);
        assert_eq!(adjust_font(120, Action::FontLarger, &bounded), 122);
    }

    #[test]
    fn test_arrows_ltr() {
        assert_eq!(
            map_key_event(simple_key(KeyCode::Right), Direction::Ltr),
            Some(Action::Turn(Turn::Next))
        );
        assert_eq!(
            map_key_event(simple_key(KeyCode::Left), Direction::Ltr),
            Some(Action::Turn(Turn::Prev))
        );
    }

    #[test]
    fn test_arrows_rtl_inverted() {
        assert_eq!(
            map_key_event(simple_key(KeyCode::Left), Direction::Rtl),
            Some(Action::Turn(Turn::Next))
        );
        assert_eq!(
            map_key_event(simple_key(KeyCode::Right), Direction::Rtl),
            Some(Action::Turn(Turn::Prev))
        );
    }

    #[test]
    fn test_modified_arrow_ignored() {
        let k = key(KeyCode::Right, KeyModifiers::SHIFT);
        assert_eq!(map_key_event(k, Direction::Ltr), None);
    }

    #[test]
    fn test_release_ignored() {
        let mut k = simple_key(KeyCode::Right);
        k.kind = KeyEventKind::Release;
        assert_eq!(map_key_event(k, Direction::Ltr), None);
    }

    #[test]
    fn test_turn_lock_until_completed() {
        let mut h = InputHandler::new(font());
        let right = simple_key(KeyCode::Right);
        assert_eq!(
            h.handle_key(right, Direction::Ltr, 100),
            KeyOutcome::Handled(Some(Command::Turn(Turn::Next)))
        );
        assert_eq!(h.state(), TurnState::Turning(Turn::Next));
        assert_eq!(h.handle_key(right, Direction::Ltr, 100), KeyOutcome::Handled(None));

        assert_eq!(h.complete_turn(), Some(Turn::Next));
        assert_eq!(h.state(), TurnState::Idle);
        assert_eq!(
            h.handle_key(simple_key(KeyCode::Left), Direction::Ltr, 100),
            KeyOutcome::Handled(Some(Command::Turn(Turn::Prev)))
        );
    }

    #[test]
    fn test_font_keys_work_during_turn() {
        let mut h = InputHandler::new(font());
        h.handle_key(simple_key(KeyCode::Right), Direction::Ltr, 100);
        assert_eq!(
            h.handle_key(ctrl('='), Direction::Ltr, 100),
            KeyOutcome::Handled(Some(Command::SetFontSize(102)))
        );
    }

    #[test]
    fn test_complete_when_idle_is_noop() {
        let mut h = InputHandler::new(font());
        assert_eq!(h.complete_turn(), None);
    }

    #[test]
    fn test_unknown_key_ignored() {
        assert_eq!(font_after(simple_key(KeyCode::Char('x')), 100), KeyOutcome::Ignored);
    }
}
