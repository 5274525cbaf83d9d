use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextTab,
    PrevTab,
    Down,
    Up,
    Left,
    Right,
    PageDown,
    PageUp,
    Top,
    Bottom,
    StartFilter,
    SubmitInput,
    CancelInput,
    Backspace,
    InputChar(char),
    Delete,
    ForceDelete,
    Prune,
    ToggleListAll,
    ToggleStartStop,
    TogglePause,
    Restart,
    Exec,
    ToggleLogs,
    Confirm,
    Back,
    Toggle,
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::Filter => map_filter_mode_key(key),
        InputMode::Dialog => map_dialog_mode_key(key),
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Tab | KeyCode::Right => Some(Action::NextTab),
        KeyCode::BackTab | KeyCode::Left => Some(Action::PrevTab),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::Char('/') => Some(Action::StartFilter),
        KeyCode::Char('d') => Some(Action::Delete),
        KeyCode::Char('D') => Some(Action::ForceDelete),
        KeyCode::Char('p') => Some(Action::Prune),
        KeyCode::Char('a') => Some(Action::ToggleListAll),
        KeyCode::Char('s') => Some(Action::ToggleStartStop),
        KeyCode::Char('t') => Some(Action::TogglePause),
        KeyCode::Char('r') => Some(Action::Restart),
        KeyCode::Char('x') => Some(Action::Exec),
        KeyCode::Char('l') => Some(Action::ToggleLogs),
        _ => None,
    }
}

fn map_filter_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

fn map_dialog_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::Confirm),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Up | KeyCode::BackTab | KeyCode::Char('k') => Some(Action::Up),
        KeyCode::Down | KeyCode::Tab | KeyCode::Char('j') => Some(Action::Down),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::Left),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::Right),
        KeyCode::Char(' ') => Some(Action::Toggle),
        _ => None,
    }
}
