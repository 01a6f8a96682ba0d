use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::models::Vote;
use crate::view::Tab;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    MoveUp,
    MoveDown,
    Select,
    SwitchTab(Tab),
    NextTab,
    RefreshFeed,
    ToggleBookmark,
    RequestInsight,
    Vote(Vote),
    OpenInBrowser,
    ShowHelp,
    HideHelp,
    // Management tab
    PrevCategory,
    NextCategory,
    ToggleKeyword,
    // Comment input actions
    CommentInputStart,
    CommentInputChar(char),
    CommentInputBackspace,
    CommentInputConfirm,
    CommentInputCancel,
}

pub fn handle_key_event(
    key: KeyEvent,
    comment_input_active: bool,
    show_help: bool,
) -> Option<AppAction> {
    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    // Comment input mode
    if comment_input_active {
        return match key.code {
            KeyCode::Enter => Some(AppAction::CommentInputConfirm),
            KeyCode::Esc => Some(AppAction::CommentInputCancel),
            KeyCode::Backspace => Some(AppAction::CommentInputBackspace),
            KeyCode::Char(c) => Some(AppAction::CommentInputChar(c)),
            _ => None,
        };
    }

    // Normal mode
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => Some(AppAction::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),

        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::MoveDown),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::MoveUp),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(AppAction::PrevCategory),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(AppAction::NextCategory),

        (KeyCode::Enter, _) => Some(AppAction::Select),
        (KeyCode::Char(' '), _) => Some(AppAction::ToggleKeyword),

        (KeyCode::Char('1'), _) => Some(AppAction::SwitchTab(Tab::All)),
        (KeyCode::Char('2'), _) => Some(AppAction::SwitchTab(Tab::Recommended)),
        (KeyCode::Char('3'), _) => Some(AppAction::SwitchTab(Tab::Bookmarks)),
        (KeyCode::Char('4'), _) => Some(AppAction::SwitchTab(Tab::Management)),
        (KeyCode::Tab, _) => Some(AppAction::NextTab),

        (KeyCode::Char('r'), _) => Some(AppAction::RefreshFeed),
        (KeyCode::Char('b'), _) => Some(AppAction::ToggleBookmark),
        (KeyCode::Char('i'), _) => Some(AppAction::RequestInsight),
        (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => Some(AppAction::Vote(Vote::Up)),
        (KeyCode::Char('-'), _) => Some(AppAction::Vote(Vote::Down)),
        (KeyCode::Char('c'), _) => Some(AppAction::CommentInputStart),
        (KeyCode::Char('o'), _) => Some(AppAction::OpenInBrowser),

        (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),

        _ => None,
    }
}
