//! Reading session state
//!
//! A `ReaderSession` holds what the chapter reader shows: the open chapter,
//! the reading position and the display preferences. Changes are published
//! through a `tokio::sync::watch` channel so any number of observers can
//! follow them. Nothing here outlives the process; the dark-mode preference
//! that does persist lives in [`crate::settings`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::error::{AppError, AppResult};

/// Vertical continuous scroll or horizontal page-by-page
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadingMode {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReaderFont {
    #[default]
    Default,
    Serif,
    SansSerif,
    Monospace,
}

/// Overlay menu; toggled by tapping the page, never hidden by a timer
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MenuState {
    #[default]
    Visible,
    Hidden,
}

impl MenuState {
    pub fn toggled(self) -> Self {
        match self {
            MenuState::Visible => MenuState::Hidden,
            MenuState::Hidden => MenuState::Visible,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReaderState {
    pub story_id: String,
    pub chapter_id: u32,
    pub total_chapters: u32,

    /// Current page in horizontal mode
    pub page: u32,

    /// Scroll offset in vertical mode
    pub scroll_offset: f32,
    pub mode: ReadingMode,
    pub font: ReaderFont,
    pub dark_mode: bool,
    pub menu: MenuState,
}

/// Partial preference change; absent fields keep their value
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ReaderPreferences {
    pub mode: Option<ReadingMode>,
    pub font: Option<ReaderFont>,
    pub dark_mode: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OpenReaderRequest {
    pub story_id: String,
    pub chapter_id: u32,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PositionRequest {
    pub page: u32,
    pub scroll_offset: f32,
}

/// Result of a chapter navigation request
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    /// `false` when the request was out of range and ignored
    pub moved: bool,
    pub state: ReaderState,
}

/// Chapter after `current`, if it is within `[1, total]`
pub fn next_chapter_id(current: u32, total: u32) -> Option<u32> {
    current.checked_add(1).filter(|next| (1..=total).contains(next))
}

/// Chapter before `current`, if it is within `[1, total]`
pub fn previous_chapter_id(current: u32, total: u32) -> Option<u32> {
    current.checked_sub(1).filter(|prev| (1..=total).contains(prev))
}

#[derive(Clone)]
pub struct ReaderSession {
    state: Arc<watch::Sender<ReaderState>>,
}

impl ReaderSession {
    /// Opens `chapter_id` of a story with `total_chapters` chapters
    ///
    /// The menu starts visible and the position at the top of the chapter.
    pub fn open(story_id: &str, chapter_id: u32, total_chapters: u32, dark_mode: bool) -> Self {
        let (tx, _) = watch::channel(ReaderState {
            story_id: story_id.to_string(),
            chapter_id,
            total_chapters,
            dark_mode,
            ..ReaderState::default()
        });
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReaderState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ReaderState {
        self.state.borrow().clone()
    }

    /// Flips the overlay menu and returns the new state
    pub fn toggle_menu(&self) -> MenuState {
        self.state.send_modify(|s| s.menu = s.menu.toggled());
        self.state.borrow().menu
    }

    pub fn apply_preferences(&self, prefs: ReaderPreferences) -> ReaderState {
        self.state.send_if_modified(|s| {
            let before = (s.mode, s.font, s.dark_mode);
            if let Some(mode) = prefs.mode {
                s.mode = mode;
            }
            if let Some(font) = prefs.font {
                s.font = font;
            }
            if let Some(dark_mode) = prefs.dark_mode {
                s.dark_mode = dark_mode;
            }
            before != (s.mode, s.font, s.dark_mode)
        });
        self.snapshot()
    }

    pub fn set_position(&self, page: u32, scroll_offset: f32) -> ReaderState {
        let scroll_offset = if scroll_offset.is_finite() {
            scroll_offset.max(0.0)
        } else {
            0.0
        };
        self.state.send_modify(|s| {
            s.page = page;
            s.scroll_offset = scroll_offset;
        });
        self.snapshot()
    }

    /// Moves to the next chapter; out-of-range requests are ignored
    pub fn next_chapter(&self) -> Option<u32> {
        self.move_to(next_chapter_id)
    }

    /// Moves to the previous chapter; out-of-range requests are ignored
    pub fn previous_chapter(&self) -> Option<u32> {
        self.move_to(previous_chapter_id)
    }

    fn move_to(&self, step: fn(u32, u32) -> Option<u32>) -> Option<u32> {
        let mut target = None;
        self.state.send_if_modified(|s| {
            target = step(s.chapter_id, s.total_chapters);
            match target {
                Some(chapter_id) => {
                    s.chapter_id = chapter_id;
                    s.page = 0;
                    s.scroll_offset = 0.0;
                    true
                }
                None => false,
            }
        });
        target
    }
}

/// One reader session per user id, kept for the lifetime of the process
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    sessions: Arc<Mutex<HashMap<String, ReaderSession>>>,
}

impl ReaderRegistry {
    pub fn get(&self, user_id: &str) -> AppResult<Option<ReaderSession>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(sessions.get(user_id).cloned())
    }

    /// Like `get`, but a missing session is `NotFound`
    pub fn require(&self, user_id: &str) -> AppResult<ReaderSession> {
        self.get(user_id)?
            .ok_or_else(|| AppError::NotFound("no chapter is open".to_string()))
    }

    /// Replaces whatever session the user had
    pub fn insert(&self, user_id: &str, session: ReaderSession) -> AppResult<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        sessions.insert(user_id.to_string(), session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_navigation_stays_in_range() {
        assert_eq!(next_chapter_id(1, 3), Some(2));
        assert_eq!(next_chapter_id(3, 3), None);
        assert_eq!(previous_chapter_id(3, 3), Some(2));
        assert_eq!(previous_chapter_id(1, 3), None);
        assert_eq!(next_chapter_id(0, 0), None);
        assert_eq!(next_chapter_id(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn menu_toggles_between_two_states() {
        let session = ReaderSession::open("story", 1, 1, false);
        assert_eq!(session.snapshot().menu, MenuState::Visible);
        assert_eq!(session.toggle_menu(), MenuState::Hidden);
        assert_eq!(session.toggle_menu(), MenuState::Visible);
    }

    #[test]
    fn out_of_range_navigation_leaves_state_untouched() {
        let session = ReaderSession::open("story", 2, 2, false);
        session.set_position(4, 120.0);
        let before = session.snapshot();

        assert_eq!(session.next_chapter(), None);
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn changing_chapter_resets_position() {
        let session = ReaderSession::open("story", 2, 5, false);
        session.set_position(7, 300.0);

        assert_eq!(session.previous_chapter(), Some(1));
        let state = session.snapshot();
        assert_eq!(state.chapter_id, 1);
        assert_eq!(state.page, 0);
        assert_eq!(state.scroll_offset, 0.0);
    }

    #[test]
    fn preferences_merge_and_notify_observers() {
        let session = ReaderSession::open("story", 1, 1, true);
        let mut rx = session.subscribe();

        let state = session.apply_preferences(ReaderPreferences {
            mode: Some(ReadingMode::Horizontal),
            ..ReaderPreferences::default()
        });
        assert_eq!(state.mode, ReadingMode::Horizontal);
        assert_eq!(state.font, ReaderFont::Default);
        assert!(state.dark_mode);
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        session.apply_preferences(ReaderPreferences::default());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn negative_scroll_is_clamped() {
        let session = ReaderSession::open("story", 1, 1, false);
        assert_eq!(session.set_position(0, -15.0).scroll_offset, 0.0);
    }
}
