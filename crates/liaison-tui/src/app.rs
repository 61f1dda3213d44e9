use liaison_core::{Liaison, Message, PendingReply};
use tracing::debug;

use crate::ui;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Panel state. Lives as long as the app; nothing here is global.
pub struct App {
    pub should_quit: bool,
    pub panel_open: bool,

    pub liaison: Liaison,
    pub model: String,
    pub pending: Option<PendingReply>,

    // Input cursor, in characters
    pub cursor: usize,

    // Chat scroll state
    pub scroll: u16,
    pub chat_height: u16, // Inner height of the chat area, set on render
    pub chat_width: u16,  // Inner width, for wrap estimates
    seen: (usize, bool),

    pub animation_frame: u8,
}

impl App {
    pub fn new(liaison: Liaison, model: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            panel_open: false,
            liaison,
            model: model.into(),
            pending: None,
            cursor: 0,
            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            seen: (0, false),
            animation_frame: 0,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        self.liaison.transcript()
    }

    pub fn draft(&self) -> &str {
        self.liaison.conversation().draft()
    }

    pub fn is_pending(&self) -> bool {
        self.liaison.is_pending()
    }

    pub fn toggle_panel(&mut self) {
        self.panel_open = !self.panel_open;
    }

    /// Submit the draft. Dropped silently if blank or a reply is outstanding.
    pub fn submit(&mut self) {
        if let Some(pending) = self.liaison.begin_draft() {
            self.pending = Some(pending);
            self.cursor = 0;
        }
    }

    /// Settle the conversation once the background request is done.
    pub async fn poll_reply(&mut self) {
        if !self.pending.as_ref().is_some_and(PendingReply::is_finished) {
            return;
        }
        if let Some(pending) = self.pending.take() {
            let outcome = pending.wait().await;
            self.liaison.finish(outcome);
            debug!(messages = self.transcript().len(), "reply settled");
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Draft editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(self.draft(), self.cursor);
        self.liaison.conversation_mut().draft_mut().insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(self.draft(), self.cursor);
            self.liaison.conversation_mut().draft_mut().remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.draft().chars().count() {
            let byte_pos = char_to_byte_index(self.draft(), self.cursor);
            self.liaison.conversation_mut().draft_mut().remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft().chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.draft().chars().count();
    }

    // Scrolling

    /// Rows the transcript takes once word-wrapped to the chat width,
    /// pending indicator included.
    pub fn total_chat_lines(&self) -> u16 {
        // Use actual chat width, default to 50 before the first render
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let rows = ui::transcript_paragraph(self).line_count(wrap_width);
        u16::try_from(rows).unwrap_or(u16::MAX)
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    pub fn max_scroll(&self) -> u16 {
        self.total_chat_lines().saturating_sub(self.visible_height())
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
    }

    /// Jump to the newest message whenever the transcript or the pending
    /// indicator changed since the last call.
    pub fn follow_transcript(&mut self) {
        let now = (self.transcript().len(), self.is_pending());
        if now != self.seen {
            self.seen = now;
            self.scroll_to_bottom();
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.visible_height() / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.visible_height() / 2).max(1));
    }
}
