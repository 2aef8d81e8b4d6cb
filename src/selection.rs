//! The view selection shared by the chat list, the search box and the
//! message thread, plus the scrolling seam the presentation layer fills in.

/// One "scroll to and flash" request. `seq` identifies the request so that
/// its consumption can be acknowledged exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRequest {
    pub message_id: String,
    pub seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ViewSelection {
    selected_chat_id: Option<String>,
    highlight: Option<HighlightRequest>,
    next_seq: u64,
}

impl ViewSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_chat_id(&self) -> Option<&str> {
        self.selected_chat_id.as_deref()
    }

    pub fn highlight(&self) -> Option<&HighlightRequest> {
        self.highlight.as_ref()
    }

    /// Direct selection. Always drops any pending highlight.
    pub fn select_chat(&mut self, chat_id: Option<&str>) {
        self.selected_chat_id = chat_id.map(str::to_string);
        self.highlight = None;
    }

    /// Select a chat and ask for `message_id` to be brought into view.
    pub fn jump_to(&mut self, chat_id: &str, message_id: &str) -> u64 {
        self.next_seq += 1;
        self.selected_chat_id = Some(chat_id.to_string());
        self.highlight = Some(HighlightRequest {
            message_id: message_id.to_string(),
            seq: self.next_seq,
        });
        self.next_seq
    }

    /// Acknowledge a handled highlight. Only clears the highlight if it is
    /// still the one identified by `seq`.
    pub fn consume_highlight(&mut self, seq: u64) -> bool {
        if self.highlight.as_ref().is_some_and(|h| h.seq == seq) {
            self.highlight = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.selected_chat_id = None;
        self.highlight = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
    First,
    Last,
}

/// Index reached by moving from `current` in a list of `len` entries.
/// `Next`/`Previous` wrap; with nothing current `Next` lands on the first
/// entry and `Previous` on the last.
pub fn step_index(current: Option<usize>, len: usize, direction: Direction) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let current = current.filter(|&i| i < len);
    Some(match direction {
        Direction::Next => match current {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        },
        Direction::Previous => match current {
            Some(i) if i > 0 => i - 1,
            _ => len - 1,
        },
        Direction::First => 0,
        Direction::Last => len - 1,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlign {
    /// Move as little as possible to make the row visible.
    Nearest,
    Center,
}

/// Lookup and scrolling over whatever the presentation layer rendered.
/// Controllers never search rendered output themselves.
pub trait RenderTargets {
    /// Row of the rendered entry for `id`, if it is part of the current view.
    fn locate(&self, id: &str) -> Option<usize>;
    fn scroll_to(&mut self, row: usize, align: ScrollAlign);
    fn scroll_to_bottom(&mut self);
}
