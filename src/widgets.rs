use std::collections::HashMap;
use std::ops::Range;

use crate::date_group::DateGroup;
use crate::formatting::{
    attachment_label, format_time, plain_text, sender_label, system_text, wrap_text,
    DELETED_NOTICE,
};
use crate::model::Message;
use crate::selection::{RenderTargets, ScrollAlign};
use crate::thread::ThreadSurface;

/// Window of `height` rows over a list of `len` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub offset: usize,
    pub height: usize,
    pub len: usize,
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Self {
            offset: 0,
            height,
            len: 0,
        }
    }

    pub fn max_offset(&self) -> usize {
        self.len.saturating_sub(self.height)
    }

    pub fn visible(&self) -> Range<usize> {
        self.offset..(self.offset + self.height).min(self.len)
    }

    pub fn is_at_bottom(&self) -> bool {
        self.offset >= self.max_offset()
    }

    pub fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn reveal(&mut self, row: usize, align: ScrollAlign) {
        let height = self.height.max(1);
        match align {
            ScrollAlign::Nearest => {
                if row < self.offset {
                    self.offset = row;
                } else if row >= self.offset + height {
                    self.offset = row + 1 - height;
                }
            }
            ScrollAlign::Center => {
                self.offset = row.saturating_sub(height / 2);
            }
        }
        self.clamp();
    }

    pub fn to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.offset = self.offset.saturating_add_signed(delta);
        self.clamp();
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(20)
    }
}

/// One row per entry, addressed by id. Used for the chat list.
#[derive(Debug, Default)]
pub struct ListViewport {
    pub ids: Vec<String>,
    pub viewport: Viewport,
}

impl ListViewport {
    pub fn set_ids(&mut self, ids: Vec<String>) {
        self.viewport.len = ids.len();
        self.ids = ids;
        self.viewport.clamp();
    }

    pub fn set_height(&mut self, height: usize) {
        self.viewport.height = height;
        self.viewport.clamp();
    }

    /// Id of the entry drawn at `row` of the visible window.
    pub fn id_at(&self, row: usize) -> Option<&str> {
        let idx = self.viewport.offset + row;
        if idx < self.viewport.visible().end {
            self.ids.get(idx).map(String::as_str)
        } else {
            None
        }
    }
}

impl RenderTargets for ListViewport {
    fn locate(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|i| i == id)
    }

    fn scroll_to(&mut self, row: usize, align: ScrollAlign) {
        self.viewport.reveal(row, align);
    }

    fn scroll_to_bottom(&mut self) {
        self.viewport.to_bottom();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    DateHeader,
    MessageHeader,
    Body,
    Deleted,
    System,
    Attachment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadLine {
    pub message_id: Option<String>,
    pub kind: LineKind,
    pub text: String,
    pub is_from_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScrollAnchor {
    Free,
    Bottom,
    Message(String, ScrollAlign),
}

/// Width-independent content of one thread row group, wrapped on rebuild.
#[derive(Debug, Clone)]
enum Entry {
    Date(String),
    Message {
        id: String,
        is_from_me: bool,
        parts: Vec<(LineKind, String)>,
    },
}

impl Entry {
    fn from_message(msg: &Message) -> Self {
        let mut parts = Vec::new();
        if msg.is_system() {
            parts.push((LineKind::System, system_text(msg)));
        } else {
            let mut header = format!("{}  {}", sender_label(msg), format_time(&msg.created_at));
            if msg.is_edited() && !msg.is_deleted() {
                header.push_str(" (edited)");
            }
            parts.push((LineKind::MessageHeader, header));

            if msg.is_deleted() {
                parts.push((LineKind::Deleted, format!("  {}", DELETED_NOTICE)));
            } else {
                parts.push((LineKind::Body, plain_text(msg.body_text())));
                for att in &msg.attachments {
                    parts.push((LineKind::Attachment, format!("  📎 {}", attachment_label(att))));
                }
            }
        }
        Entry::Message {
            id: msg.id.clone(),
            is_from_me: msg.is_from_me,
            parts,
        }
    }
}

/// Rendered message thread: day headers and wrapped messages as flat lines.
/// Scroll position is remembered relative to a message (or the bottom) so it
/// survives re-wrapping on resize.
pub struct ThreadPane {
    pub lines: Vec<ThreadLine>,
    pub viewport: Viewport,
    width: usize,
    entries: Vec<Entry>,
    anchors: HashMap<String, usize>,
    anchor: ScrollAnchor,
}

impl ThreadPane {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            viewport: Viewport::default(),
            width: 80,
            entries: Vec::new(),
            anchors: HashMap::new(),
            anchor: ScrollAnchor::Free,
        }
    }

    /// Fit the pane to its drawing area, re-wrapping when the width changed.
    pub fn resize(&mut self, width: usize, height: usize) {
        let width = width.max(1);
        if width != self.width {
            self.width = width;
            self.rebuild();
        }
        self.viewport.height = height;
        self.apply_anchor();
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_by(-(lines as isize));
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_by(lines as isize);
    }

    fn scroll_by(&mut self, delta: isize) {
        self.viewport.scroll_by(delta);
        self.anchor = if self.viewport.is_at_bottom() {
            ScrollAnchor::Bottom
        } else {
            ScrollAnchor::Free
        };
    }

    pub fn visible_lines(&self) -> &[ThreadLine] {
        &self.lines[self.viewport.visible()]
    }

    fn apply_anchor(&mut self) {
        match &self.anchor {
            ScrollAnchor::Free => self.viewport.clamp(),
            ScrollAnchor::Bottom => self.viewport.to_bottom(),
            ScrollAnchor::Message(id, align) => match self.anchors.get(id) {
                Some(&row) => self.viewport.reveal(row, *align),
                None => self.viewport.clamp(),
            },
        }
    }

    fn rebuild(&mut self) {
        let body_width = self.width.saturating_sub(2).max(1);
        let mut lines = Vec::new();
        let mut anchors = HashMap::new();

        for entry in &self.entries {
            let (id, is_from_me, parts) = match entry {
                Entry::Date(label) => {
                    lines.push(ThreadLine {
                        message_id: None,
                        kind: LineKind::DateHeader,
                        text: format!("── {} ──", label),
                        is_from_me: false,
                    });
                    continue;
                }
                Entry::Message {
                    id,
                    is_from_me,
                    parts,
                } => (id, *is_from_me, parts),
            };

            anchors.insert(id.clone(), lines.len());
            for (kind, text) in parts {
                let wrapped = match kind {
                    LineKind::System => wrap_text(text, body_width),
                    LineKind::Body => wrap_text(text, body_width)
                        .into_iter()
                        .map(|line| format!("  {}", line))
                        .collect(),
                    _ => vec![text.clone()],
                };
                lines.extend(wrapped.into_iter().map(|text| ThreadLine {
                    message_id: Some(id.clone()),
                    kind: *kind,
                    text,
                    is_from_me,
                }));
            }
        }

        self.lines = lines;
        self.anchors = anchors;
        self.viewport.len = self.lines.len();
        self.viewport.clamp();
    }
}

impl Default for ThreadPane {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTargets for ThreadPane {
    fn locate(&self, id: &str) -> Option<usize> {
        self.anchors.get(id).copied()
    }

    fn scroll_to(&mut self, row: usize, align: ScrollAlign) {
        self.anchor = match self.lines.get(row).and_then(|l| l.message_id.clone()) {
            Some(id) => ScrollAnchor::Message(id, align),
            None => ScrollAnchor::Free,
        };
        self.viewport.reveal(row, align);
    }

    fn scroll_to_bottom(&mut self) {
        self.anchor = ScrollAnchor::Bottom;
        self.viewport.to_bottom();
    }
}

impl ThreadSurface for ThreadPane {
    fn show(&mut self, messages: &[Message], groups: &[DateGroup]) {
        self.entries.clear();
        for group in groups {
            self.entries.push(Entry::Date(group.label.clone()));
            self.entries
                .extend(group.messages(messages).iter().map(Entry::from_message));
        }
        self.anchor = ScrollAnchor::Free;
        self.viewport.offset = 0;
        self.rebuild();
    }
}
