use crate::model::ChatSummary;
use crate::selection::{step_index, Direction, RenderTargets, ScrollAlign, ViewSelection};

/// Keyboard and pointer selection over the chat list. The selected id itself
/// lives in the shared [`ViewSelection`].
#[derive(Debug, Default)]
pub struct ChatListController {
    scrolled_to: Option<String>,
}

impl ChatListController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_chat(&mut self, selection: &mut ViewSelection, chat_id: &str) {
        crate::debug_log!("chat_list: select {}", chat_id);
        selection.select_chat(Some(chat_id));
    }

    /// Move the selection through `chats`. Returns the newly selected id, or
    /// `None` when the list is empty.
    pub fn move_selection<'a>(
        &mut self,
        selection: &mut ViewSelection,
        direction: Direction,
        chats: &'a [ChatSummary],
    ) -> Option<&'a str> {
        let current = selection
            .selected_chat_id()
            .and_then(|id| chats.iter().position(|c| c.id == id));
        let next = step_index(current, chats.len(), direction)?;
        let chat_id = chats[next].id.as_str();
        self.select_chat(selection, chat_id);
        Some(chat_id)
    }

    /// Bring the selected entry into view if the selection moved since the
    /// last call. A selection that is not rendered is simply skipped.
    pub fn sync_scroll(&mut self, selection: &ViewSelection, targets: &mut impl RenderTargets) {
        let selected = selection.selected_chat_id();
        if self.scrolled_to.as_deref() == selected {
            return;
        }
        self.scrolled_to = selected.map(str::to_string);
        if let Some(row) = selected.and_then(|id| targets.locate(id)) {
            targets.scroll_to(row, ScrollAlign::Nearest);
        }
    }

    /// Forget the last scrolled entry, e.g. after the chat list was replaced.
    pub fn reset(&mut self) {
        self.scrolled_to = None;
    }
}
