use std::fmt::Display;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::date_group::{group_by_date, DateGroup};
use crate::model::Message;
use crate::selection::{HighlightRequest, RenderTargets, ScrollAlign, ViewSelection};

pub const DEFAULT_FLASH: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadPhase {
    Empty,
    Loading,
    Loaded,
}

/// Fetch of one chat's messages, stamped with the selection generation it
/// was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRequest {
    pub generation: u64,
    pub chat_id: String,
}

/// Presentation side of the thread: renders the grouped messages so that
/// they can be located and scrolled.
pub trait ThreadSurface: RenderTargets {
    fn show(&mut self, messages: &[Message], groups: &[DateGroup]);
}

/// Outcome of reconciling the thread with the current selection.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ThreadSync {
    pub request: Option<ThreadRequest>,
    /// Highlight requests that are finished and can be cleared upstream.
    pub consumed: Vec<u64>,
}

#[derive(Debug, Clone)]
struct Flash {
    seq: u64,
    message_id: String,
    until: Instant,
}

#[derive(Debug)]
pub struct MessageThreadController {
    flash_duration: Duration,
    chat_id: Option<String>,
    generation: u64,
    phase: ThreadPhase,
    messages: Vec<Message>,
    groups: Vec<DateGroup>,
    pending: Option<HighlightRequest>,
    flash: Option<Flash>,
    last_seq: Option<u64>,
}

impl MessageThreadController {
    pub fn new(flash_duration: Duration) -> Self {
        Self {
            flash_duration,
            chat_id: None,
            generation: 0,
            phase: ThreadPhase::Empty,
            messages: Vec::new(),
            groups: Vec::new(),
            pending: None,
            flash: None,
            last_seq: None,
        }
    }

    pub fn phase(&self) -> ThreadPhase {
        self.phase
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.phase == ThreadPhase::Loading
    }

    pub fn flashing(&self) -> Option<&str> {
        self.flash.as_ref().map(|f| f.message_id.as_str())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.flash.as_ref().map(|f| f.until)
    }

    /// Bring the thread in line with `selection`: start a fetch when the
    /// chat changed and pick up new highlight requests.
    pub fn sync(
        &mut self,
        selection: &ViewSelection,
        surface: &mut impl ThreadSurface,
        now: Instant,
    ) -> ThreadSync {
        let mut out = ThreadSync::default();
        let wanted = selection.highlight().cloned();

        // A pending highlight the selection no longer asks for is finished.
        if let Some(pending) = self.pending.take() {
            if wanted.as_ref().map(|h| h.seq) == Some(pending.seq) {
                self.pending = Some(pending);
            } else {
                crate::debug_log!("thread: highlight {} superseded", pending.seq);
                out.consumed.push(pending.seq);
            }
        }

        if selection.selected_chat_id() != self.chat_id.as_deref() {
            if let Some(flash) = self.flash.take() {
                out.consumed.push(flash.seq);
            }
            self.generation += 1;
            self.chat_id = selection.selected_chat_id().map(str::to_string);
            self.messages.clear();
            self.groups.clear();
            surface.show(&self.messages, &self.groups);

            match &self.chat_id {
                None => self.phase = ThreadPhase::Empty,
                Some(chat_id) => {
                    self.phase = ThreadPhase::Loading;
                    out.request = Some(ThreadRequest {
                        generation: self.generation,
                        chat_id: chat_id.clone(),
                    });
                }
            }
            crate::debug_log!(
                "thread: chat {:?}, generation {}",
                self.chat_id,
                self.generation
            );
        }

        if let Some(highlight) = wanted {
            if self.last_seq != Some(highlight.seq) {
                self.last_seq = Some(highlight.seq);
                if let Some(flash) = self.flash.take() {
                    out.consumed.push(flash.seq);
                }
                self.pending = Some(highlight);
                if self.phase == ThreadPhase::Loaded {
                    out.consumed.extend(self.arbitrate(surface, now));
                }
            }
        }

        out
    }

    /// Apply a fetch result. Returns the highlights consumed while settling,
    /// or nothing at all for a response to a superseded selection.
    pub fn apply_messages<E: Display>(
        &mut self,
        request: &ThreadRequest,
        result: Result<Vec<Message>, E>,
        surface: &mut impl ThreadSurface,
        now: Instant,
    ) -> Vec<u64> {
        if request.generation != self.generation
            || self.chat_id.as_deref() != Some(request.chat_id.as_str())
        {
            crate::debug_log!(
                "thread: discarding messages for {} (generation {}, current {})",
                request.chat_id,
                request.generation,
                self.generation
            );
            return Vec::new();
        }

        self.messages = result.unwrap_or_else(|e| {
            crate::warn_log!("thread: loading {} failed: {}", request.chat_id, e);
            Vec::new()
        });
        self.groups = group_by_date(&self.messages, Local::now());
        self.phase = ThreadPhase::Loaded;
        surface.show(&self.messages, &self.groups);
        self.arbitrate(surface, now)
    }

    /// Scroll to the pending highlight, or to the bottom when none is pending.
    fn arbitrate(&mut self, surface: &mut impl ThreadSurface, now: Instant) -> Vec<u64> {
        let Some(pending) = self.pending.take() else {
            surface.scroll_to_bottom();
            return Vec::new();
        };

        match surface.locate(&pending.message_id) {
            Some(row) => {
                crate::debug_log!("thread: flashing {} at row {}", pending.message_id, row);
                surface.scroll_to(row, ScrollAlign::Center);
                self.flash = Some(Flash {
                    seq: pending.seq,
                    message_id: pending.message_id,
                    until: now + self.flash_duration,
                });
                Vec::new()
            }
            None => {
                crate::debug_log!("thread: highlight target {} not found", pending.message_id);
                vec![pending.seq]
            }
        }
    }

    /// End the flash once its time is up.
    pub fn tick(&mut self, now: Instant) -> Vec<u64> {
        match &self.flash {
            Some(flash) if now >= flash.until => {
                let seq = flash.seq;
                self.flash = None;
                vec![seq]
            }
            _ => Vec::new(),
        }
    }
}

impl Default for MessageThreadController {
    fn default() -> Self {
        Self::new(DEFAULT_FLASH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::message;

    #[derive(Default)]
    struct FakeSurface {
        ids: Vec<String>,
        group_count: usize,
        scrolls: Vec<String>,
    }

    impl RenderTargets for FakeSurface {
        fn locate(&self, id: &str) -> Option<usize> {
            self.ids.iter().position(|m| m == id)
        }
        fn scroll_to(&mut self, row: usize, align: ScrollAlign) {
            self.scrolls.push(format!("{:?}:{}", align, row));
        }
        fn scroll_to_bottom(&mut self) {
            self.scrolls.push("bottom".to_string());
        }
    }

    impl ThreadSurface for FakeSurface {
        fn show(&mut self, messages: &[Message], groups: &[DateGroup]) {
            self.ids = messages.iter().map(|m| m.id.clone()).collect();
            self.group_count = groups.len();
        }
    }

    fn msgs(ids: &[&str]) -> Vec<Message> {
        ids.iter()
            .map(|id| message(id, "2026-10-19T08:00:00Z", "hello"))
            .collect()
    }

    fn ok(ids: &[&str]) -> Result<Vec<Message>, String> {
        Ok(msgs(ids))
    }

    #[test]
    fn test_select_chat_loads_and_scrolls_bottom() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();

        assert_eq!(thread.phase(), ThreadPhase::Empty);
        sel.select_chat(Some("a"));
        let sync = thread.sync(&sel, &mut surface, t0);
        let req = sync.request.unwrap();
        assert_eq!(req.chat_id, "a");
        assert_eq!(thread.phase(), ThreadPhase::Loading);

        let consumed = thread.apply_messages(&req, ok(&["m1", "m2"]), &mut surface, t0);
        assert!(consumed.is_empty());
        assert_eq!(thread.phase(), ThreadPhase::Loaded);
        assert_eq!(surface.ids, vec!["m1", "m2"]);
        assert_eq!(surface.group_count, 1);
        assert_eq!(surface.scrolls, vec!["bottom"]);
        assert!(thread.flashing().is_none());
    }

    #[test]
    fn test_deselect_goes_empty() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();
        sel.select_chat(Some("a"));
        let req = thread.sync(&sel, &mut surface, t0).request.unwrap();
        thread.apply_messages(&req, ok(&["m1"]), &mut surface, t0);

        sel.select_chat(None);
        let sync = thread.sync(&sel, &mut surface, t0);
        assert!(sync.request.is_none());
        assert_eq!(thread.phase(), ThreadPhase::Empty);
        assert!(thread.messages().is_empty());
        assert!(surface.ids.is_empty());
    }

    #[test]
    fn test_chat_switch_race_discards_stale_response() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();

        sel.select_chat(Some("a"));
        let req_a = thread.sync(&sel, &mut surface, t0).request.unwrap();
        sel.select_chat(Some("b"));
        let req_b = thread.sync(&sel, &mut surface, t0).request.unwrap();

        // B answers first, A straggles in afterwards.
        thread.apply_messages(&req_b, ok(&["b1"]), &mut surface, t0);
        thread.apply_messages(&req_a, ok(&["a1", "a2"]), &mut surface, t0);
        assert_eq!(thread.chat_id(), Some("b"));
        assert_eq!(surface.ids, vec!["b1"]);

        // A answering before B is ignored too; B is still loading.
        let mut thread = MessageThreadController::default();
        sel.select_chat(Some("a"));
        let req_a = thread.sync(&sel, &mut surface, t0).request.unwrap();
        sel.select_chat(Some("b"));
        let _req_b = thread.sync(&sel, &mut surface, t0).request.unwrap();
        thread.apply_messages(&req_a, ok(&["a1"]), &mut surface, t0);
        assert_eq!(thread.phase(), ThreadPhase::Loading);
        assert!(thread.messages().is_empty());
    }

    #[test]
    fn test_reselecting_same_chat_after_switch_uses_new_generation() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();

        sel.select_chat(Some("a"));
        let first = thread.sync(&sel, &mut surface, t0).request.unwrap();
        sel.select_chat(Some("b"));
        thread.sync(&sel, &mut surface, t0);
        sel.select_chat(Some("a"));
        let third = thread.sync(&sel, &mut surface, t0).request.unwrap();

        assert_ne!(first.generation, third.generation);
        thread.apply_messages(&first, ok(&["old"]), &mut surface, t0);
        assert_eq!(thread.phase(), ThreadPhase::Loading);
        thread.apply_messages(&third, ok(&["new"]), &mut surface, t0);
        assert_eq!(surface.ids, vec!["new"]);
    }

    #[test]
    fn test_failed_fetch_is_empty_thread() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();
        sel.select_chat(Some("a"));
        let req = thread.sync(&sel, &mut surface, t0).request.unwrap();

        thread.apply_messages(&req, Err::<Vec<Message>, _>("boom"), &mut surface, t0);
        assert_eq!(thread.phase(), ThreadPhase::Loaded);
        assert!(thread.messages().is_empty());
        assert_eq!(surface.scrolls, vec!["bottom"]);
    }

    #[test]
    fn test_highlight_found_flashes_then_consumes_once() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();

        let seq = sel.jump_to("a", "m2");
        let req = thread.sync(&sel, &mut surface, t0).request.unwrap();
        let consumed = thread.apply_messages(&req, ok(&["m1", "m2", "m3"]), &mut surface, t0);

        assert!(consumed.is_empty());
        assert_eq!(surface.scrolls, vec!["Center:1"]);
        assert_eq!(thread.flashing(), Some("m2"));
        assert_eq!(thread.next_deadline(), Some(t0 + DEFAULT_FLASH));

        // Re-syncing with the same request does not restart it.
        let again = thread.sync(&sel, &mut surface, t0 + Duration::from_millis(500));
        assert!(again.consumed.is_empty());
        assert_eq!(surface.scrolls.len(), 1);

        assert!(thread.tick(t0 + Duration::from_millis(1999)).is_empty());
        assert_eq!(thread.tick(t0 + DEFAULT_FLASH), vec![seq]);
        assert!(thread.flashing().is_none());
        assert!(thread.tick(t0 + Duration::from_secs(10)).is_empty());

        assert!(sel.consume_highlight(seq));
        let after = thread.sync(&sel, &mut surface, t0 + Duration::from_secs(3));
        assert_eq!(after, ThreadSync::default());
    }

    #[test]
    fn test_highlight_missing_consumes_immediately() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();

        let seq = sel.jump_to("a", "gone");
        let req = thread.sync(&sel, &mut surface, t0).request.unwrap();
        let consumed = thread.apply_messages(&req, ok(&["m1"]), &mut surface, t0);

        assert_eq!(consumed, vec![seq]);
        assert!(thread.flashing().is_none());
        assert!(surface.scrolls.is_empty());
        assert!(thread.tick(t0 + DEFAULT_FLASH).is_empty());
    }

    #[test]
    fn test_highlight_in_loaded_thread_resolves_on_sync() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();
        sel.select_chat(Some("a"));
        let req = thread.sync(&sel, &mut surface, t0).request.unwrap();
        thread.apply_messages(&req, ok(&["m1", "m2"]), &mut surface, t0);

        let seq = sel.jump_to("a", "m1");
        let sync = thread.sync(&sel, &mut surface, t0);
        assert!(sync.request.is_none());
        assert!(sync.consumed.is_empty());
        assert_eq!(thread.flashing(), Some("m1"));
        assert_eq!(surface.scrolls, vec!["bottom", "Center:0"]);

        // A second jump replaces the running flash and finishes the first.
        let next = sel.jump_to("a", "m2");
        let sync = thread.sync(&sel, &mut surface, t0);
        assert_eq!(sync.consumed, vec![seq]);
        assert_eq!(thread.flashing(), Some("m2"));
        assert_eq!(thread.tick(t0 + DEFAULT_FLASH), vec![next]);
    }

    #[test]
    fn test_switching_chat_finishes_flash_and_pending() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();

        let flashed = sel.jump_to("a", "m1");
        let req = thread.sync(&sel, &mut surface, t0).request.unwrap();
        thread.apply_messages(&req, ok(&["m1"]), &mut surface, t0);
        assert_eq!(thread.flashing(), Some("m1"));

        sel.select_chat(Some("b"));
        let sync = thread.sync(&sel, &mut surface, t0);
        assert_eq!(sync.consumed, vec![flashed]);
        assert!(thread.flashing().is_none());

        // Pending while loading, then superseded by a plain selection.
        let pending = sel.jump_to("c", "m9");
        thread.sync(&sel, &mut surface, t0);
        sel.select_chat(Some("d"));
        let sync = thread.sync(&sel, &mut surface, t0);
        assert_eq!(sync.consumed, vec![pending]);
        assert!(thread.tick(t0 + DEFAULT_FLASH).is_empty());
    }

    #[test]
    fn test_every_highlight_consumed_exactly_once() {
        let t0 = Instant::now();
        let mut thread = MessageThreadController::default();
        let mut surface = FakeSurface::default();
        let mut sel = ViewSelection::new();
        let mut issued = Vec::new();
        let mut consumed = Vec::new();

        // Present target, missing target, and a jump abandoned mid-load.
        for (chat, target) in [("a", "m1"), ("a", "zz"), ("b", "m1"), ("c", "m1")] {
            issued.push(sel.jump_to(chat, target));
            let sync = thread.sync(&sel, &mut surface, t0);
            consumed.extend(sync.consumed);
            if chat == "b" {
                continue;
            }
            if let Some(req) = sync.request {
                consumed.extend(thread.apply_messages(&req, ok(&["m1"]), &mut surface, t0));
            }
        }
        consumed.extend(thread.tick(t0 + DEFAULT_FLASH));

        consumed.sort_unstable();
        assert_eq!(consumed, issued);
    }
}
