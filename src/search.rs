use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::model::SearchHit;
use crate::selection::{step_index, Direction};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Query is empty.
    Idle,
    /// Waiting for typing to settle.
    Debouncing,
    /// A committed request has not answered yet.
    Searching,
    Results,
}

/// A committed query ready to be sent to the search service. The
/// generation ties the eventual response back to this commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub generation: u64,
    pub query: String,
}

/// Search box state: debounced dispatch, versioned results and the dropdown.
#[derive(Debug)]
pub struct SearchController {
    debounce: Duration,
    raw_query: String,
    committed_query: String,
    results: Vec<SearchHit>,
    active: Option<usize>,
    dropdown_open: bool,
    focused: bool,
    deadline: Option<Instant>,
    generation: u64,
    in_flight: Option<u64>,
}

impl SearchController {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            raw_query: String::new(),
            committed_query: String::new(),
            results: Vec::new(),
            active: None,
            dropdown_open: false,
            focused: false,
            deadline: None,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.raw_query
    }

    pub fn committed_query(&self) -> &str {
        &self.committed_query
    }

    pub fn results(&self) -> &[SearchHit] {
        &self.results
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn is_dropdown_open(&self) -> bool {
        self.dropdown_open
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_query(&self) -> bool {
        !self.raw_query.trim().is_empty()
    }

    pub fn phase(&self) -> SearchPhase {
        if !self.has_query() {
            SearchPhase::Idle
        } else if self.deadline.is_some() {
            SearchPhase::Debouncing
        } else if self.in_flight.is_some() {
            SearchPhase::Searching
        } else {
            SearchPhase::Results
        }
    }

    /// When the pending debounce timer fires, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Replace the input text. A blank query resets the session at once;
    /// anything else restarts the debounce timer.
    pub fn set_query(&mut self, query: &str, now: Instant) {
        self.raw_query = query.to_string();
        if self.has_query() {
            self.deadline = Some(now + self.debounce);
        } else {
            self.reset();
        }
    }

    pub fn push_char(&mut self, c: char, now: Instant) {
        let mut query = std::mem::take(&mut self.raw_query);
        query.push(c);
        self.set_query(&query, now);
    }

    pub fn pop_char(&mut self, now: Instant) {
        let mut query = std::mem::take(&mut self.raw_query);
        query.pop();
        self.set_query(&query, now);
    }

    /// Explicit clear action.
    pub fn clear(&mut self) {
        self.raw_query.clear();
        self.reset();
    }

    fn reset(&mut self) {
        if self.deadline.is_some() || self.in_flight.is_some() {
            crate::debug_log!("search: reset, dropping pending work");
        }
        self.committed_query.clear();
        self.results.clear();
        self.active = None;
        self.dropdown_open = false;
        self.deadline = None;
        self.in_flight = None;
        // Anything still in flight now answers an outdated generation.
        self.generation += 1;
    }

    /// Fire the debounce timer if it is due, committing the trimmed query.
    pub fn tick(&mut self, now: Instant) -> Option<SearchRequest> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;

        let query = self.raw_query.trim().to_string();
        if query.is_empty() {
            return None;
        }

        self.generation += 1;
        self.committed_query = query.clone();
        self.in_flight = Some(self.generation);
        crate::debug_log!("search: commit {:?} (generation {})", query, self.generation);
        Some(SearchRequest {
            generation: self.generation,
            query,
        })
    }

    /// Apply a service response. Responses for anything but the current
    /// commit are dropped; failures count as an empty result.
    pub fn apply_results<E: Display>(
        &mut self,
        request: &SearchRequest,
        result: Result<Vec<SearchHit>, E>,
    ) -> bool {
        if request.generation != self.generation || request.query != self.committed_query {
            crate::debug_log!(
                "search: discarding stale response for {:?} (generation {}, current {})",
                request.query,
                request.generation,
                self.generation
            );
            return false;
        }

        self.results = result.unwrap_or_else(|e| {
            crate::warn_log!("search: {:?} failed: {}", request.query, e);
            Vec::new()
        });
        self.active = None;
        self.dropdown_open = true;
        self.in_flight = None;
        true
    }

    /// Input gained focus. Reopens the dropdown over existing results.
    pub fn focus(&mut self) {
        self.focused = true;
        if self.has_query() && !self.results.is_empty() {
            self.dropdown_open = true;
        }
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Dismiss key.
    pub fn dismiss(&mut self) {
        self.dropdown_open = false;
    }

    /// Pointer interaction somewhere other than the search surface.
    pub fn pointer_outside(&mut self) {
        self.dropdown_open = false;
    }

    /// Keyboard movement inside the open dropdown.
    pub fn move_active(&mut self, direction: Direction) -> Option<usize> {
        if !self.dropdown_open || self.results.is_empty() {
            return None;
        }
        self.active = step_index(self.active, self.results.len(), direction);
        self.active
    }

    /// Commit the keyboard-highlighted hit, if there is one.
    pub fn select_active(&mut self) -> Option<SearchHit> {
        if !self.dropdown_open {
            return None;
        }
        let index = self.active?;
        self.select(index)
    }

    /// Commit the hit at `index`. Closes the dropdown and drops focus.
    pub fn select(&mut self, index: usize) -> Option<SearchHit> {
        let hit = self.results.get(index)?.clone();
        self.dropdown_open = false;
        self.focused = false;
        Some(hit)
    }
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
