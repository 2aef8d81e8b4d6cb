use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::chat_list::ChatListController;
use crate::config::Config;
use crate::formatting::{
    chat_label, format_chat_date, format_result_date, result_count_label, truncate_to_width,
    UNKNOWN_SENDER,
};
use crate::model::{ChatKind, ChatSummary, Message, SearchHit};
use crate::search::{SearchController, SearchPhase, SearchRequest};
use crate::selection::{Direction, RenderTargets, ScrollAlign, ViewSelection};
use crate::store::{ExportStore, StoreError};
use crate::thread::{MessageThreadController, ThreadPhase, ThreadRequest};
use crate::widgets::{LineKind, ListViewport, ThreadPane, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Search,
    ChatList,
    Thread,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Search => Focus::ChatList,
            Focus::ChatList => Focus::Thread,
            Focus::Thread => Focus::Search,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Search => Focus::Thread,
            Focus::ChatList => Focus::Search,
            Focus::Thread => Focus::ChatList,
        }
    }
}

/// Open of an export file, stamped with its place in the sequence of opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub generation: u64,
    pub path: PathBuf,
}

/// Work the UI loop hands to the store. Each request carries the stamp the
/// answer is checked against; lookups also carry the export they were made
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Search { export: u64, request: SearchRequest },
    Thread { export: u64, request: ThreadRequest },
    OpenFile(OpenRequest),
}

#[derive(Debug)]
pub enum Response {
    Search {
        export: u64,
        request: SearchRequest,
        result: Result<Vec<SearchHit>, StoreError>,
    },
    Thread {
        export: u64,
        request: ThreadRequest,
        result: Result<Vec<Message>, StoreError>,
    },
    FileOpened(OpenRequest, Result<Vec<ChatSummary>, StoreError>),
}

/// Run one request against the store.
pub async fn execute(store: ExportStore, request: Request, search_limit: usize) -> Response {
    match request {
        Request::Search { export, request } => {
            let result = store.search(export, &request.query, search_limit).await;
            Response::Search {
                export,
                request,
                result,
            }
        }
        Request::Thread { export, request } => {
            let result = store.list_messages(export, &request.chat_id).await;
            Response::Thread {
                export,
                request,
                result,
            }
        }
        Request::OpenFile(request) => {
            let result = store.load_file(&request.path, request.generation).await;
            Response::FileOpened(request, result)
        }
    }
}

pub struct App {
    pub config: Config,
    pub store: ExportStore,
    pub chats: Vec<ChatSummary>,
    pub selection: ViewSelection,
    pub chat_list: ChatListController,
    pub search: SearchController,
    pub thread: MessageThreadController,
    pub chat_list_view: ListViewport,
    pub thread_pane: ThreadPane,
    pub results_view: Viewport,
    pub focus: Focus,
    pub file_path: Option<PathBuf>,
    pub opening_file: Option<PathBuf>,
    pub path_prompt: Option<String>,
    pub status_message: Option<String>, // Notification bar at bottom
    pub status_expire: Option<Instant>,
    pub needs_redraw: bool,
    pub should_quit: bool,
    outbox: Vec<Request>,
    // Latest open requested, and the open whose export is on screen
    open_generation: u64,
    export_generation: u64,
    // Screen areas from the last draw, for mouse handling
    search_area: Option<Rect>,
    dropdown_area: Option<Rect>,
    chat_list_area: Option<Rect>,
    thread_area: Option<Rect>,
}

impl App {
    pub fn new(config: Config, store: ExportStore) -> Self {
        let search = SearchController::new(config.settings.search_debounce());
        let thread = MessageThreadController::new(config.settings.highlight_flash());
        Self {
            config,
            store,
            chats: Vec::new(),
            selection: ViewSelection::new(),
            chat_list: ChatListController::new(),
            search,
            thread,
            chat_list_view: ListViewport::default(),
            thread_pane: ThreadPane::new(),
            results_view: Viewport::new(0),
            focus: Focus::ChatList,
            file_path: None,
            opening_file: None,
            path_prompt: None,
            status_message: None,
            status_expire: None,
            needs_redraw: true,
            should_quit: false,
            outbox: Vec::new(),
            open_generation: 0,
            export_generation: 0,
            search_area: None,
            dropdown_area: None,
            chat_list_area: None,
            thread_area: None,
        }
    }

    pub fn search_limit(&self) -> usize {
        self.config.settings.search_result_limit
    }

    /// Requests queued since the last call, in the order they were made.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    pub fn is_loading_file(&self) -> bool {
        self.opening_file.is_some()
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_searching()
    }

    pub fn is_loading_thread(&self) -> bool {
        self.thread.is_loading()
    }

    pub fn open_file(&mut self, path: PathBuf) {
        crate::info_log!("Opening {}", path.display());
        self.open_generation += 1;
        self.opening_file = Some(path.clone());
        self.outbox.push(Request::OpenFile(OpenRequest {
            generation: self.open_generation,
            path,
        }));
        self.needs_redraw = true;
    }

    /// Show a status notification that auto-expires
    pub fn notify(&mut self, message: &str, duration: Duration, now: Instant) {
        self.status_message = Some(message.to_string());
        self.status_expire = Some(now + duration);
        self.needs_redraw = true;
    }

    /// Earliest moment something time-driven is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.search.next_deadline(),
            self.thread.next_deadline(),
            self.status_expire,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Fire whatever timers are due at `now`.
    pub fn tick(&mut self, now: Instant) {
        if let Some(request) = self.search.tick(now) {
            self.outbox.push(Request::Search {
                export: self.export_generation,
                request,
            });
            self.needs_redraw = true;
        }

        let consumed = self.thread.tick(now);
        if !consumed.is_empty() {
            self.consume_highlights(consumed);
            self.needs_redraw = true;
        }

        if self.status_expire.is_some_and(|expire| now >= expire) {
            self.status_message = None;
            self.status_expire = None;
            self.needs_redraw = true;
        }
    }

    pub fn apply_response(&mut self, response: Response, now: Instant) {
        self.needs_redraw = true;
        match response {
            Response::Search {
                export,
                request,
                result,
            } => {
                if self.is_other_export(export, &result) {
                    return;
                }
                if self.search.apply_results(&request, result) {
                    self.results_view.offset = 0;
                    self.results_view.len = self.search.results().len();
                }
            }
            Response::Thread {
                export,
                request,
                result,
            } => {
                if self.is_other_export(export, &result) {
                    return;
                }
                let consumed =
                    self.thread
                        .apply_messages(&request, result, &mut self.thread_pane, now);
                self.consume_highlights(consumed);
            }
            Response::FileOpened(request, result) => self.apply_open(request, result, now),
        }
    }

    /// Lookups made against an export other than the one on screen are
    /// dropped; the open that replaced it resets the session anyway.
    fn is_other_export<T>(&self, export: u64, result: &Result<T, StoreError>) -> bool {
        let other = export != self.export_generation
            || matches!(result, Err(StoreError::Replaced));
        if other {
            crate::debug_log!(
                "Dropping lookup for export {} (showing {})",
                export,
                self.export_generation
            );
        }
        other
    }

    /// The screen follows the newest export the store installed. Only the
    /// latest open clears the loading flag or reports a failure.
    fn apply_open(
        &mut self,
        request: OpenRequest,
        result: Result<Vec<ChatSummary>, StoreError>,
        now: Instant,
    ) {
        let latest = request.generation == self.open_generation;
        if latest {
            self.opening_file = None;
        }
        let path = request.path;
        match result {
            Ok(chats) if request.generation > self.export_generation => {
                self.export_generation = request.generation;
                self.replace_chats(path, chats, now);
            }
            Ok(_) => {
                crate::debug_log!("Ignoring superseded open of {}", path.display());
            }
            Err(e) if latest => {
                crate::error_log!("Failed to open {}: {}", path.display(), e);
                let toast = self.config.settings.error_toast();
                self.notify(
                    &format!("Could not open {}: {}", path.display(), e),
                    toast,
                    now,
                );
            }
            Err(e) => {
                crate::warn_log!("Superseded open of {} failed: {}", path.display(), e);
            }
        }
    }

    fn replace_chats(&mut self, path: PathBuf, chats: Vec<ChatSummary>, now: Instant) {
        self.chat_list_view
            .set_ids(chats.iter().map(|c| c.id.clone()).collect());
        self.chat_list_view.viewport.offset = 0;
        self.chats = chats;
        self.chat_list.reset();
        self.selection.clear();
        self.search.clear();
        self.results_view = Viewport::new(0);
        self.after_selection_change(now);

        if let Err(e) = self.config.remember_file(&path) {
            crate::warn_log!("Could not save last file: {}", e);
        }
        self.file_path = Some(path);
    }

    /// Let the list and the thread catch up with the shared selection.
    fn after_selection_change(&mut self, now: Instant) {
        self.chat_list
            .sync_scroll(&self.selection, &mut self.chat_list_view);
        let sync = self.thread.sync(&self.selection, &mut self.thread_pane, now);
        if let Some(request) = sync.request {
            self.outbox.push(Request::Thread {
                export: self.export_generation,
                request,
            });
        }
        self.consume_highlights(sync.consumed);
        self.needs_redraw = true;
    }

    fn consume_highlights(&mut self, seqs: Vec<u64>) {
        for seq in seqs {
            self.selection.consume_highlight(seq);
        }
    }

    fn commit_hit(&mut self, hit: SearchHit, now: Instant) {
        crate::debug_log!("Jump to {} in {}", hit.message_id, hit.chat_id);
        self.selection.jump_to(&hit.chat_id, &hit.message_id);
        self.set_focus(Focus::Thread);
        self.after_selection_change(now);
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        if focus == Focus::Search {
            self.search.focus();
        } else {
            self.search.blur();
            self.search.dismiss();
        }
        self.needs_redraw = true;
    }

    fn move_chat(&mut self, direction: Direction, now: Instant) {
        if self
            .chat_list
            .move_selection(&mut self.selection, direction, &self.chats)
            .is_some()
        {
            self.after_selection_change(now);
        }
    }

    fn thread_page(&self) -> usize {
        self.thread_pane.viewport.height.saturating_sub(1).max(1)
    }

    // =========================================================================
    // Input handling
    // =========================================================================

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        self.needs_redraw = true;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('q') {
            self.should_quit = true;
            return;
        }
        if self.path_prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }

        match key.code {
            // Ctrl+O: Open file
            KeyCode::Char('o') if ctrl => {
                let current = self
                    .file_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                self.path_prompt = Some(current);
            }
            KeyCode::Tab => self.set_focus(self.focus.next()),
            KeyCode::BackTab => self.set_focus(self.focus.prev()),
            _ => match self.focus {
                Focus::Search => self.handle_search_key(key, now),
                Focus::ChatList => self.handle_chat_list_key(key, now),
                Focus::Thread => self.handle_thread_key(key),
            },
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(buffer) = self.path_prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => buffer.push(c),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Enter => {
                let path = buffer.trim().to_string();
                self.path_prompt = None;
                if !path.is_empty() {
                    self.open_file(PathBuf::from(path));
                }
            }
            KeyCode::Esc => self.path_prompt = None,
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            // Ctrl+U: Clear query
            KeyCode::Char('u') if ctrl => self.search.clear(),
            KeyCode::Char(c) if !ctrl => self.search.push_char(c, now),
            KeyCode::Backspace => self.search.pop_char(now),
            KeyCode::Down => {
                self.search.move_active(Direction::Next);
            }
            KeyCode::Up => {
                self.search.move_active(Direction::Previous);
            }
            KeyCode::Enter => {
                if let Some(hit) = self.search.select_active() {
                    self.commit_hit(hit, now);
                }
            }
            KeyCode::Esc => {
                if self.search.is_dropdown_open() {
                    self.search.dismiss();
                } else {
                    self.set_focus(Focus::ChatList);
                }
            }
            _ => {}
        }
        if let Some(active) = self.search.active_index() {
            self.results_view.reveal(active, ScrollAlign::Nearest);
        }
    }

    fn handle_chat_list_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_chat(Direction::Previous, now),
            KeyCode::Down | KeyCode::Char('j') => self.move_chat(Direction::Next, now),
            KeyCode::Home => self.move_chat(Direction::First, now),
            KeyCode::End => self.move_chat(Direction::Last, now),
            KeyCode::Enter => self.set_focus(Focus::Thread),
            KeyCode::Char('/') => self.set_focus(Focus::Search),
            _ => {}
        }
    }

    fn handle_thread_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.thread_pane.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.thread_pane.scroll_down(1),
            KeyCode::PageUp => self.thread_pane.scroll_up(self.thread_page()),
            KeyCode::PageDown => self.thread_pane.scroll_down(self.thread_page()),
            KeyCode::End => self.thread_pane.scroll_to_bottom(),
            KeyCode::Char('/') => self.set_focus(Focus::Search),
            KeyCode::Esc => self.set_focus(Focus::ChatList),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        let (x, y) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.needs_redraw = true;
                if self.search.is_dropdown_open() && contains(self.dropdown_area, x, y) {
                    self.handle_dropdown_click(y, now);
                    return;
                }
                if contains(self.search_area, x, y) {
                    self.set_focus(Focus::Search);
                    return;
                }

                self.search.pointer_outside();
                if let Some(area) = self.chat_list_area.filter(|a| hit_test(*a, x, y)) {
                    self.handle_chat_list_click(y, area, now);
                } else if contains(self.thread_area, x, y) {
                    self.set_focus(Focus::Thread);
                }
            }
            MouseEventKind::ScrollUp if contains(self.thread_area, x, y) => {
                self.thread_pane.scroll_up(3);
                self.needs_redraw = true;
            }
            MouseEventKind::ScrollDown if contains(self.thread_area, x, y) => {
                self.thread_pane.scroll_down(3);
                self.needs_redraw = true;
            }
            _ => {}
        }
    }

    fn handle_chat_list_click(&mut self, y: u16, area: Rect, now: Instant) {
        self.set_focus(Focus::ChatList);
        let inner = self.bordered(Block::default()).inner(area);
        if y < inner.y || y >= inner.y + inner.height {
            return; // Clicked on border
        }
        let Some(chat_id) = self
            .chat_list_view
            .id_at((y - inner.y) as usize)
            .map(str::to_string)
        else {
            return;
        };
        self.chat_list.select_chat(&mut self.selection, &chat_id);
        self.after_selection_change(now);
    }

    fn handle_dropdown_click(&mut self, y: u16, now: Instant) {
        let Some(area) = self.dropdown_area else {
            return;
        };
        let inner = Block::default().borders(Borders::ALL).inner(area);
        // First inner row is the result count
        if y <= inner.y || y >= inner.y + inner.height {
            return;
        }
        let index = self.results_view.offset + (y - inner.y - 1) as usize / 2;
        if let Some(hit) = self.search.select(index) {
            self.commit_hit(hit, now);
        }
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    fn bordered<'a>(&self, block: Block<'a>) -> Block<'a> {
        if self.config.settings.show_borders {
            block.borders(Borders::ALL)
        } else {
            block
        }
    }

    fn focus_style(&self, focus: Focus) -> Style {
        if self.focus == focus {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let has_status = self.status_message.is_some() || self.path_prompt.is_some();
        let main_constraints = if has_status {
            vec![Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)]
        } else {
            vec![Constraint::Length(3), Constraint::Min(0)]
        };

        let outer = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints(main_constraints)
            .split(f.area());

        let total_width = outer[1].width;
        let chat_width = (total_width.saturating_mul(30) / 100).max(16);
        let chunks = Layout::default()
            .direction(LayoutDirection::Horizontal)
            .constraints([Constraint::Length(chat_width), Constraint::Min(0)])
            .split(outer[1]);

        self.search_area = Some(outer[0]);
        self.chat_list_area = Some(chunks[0]);
        self.thread_area = Some(chunks[1]);

        self.draw_search_box(f, outer[0]);
        self.draw_chat_list(f, chunks[0]);
        self.draw_thread(f, chunks[1]);

        if self.search.is_dropdown_open() {
            self.draw_dropdown(f, outer[0], outer[1]);
        } else {
            self.dropdown_area = None;
        }

        if has_status {
            let (text, style) = match (&self.path_prompt, &self.status_message) {
                (Some(buffer), _) => (
                    format!("Open file: {}█", buffer),
                    Style::default().fg(Color::Cyan),
                ),
                (None, Some(msg)) => (
                    msg.clone(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                (None, None) => (String::new(), Style::default()),
            };
            f.render_widget(Paragraph::new(text).style(style), outer[2]);
        }
    }

    fn draw_search_box(&self, f: &mut Frame, area: Rect) {
        let mut title = String::from("Search");
        if self.is_loading_file() {
            title.push_str(" (opening file…)");
        } else if self.is_searching() {
            title.push_str(" (searching…)");
        } else if self.search.phase() == SearchPhase::Results {
            title.push_str(&format!(" ({})", result_count_label(self.search.results().len())));
        }

        let mut text = self.search.query().to_string();
        if self.search.is_focused() {
            text.push('█');
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(self.focus_style(Focus::Search));
        f.render_widget(Paragraph::new(text).block(block), area);
    }

    fn draw_chat_list(&mut self, f: &mut Frame, area: Rect) {
        let block = self
            .bordered(Block::default())
            .title(format!("Chats ({})", self.chats.len()))
            .border_style(self.focus_style(Focus::ChatList));
        let inner = block.inner(area);
        self.chat_list_view.set_height(inner.height as usize);

        let now = Local::now();
        let width = inner.width as usize;
        let selected = self.selection.selected_chat_id();
        let lines: Vec<Line> = self
            .chats
            .get(self.chat_list_view.viewport.visible())
            .unwrap_or_default()
            .iter()
            .map(|chat| {
                let style = if Some(chat.id.as_str()) == selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                chat_list_line(chat, width, style, now)
            })
            .collect();

        let lines = if self.chats.is_empty() {
            let hint = if self.is_loading_file() {
                "Loading…"
            } else {
                "No chats loaded (Ctrl+O to open)"
            };
            vec![Line::styled(hint, Style::default().fg(Color::DarkGray))]
        } else {
            lines
        };
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_thread(&mut self, f: &mut Frame, area: Rect) {
        let chat_name = self
            .selection
            .selected_chat_id()
            .and_then(|id| self.chats.iter().find(|c| c.id == id))
            .and_then(|c| c.name.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or("Chat");
        let mut title = chat_name.to_string();
        let count = self.thread.messages().len();
        if self.thread.phase() == ThreadPhase::Loaded && count > 0 {
            title.push_str(&format!(" · {} messages", count));
        }

        let block = self
            .bordered(Block::default())
            .title(title)
            .border_style(self.focus_style(Focus::Thread));
        let inner = block.inner(area);

        let placeholder = match self.thread.phase() {
            ThreadPhase::Empty => Some("Select a chat to view messages"),
            _ if self.is_loading_thread() => Some("Loading messages…"),
            _ if count == 0 => Some("No messages in this chat."),
            _ => None,
        };
        if let Some(text) = placeholder {
            let p = Paragraph::new(Line::styled(text, Style::default().fg(Color::DarkGray)))
                .block(block);
            f.render_widget(p, area);
            return;
        }

        self.thread_pane
            .resize(inner.width as usize, inner.height as usize);
        let flashing = self.thread.flashing();
        let lines: Vec<Line> = self
            .thread_pane
            .visible_lines()
            .iter()
            .map(|line| {
                let mut style = match line.kind {
                    LineKind::DateHeader => Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                    LineKind::MessageHeader if line.is_from_me => {
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                    }
                    LineKind::MessageHeader => {
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                    }
                    LineKind::Body => Style::default(),
                    LineKind::Deleted | LineKind::System => Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                    LineKind::Attachment => Style::default().fg(Color::Magenta),
                };
                if flashing.is_some() && line.message_id.as_deref() == flashing {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Line::styled(line.text.clone(), style)
            })
            .collect();
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_dropdown(&mut self, f: &mut Frame, search_area: Rect, main_area: Rect) {
        let results = self.search.results();
        let wanted = 3 + 2 * results.len().max(1) as u16;
        let area = Rect {
            x: search_area.x,
            y: main_area.y,
            width: search_area.width,
            height: wanted.min(main_area.height),
        };
        self.dropdown_area = Some(area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));
        let inner = block.inner(area);
        self.results_view.height = (inner.height.saturating_sub(1) / 2) as usize;
        self.results_view.len = results.len();
        if let Some(active) = self.search.active_index() {
            self.results_view.reveal(active, ScrollAlign::Nearest);
        }
        self.results_view.clamp();

        let header = if results.is_empty() {
            format!("No results for \"{}\"", self.search.committed_query())
        } else {
            result_count_label(results.len())
        };
        let mut lines = vec![Line::styled(header, Style::default().fg(Color::DarkGray))];

        let now = Local::now();
        let width = inner.width as usize;
        for idx in self.results_view.visible() {
            let hit = &results[idx];
            let style = if self.search.active_index() == Some(idx) {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let date = format_result_date(&hit.created_at, now);
            let title = format!(
                "{} · {}",
                chat_label(hit.chat_name.as_deref()),
                hit.sender.as_deref().filter(|s| !s.is_empty()).unwrap_or(UNKNOWN_SENDER)
            );
            lines.push(padded_line(&title, &date, width, style.add_modifier(Modifier::BOLD)));
            lines.push(Line::styled(
                truncate_to_width(&format!("  {}", hit.snippet), width),
                style,
            ));
        }

        f.render_widget(Clear, area);
        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}

fn hit_test(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

fn contains(area: Option<Rect>, x: u16, y: u16) -> bool {
    area.is_some_and(|a| hit_test(a, x, y))
}

/// `left` truncated to fit, `right` flush against the right edge.
fn padded_line(left: &str, right: &str, width: usize, style: Style) -> Line<'static> {
    let right_width = right.width();
    let left = truncate_to_width(left, width.saturating_sub(right_width + 1));
    let pad = width.saturating_sub(left.width() + right_width);
    Line::from(vec![
        Span::styled(left, style),
        Span::raw(" ".repeat(pad)),
        Span::styled(right.to_string(), Style::default().fg(Color::DarkGray)),
    ])
}

fn chat_list_line(
    chat: &ChatSummary,
    width: usize,
    style: Style,
    now: chrono::DateTime<Local>,
) -> Line<'static> {
    let mut name = chat_label(chat.name.as_deref()).to_string();
    if chat.kind == ChatKind::Group {
        name.push_str(&format!(" ({})", chat.member_count));
    }
    let date = format_chat_date(chat.last_message_at.as_deref(), now);
    padded_line(&name, &date, width, style)
}
