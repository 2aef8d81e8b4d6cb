use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::formatting::plain_text;
use crate::model::{ChatKind, ChatSummary, Export, Message, SearchHit};

const MAX_SNIPPET_CHARS: usize = 120;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no chats found in export file")]
    NoChats,
    #[error("no export loaded")]
    NotLoaded,
    #[error("a newer export was opened")]
    Superseded,
    #[error("export was replaced")]
    Replaced,
}

/// Export currently installed, tagged with the open request that loaded it.
struct Loaded {
    generation: u64,
    export: Export,
}

/// In-memory chat export shared between the UI loop and spawned lookups.
#[derive(Clone, Default)]
pub struct ExportStore {
    loaded: Arc<RwLock<Option<Loaded>>>,
}

impl ExportStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_export(export: Export) -> Self {
        Self {
            loaded: Arc::new(RwLock::new(Some(Loaded {
                generation: 0,
                export,
            }))),
        }
    }

    /// Install the export at `path` as `generation` and return its chat
    /// summaries. The previous export stays in place when the file fails to
    /// load or a newer generation is already installed.
    pub async fn load_file(
        &self,
        path: &Path,
        generation: u64,
    ) -> Result<Vec<ChatSummary>, StoreError> {
        let data = tokio::fs::read(path).await?;
        let export: Export = serde_json::from_slice(&data)?;
        if export.chats.is_empty() {
            return Err(StoreError::NoChats);
        }

        let mut guard = self.loaded.write().await;
        if guard.as_ref().is_some_and(|l| l.generation > generation) {
            crate::debug_log!("Not installing {} (generation {})", path.display(), generation);
            return Err(StoreError::Superseded);
        }
        crate::info_log!(
            "Loaded export {} with {} chats",
            path.display(),
            export.chats.len()
        );
        let summaries = summarize(&export);
        *guard = Some(Loaded { generation, export });
        Ok(summaries)
    }

    /// Messages for one chat in file order. Unknown ids yield an empty list.
    pub async fn list_messages(
        &self,
        generation: u64,
        chat_id: &str,
    ) -> Result<Vec<Message>, StoreError> {
        let guard = self.loaded.read().await;
        let export = current(guard.as_ref(), generation)?;

        Ok(export
            .chats
            .iter()
            .find(|c| c.id == chat_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default())
    }

    /// Case-insensitive substring search over message bodies, sender names
    /// and chat names, in chat order, capped at `limit` hits.
    pub async fn search(
        &self,
        generation: u64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let guard = self.loaded.read().await;
        if guard.is_none() || query.is_empty() {
            return Ok(Vec::new());
        }
        let export = current(guard.as_ref(), generation)?;

        let needle = query.to_lowercase();
        let mut hits = Vec::new();

        for chat in &export.chats {
            let chat_name = chat.name.as_deref().unwrap_or("");
            for msg in &chat.messages {
                if hits.len() >= limit {
                    return Ok(hits);
                }
                let Some(snippet) = match_message(msg, chat_name, &needle) else {
                    continue;
                };
                hits.push(SearchHit {
                    chat_id: chat.id.clone(),
                    chat_name: chat.name.clone().filter(|n| !n.is_empty()),
                    message_id: msg.id.clone(),
                    snippet,
                    sender: msg.sender_name().map(str::to_string),
                    created_at: msg.created_at.clone(),
                });
            }
        }

        Ok(hits)
    }
}

/// The installed export, if it is the one `generation` refers to.
fn current(loaded: Option<&Loaded>, generation: u64) -> Result<&Export, StoreError> {
    match loaded {
        None => Err(StoreError::NotLoaded),
        Some(l) if l.generation != generation => Err(StoreError::Replaced),
        Some(l) => Ok(&l.export),
    }
}

/// Chat summaries, most recent activity first.
pub fn summarize(export: &Export) -> Vec<ChatSummary> {
    let mut summaries: Vec<ChatSummary> = export
        .chats
        .iter()
        .map(|chat| ChatSummary {
            id: chat.id.clone(),
            name: chat.name.clone().filter(|n| !n.is_empty()),
            last_message_at: chat.messages.last().map(|m| m.created_at.clone()),
            member_count: chat.members.len(),
            kind: ChatKind::from_chat_type(chat.chat_type.as_deref()),
        })
        .collect();

    // Stable sort keeps file order among chats with equal timestamps.
    summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
    summaries
}

fn match_message(msg: &Message, chat_name: &str, needle: &str) -> Option<String> {
    let body = msg.body_text();
    if body.to_lowercase().contains(needle) {
        return Some(extract_snippet(body, Some(needle)));
    }
    let sender = msg.sender_name().unwrap_or("").to_lowercase();
    if sender.contains(needle) || chat_name.to_lowercase().contains(needle) {
        return Some(extract_snippet(body, None));
    }
    None
}

/// Plain-text window of `body` around the first match of `needle`, with an
/// ellipsis on each clipped side.
fn extract_snippet(body: &str, needle: Option<&str>) -> String {
    let plain = plain_text(body);
    let chars: Vec<char> = plain.chars().collect();
    if chars.len() <= MAX_SNIPPET_CHARS {
        return plain;
    }

    let match_at = needle
        .and_then(|n| {
            let lower = plain.to_lowercase();
            lower.find(n).map(|byte_idx| lower[..byte_idx].chars().count())
        })
        .unwrap_or(0)
        .min(chars.len() - 1);

    let mut start = match_at.saturating_sub(MAX_SNIPPET_CHARS / 2);
    let mut end = start + MAX_SNIPPET_CHARS;
    if end > chars.len() {
        end = chars.len();
        start = end.saturating_sub(MAX_SNIPPET_CHARS);
    }

    let mut snippet: String = chars[start..end].iter().collect();
    if start > 0 {
        snippet.insert(0, '…');
    }
    if end < chars.len() {
        snippet.push('…');
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{fixtures, Chat, Participant};
    use std::io::Write;

    fn sample_export() -> Export {
        Export {
            chats: vec![
                Chat {
                    id: "1".to_string(),
                    name: Some("Alice".to_string()),
                    chat_type: Some("oneOnOne".to_string()),
                    members: vec![Participant::default(), Participant::default()],
                    messages: vec![
                        fixtures::message("m1", "2026-10-17T10:00:00Z", "<p>Planning the meeting</p>"),
                        fixtures::message("m2", "2026-10-18T10:00:00Z", "see you"),
                    ],
                },
                Chat {
                    id: "2".to_string(),
                    name: Some("Team".to_string()),
                    chat_type: Some("group".to_string()),
                    members: vec![Participant::default(); 5],
                    messages: vec![fixtures::message(
                        "m3",
                        "2026-10-19T08:00:00Z",
                        "Meeting moved to 3pm",
                    )],
                },
                Chat {
                    id: "3".to_string(),
                    name: None,
                    chat_type: None,
                    members: Vec::new(),
                    messages: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn test_summaries_most_recent_first() {
        let chats = summarize(&sample_export());
        let ids: Vec<&str> = chats.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        assert_eq!(chats[0].kind, ChatKind::Group);
        assert_eq!(chats[0].member_count, 5);
        assert_eq!(chats[1].last_message_at.as_deref(), Some("2026-10-18T10:00:00Z"));
        assert!(chats[2].last_message_at.is_none());
    }

    #[tokio::test]
    async fn test_list_messages_unknown_chat_is_empty() {
        let store = ExportStore::from_export(sample_export());
        assert_eq!(store.list_messages(0, "1").await.unwrap().len(), 2);
        assert!(store.list_messages(0, "nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_loaded() {
        let store = ExportStore::new();
        assert!(matches!(
            store.list_messages(0, "1").await,
            Err(StoreError::NotLoaded)
        ));
        assert!(store.search(0, "x", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_case_insensitive_in_chat_order() {
        let store = ExportStore::from_export(sample_export());
        let hits = store.search(0, "meeting", 200).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].message_id, "m1");
        assert_eq!(hits[0].snippet, "Planning the meeting");
        assert_eq!(hits[1].chat_id, "2");
        assert_eq!(hits[1].sender.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_search_matches_chat_name_and_respects_limit() {
        let store = ExportStore::from_export(sample_export());
        let hits = store.search(0, "team", 200).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message_id, "m3");

        let hits = store.search(0, "alice", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(store.search(0, "", 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_snippet_windows_long_bodies() {
        let body = format!("{} needle {}", "a ".repeat(100), "b ".repeat(100));
        let snippet = extract_snippet(&body, Some("needle"));
        assert!(snippet.starts_with('…'));
        assert!(snippet.ends_with('…'));
        assert!(snippet.contains("needle"));
        assert_eq!(snippet.chars().count(), MAX_SNIPPET_CHARS + 2);
    }

    #[tokio::test]
    async fn test_load_file_errors() {
        let store = ExportStore::new();
        let missing = store.load_file(Path::new("/definitely/not/here.json"), 1).await;
        assert!(matches!(missing, Err(StoreError::Io(_))));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "{{not json").unwrap();
        assert!(matches!(store.load_file(bad.path(), 2).await, Err(StoreError::Json(_))));

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, r#"{{"chats": []}}"#).unwrap();
        assert!(matches!(store.load_file(empty.path(), 3).await, Err(StoreError::NoChats)));
        assert!(matches!(
            store.list_messages(3, "c1").await,
            Err(StoreError::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn test_load_file_replaces_export() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"chats":[{{"id":"c1","name":"Alice","chatType":"oneOnOne","messages":[{{"id":"m1","createdDateTime":"2026-10-19T08:00:00Z"}}]}}]}}"#
        )
        .unwrap();

        let store = ExportStore::from_export(sample_export());
        let chats = store.load_file(file.path(), 1).await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].name.as_deref(), Some("Alice"));
        assert_eq!(store.list_messages(1, "c1").await.unwrap().len(), 1);

        // Lookups stamped with the previous export are refused.
        assert!(matches!(
            store.list_messages(0, "1").await,
            Err(StoreError::Replaced)
        ));
        assert!(matches!(
            store.search(0, "meeting", 10).await,
            Err(StoreError::Replaced)
        ));
    }

    #[tokio::test]
    async fn test_older_open_does_not_replace_newer() {
        let mut older = tempfile::NamedTempFile::new().unwrap();
        write!(older, r#"{{"chats":[{{"id":"a1","name":"Older"}}]}}"#).unwrap();
        let mut newer = tempfile::NamedTempFile::new().unwrap();
        write!(newer, r#"{{"chats":[{{"id":"b1","name":"Newer"}}]}}"#).unwrap();

        let store = ExportStore::new();
        store.load_file(newer.path(), 2).await.unwrap();
        assert!(matches!(
            store.load_file(older.path(), 1).await,
            Err(StoreError::Superseded)
        ));
        assert!(store.list_messages(2, "b1").await.unwrap().is_empty());
        assert!(matches!(
            store.list_messages(1, "a1").await,
            Err(StoreError::Replaced)
        ));
    }
}
