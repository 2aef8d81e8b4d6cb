use serde::Deserialize;

/// Whole export as written by the exporter. Only the fields the browser
/// needs are mapped; everything else in the file is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    #[serde(default)]
    pub chats: Vec<Chat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub chat_type: Option<String>,
    #[serde(default)]
    pub members: Vec<Participant>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Chat member or message author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Direct,
    Group,
}

impl ChatKind {
    pub fn from_chat_type(chat_type: Option<&str>) -> Self {
        match chat_type {
            Some(t) if t.eq_ignore_ascii_case("group") => ChatKind::Group,
            _ => ChatKind::Direct,
        }
    }
}

/// Lightweight chat entry shown in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: String,
    pub name: Option<String>,
    pub last_message_at: Option<String>,
    pub member_count: usize,
    pub kind: ChatKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default, rename = "createdDateTime")]
    pub created_at: String,
    #[serde(default)]
    pub from: Option<Participant>,
    #[serde(default, rename = "deletedDateTime")]
    pub deleted_at: Option<String>,
    #[serde(default, rename = "lastEditedDateTime")]
    pub edited_at: Option<String>,
    #[serde(default)]
    pub is_from_me: bool,
    #[serde(default)]
    pub body: Option<Body>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub system_event: Option<SystemEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_processed: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SystemEvent {
    #[serde(default, rename = "@odata.type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Message {
    pub fn sender_name(&self) -> Option<&str> {
        self.from
            .as_ref()
            .and_then(|f| f.display_name.as_deref())
            .filter(|n| !n.is_empty())
    }

    /// Body text, processed content first. Empty when neither is present.
    pub fn body_text(&self) -> &str {
        let Some(body) = self.body.as_ref() else {
            return "";
        };
        body.content_processed
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(body.content.as_deref())
            .unwrap_or("")
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    pub fn is_system(&self) -> bool {
        if self.system_event.is_some() {
            return true;
        }
        let kind = self
            .message_type
            .as_deref()
            .unwrap_or("")
            .to_lowercase();
        kind.contains("event") || kind.contains("system") || kind == "unknownfuturemessagetype"
    }
}

/// One hit returned by the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub chat_id: String,
    pub chat_name: Option<String>,
    pub message_id: String,
    pub snippet: String,
    pub sender: Option<String>,
    pub created_at: String,
}
