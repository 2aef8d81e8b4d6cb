use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Local};
use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::date_group::parse_timestamp;
use crate::model::{Attachment, Message};

pub const UNKNOWN_SENDER: &str = "Unknown";
pub const UNNAMED_CHAT: &str = "Unnamed Chat";
pub const DELETED_NOTICE: &str = "This message was deleted.";

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>?").expect("tag pattern is valid"))
}

/// Turn an HTML message body into a single line of plain text.
pub fn plain_text(html: &str) -> String {
    let stripped = tag_regex().replace_all(html, " ");
    collapse_whitespace(&decode_entities(&stripped))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn sender_label(msg: &Message) -> &str {
    msg.sender_name().unwrap_or(UNKNOWN_SENDER)
}

pub fn chat_label(name: Option<&str>) -> &str {
    name.filter(|n| !n.is_empty()).unwrap_or(UNNAMED_CHAT)
}

pub fn attachment_label(att: &Attachment) -> &str {
    att.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Attachment")
}

/// Text shown for a system notice.
pub fn system_text(msg: &Message) -> String {
    if let Some(desc) = msg
        .system_event
        .as_ref()
        .and_then(|e| e.description.as_deref())
        .filter(|d| !d.is_empty())
    {
        return desc.to_string();
    }
    let body = plain_text(msg.body_text());
    if !body.is_empty() {
        return body;
    }
    msg.message_type
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "System event".to_string())
}

/// Clock time of a message, or the raw value when it does not parse.
pub fn format_time(ts: &str) -> String {
    match parse_timestamp(ts) {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => ts.to_string(),
    }
}

/// Last-activity column of the chat list.
pub fn format_chat_date(ts: Option<&str>, now: DateTime<Local>) -> String {
    let Some(ts) = ts else {
        return "No messages".to_string();
    };
    let Some(dt) = parse_timestamp(ts) else {
        return String::new();
    };

    let days = (now - dt).num_days();
    if days == 0 {
        dt.format("%H:%M").to_string()
    } else if days == 1 {
        "Yesterday".to_string()
    } else if (2..7).contains(&days) {
        dt.format("%a").to_string()
    } else if dt.year() == now.year() {
        dt.format("%b %-d").to_string()
    } else {
        dt.format("%b %-d, %Y").to_string()
    }
}

/// Short date shown next to a search hit.
pub fn format_result_date(ts: &str, now: DateTime<Local>) -> String {
    match parse_timestamp(ts) {
        Some(dt) if dt.year() == now.year() => dt.format("%b %-d").to_string(),
        Some(dt) => dt.format("%b %-d, %Y").to_string(),
        None => String::new(),
    }
}

pub fn result_count_label(count: usize) -> String {
    if count == 1 {
        "1 result".to_string()
    } else {
        format!("{} results", count)
    }
}

/// Clip `text` to `width` terminal cells, ending with an ellipsis when cut.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if text.width() <= width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Word-wrap `text` into lines of at most `width` cells. Words wider than a
/// line are split at character boundaries.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.width();

        if word_width > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            for c in word.chars() {
                let w = c.width().unwrap_or(0);
                if current_width + w > width {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                current.push(c);
                current_width += w;
            }
            continue;
        }

        let needed = if current.is_empty() { word_width } else { current_width + 1 + word_width };
        if needed <= width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_width = needed;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
