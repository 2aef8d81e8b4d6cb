use std::ops::Range;

use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone};

use crate::model::Message;

/// A run of consecutive messages that share a day label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup {
    pub label: String,
    /// Position of the run in the grouped slice.
    pub range: Range<usize>,
    /// Set when the label is the raw timestamp because it failed to parse.
    pub raw: bool,
}

impl DateGroup {
    pub fn messages<'a>(&self, all: &'a [Message]) -> &'a [Message] {
        &all[self.range.clone()]
    }
}

#[derive(Debug, PartialEq, Eq)]
enum DayKey {
    Day(String),
    Raw(String),
}

/// Parse an export timestamp. RFC 3339 is the norm; a bare local date-time
/// is accepted as well.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

fn day_key(ts: &str, now: DateTime<Local>) -> DayKey {
    let Some(dt) = parse_timestamp(ts) else {
        return DayKey::Raw(ts.to_string());
    };

    let days = (now.date_naive() - dt.date_naive()).num_days();
    let label = match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => dt.format("%A").to_string(),
        _ if dt.year() == now.year() => dt.format("%A, %B %-d").to_string(),
        _ => dt.format("%A, %B %-d, %Y").to_string(),
    };
    DayKey::Day(label)
}

/// Split an already ordered message list into day groups. Messages are never
/// reordered; a day that reappears later starts a new group.
pub fn group_by_date(messages: &[Message], now: DateTime<Local>) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();
    let mut current: Option<DayKey> = None;

    for (idx, msg) in messages.iter().enumerate() {
        let key = day_key(&msg.created_at, now);
        if current.as_ref() == Some(&key) {
            if let Some(group) = groups.last_mut() {
                group.range.end = idx + 1;
                continue;
            }
        }

        let (label, raw) = match &key {
            DayKey::Day(label) => (label.clone(), false),
            DayKey::Raw(label) => (label.clone(), true),
        };
        groups.push(DateGroup {
            label,
            range: idx..idx + 1,
            raw,
        });
        current = Some(key);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::message;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> String {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().to_rfc3339()
    }

    fn day_label(ts: &str, now: DateTime<Local>) -> String {
        match day_key(ts, now) {
            DayKey::Day(label) | DayKey::Raw(label) => label,
        }
    }

    fn labels(groups: &[DateGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.label.as_str()).collect()
    }

    #[test]
    fn test_day_labels() {
        let now = now();
        assert_eq!(day_label(&at(2026, 10, 19, 8), now), "Today");
        assert_eq!(day_label(&at(2026, 10, 18, 23), now), "Yesterday");
        assert_eq!(day_label(&at(2026, 10, 14, 9), now), "Wednesday");
        assert_eq!(day_label(&at(2026, 10, 13, 9), now), "Tuesday");
        assert_eq!(day_label(&at(2026, 10, 12, 9), now), "Monday, October 12");
        assert_eq!(day_label(&at(2025, 3, 3, 9), now), "Monday, March 3, 2025");
    }

    #[test]
    fn test_unparsable_label_is_raw() {
        assert_eq!(day_label("not a date", now()), "not a date");
        assert_eq!(day_label("", now()), "");
    }

    #[test]
    fn test_naive_timestamp_is_local() {
        let parsed = parse_timestamp("2026-10-19T08:30:00").unwrap();
        assert_eq!(parsed.format("%H:%M").to_string(), "08:30");
        assert_eq!(day_label("2026-10-19T08:30:00.123", now()), "Today");
    }

    #[test]
    fn test_empty_and_single() {
        assert!(group_by_date(&[], now()).is_empty());

        let msgs = vec![message("m1", &at(2026, 10, 19, 8), "hi")];
        let groups = group_by_date(&msgs, now());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].range, 0..1);
        assert_eq!(groups[0].messages(&msgs)[0].id, "m1");
    }

    #[test]
    fn test_groups_consecutive_days() {
        let msgs = vec![
            message("m1", &at(2026, 10, 18, 9), "a"),
            message("m2", &at(2026, 10, 18, 10), "b"),
            message("m3", &at(2026, 10, 19, 8), "c"),
        ];
        let groups = group_by_date(&msgs, now());
        assert_eq!(labels(&groups), vec!["Yesterday", "Today"]);
        assert_eq!(groups[0].range, 0..2);
        assert_eq!(groups[1].range, 2..3);
    }

    #[test]
    fn test_does_not_sort_or_merge_non_adjacent_days() {
        let msgs = vec![
            message("m1", &at(2026, 10, 19, 8), "a"),
            message("m2", &at(2026, 10, 18, 9), "b"),
            message("m3", &at(2026, 10, 19, 9), "c"),
        ];
        let groups = group_by_date(&msgs, now());
        assert_eq!(labels(&groups), vec!["Today", "Yesterday", "Today"]);
    }

    #[test]
    fn test_unparsable_timestamp_breaks_group() {
        let msgs = vec![
            message("m1", &at(2026, 10, 19, 8), "a"),
            message("m2", "garbage", "b"),
            message("m3", &at(2026, 10, 19, 9), "c"),
        ];
        let groups = group_by_date(&msgs, now());
        assert_eq!(labels(&groups), vec!["Today", "garbage", "Today"]);
        assert!(groups[1].raw);
        assert!(!groups[0].raw);
    }

    #[test]
    fn test_raw_label_never_merges_with_same_text_day() {
        // A raw timestamp that happens to read "Today" stays separate.
        let msgs = vec![
            message("m1", &at(2026, 10, 19, 8), "a"),
            message("m2", "Today", "b"),
        ];
        let groups = group_by_date(&msgs, now());
        assert_eq!(groups.len(), 2);
        assert_eq!(labels(&groups), vec!["Today", "Today"]);
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let msgs = vec![
            message("m1", &at(2025, 12, 31, 9), "a"),
            message("m2", "bad", "b"),
            message("m3", &at(2026, 10, 17, 9), "c"),
            message("m4", &at(2026, 10, 17, 10), "d"),
            message("m5", &at(2026, 10, 19, 8), "e"),
        ];
        let first = group_by_date(&msgs, now());
        let flattened: Vec<Message> = first
            .iter()
            .flat_map(|g| g.messages(&msgs).iter().cloned())
            .collect();
        let second = group_by_date(&flattened, now());
        assert_eq!(first, second);
        assert_eq!(flattened, msgs);
    }
}
