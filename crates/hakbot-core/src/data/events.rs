use serde::{Deserialize, Serialize};

use super::csv_records;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub date_start: String,
    /// Same as `date_start` for single-day events.
    pub date_end: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl EventRecord {
    pub fn is_multi_day(&self) -> bool {
        self.date_end != self.date_start
    }
}

/// Parse `events.csv`: `title,date_start,date_end,description,type`.
///
/// Missing trailing columns become empty strings, except `date_end` which
/// falls back to `date_start`. File order is preserved.
pub fn parse_events(content: &str) -> Result<Vec<EventRecord>> {
    let mut events = Vec::new();
    for fields in csv_records(content)? {
        if fields[0] == "title" {
            continue;
        }
        let field = |i: usize| fields.get(i).cloned().unwrap_or_default();
        let date_start = field(1);
        let date_end = match field(2) {
            end if end.is_empty() => date_start.clone(),
            end => end,
        };
        events.push(EventRecord {
            title: field(0),
            date_start,
            date_end,
            description: field(3),
            kind: field(4),
        });
    }
    Ok(events)
}
