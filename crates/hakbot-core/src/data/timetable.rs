use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::Result;

/// One class's week: weekday name (lowercase) → subjects in period order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSchedule {
    pub class_key: String,
    pub days: HashMap<String, Vec<String>>,
}

impl ClassSchedule {
    pub fn subjects(&self, day: &str) -> &[String] {
        self.days.get(day).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Class key → weekly schedule, in the order the classes appear in the
/// source JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timetable {
    classes: Vec<ClassSchedule>,
}

impl Timetable {
    /// Parse `timetable.json`: `{ "2-3": { "monday": ["Math", ...], ... }, ... }`.
    ///
    /// Only the shape is checked; weekday names are not validated.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: Map<String, Value> = serde_json::from_str(content)?;
        let mut classes = Vec::with_capacity(raw.len());
        for (class_key, week) in raw {
            let days: HashMap<String, Vec<String>> = serde_json::from_value(week)?;
            let days = days
                .into_iter()
                .map(|(day, subjects)| (day.to_lowercase(), subjects))
                .collect();
            classes.push(ClassSchedule { class_key, days });
        }
        Ok(Self { classes })
    }

    pub fn get(&self, class_key: &str) -> Option<&ClassSchedule> {
        self.classes.iter().find(|c| c.class_key == class_key)
    }

    /// The first class in source order.
    pub fn first_class(&self) -> Option<&str> {
        self.classes.first().map(|c| c.class_key.as_str())
    }

    pub fn class_keys(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.class_key.as_str())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
