use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub grade: Option<u32>,
    pub class_num: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            email: email.into(),
            name: None,
            grade: None,
            class_num: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_class(mut self, grade: u32, class_num: u32) -> Self {
        self.grade = Some(grade);
        self.class_num = Some(class_num);
        self
    }

    /// The user's own class key ("<grade>-<class>") when both parts are known.
    pub fn home_class(&self) -> Option<String> {
        match (self.grade, self.class_num) {
            (Some(grade), Some(class_num)) => Some(format!("{grade}-{class_num}")),
            _ => None,
        }
    }
}

/// A freshly issued session. `token` is only ever available here; storage
/// keeps its hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedSession {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Validate an email address enough to reject obvious typos.
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("email cannot be empty".to_string());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(format!("invalid email: {email}")),
    }
}
