use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Bot => write!(f, "bot"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "bot" => Ok(Self::Bot),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A single persisted chat line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: String,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(user_id: impl Into<String>, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.into(),
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// The question and its answer, in that order, sharing one timestamp.
    pub fn exchange(user_id: &str, query: &str, answer: &str) -> [Self; 2] {
        let now = Utc::now();
        let question = Self {
            created_at: now,
            ..Self::new(user_id, Role::User, query)
        };
        let reply = Self {
            created_at: now,
            ..Self::new(user_id, Role::Bot, answer)
        };
        [question, reply]
    }
}
