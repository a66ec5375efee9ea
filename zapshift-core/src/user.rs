use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Rider,
    Admin,
}

impl Role {
    pub fn as_token(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Rider => "rider",
            Role::Admin => "admin",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "user" => Some(Role::User),
            "rider" => Some(Role::Rider),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// An account keyed by email. Role moves to `Rider` as a side effect of
/// rider approval; to `Admin` only via a privileged update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            role: Role::User,
            created_at: Utc::now(),
        }
    }
}
