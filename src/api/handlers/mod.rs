//! Route handlers and the request/response schemas they share.

pub mod health;
pub mod root;
pub mod things;
pub mod token;
pub mod user_register;
pub mod users;

use crate::storage::{Thing, User};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lightweight email sanity check run before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Message {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Avatar {
    pub public_id: Option<String>,
    pub uri: String,
}

/// Public view of a user. The password hash is never part of it.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserOut {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Avatar,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            first_name: user.first_name,
            last_name: user.last_name,
            avatar: Avatar {
                public_id: user.avatar_public_id,
                uri: user.avatar_uri,
            },
            email: user.email,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub category_name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MyThingOut {
    pub thing_name: String,
    pub owner: String,
    pub category: Category,
}

impl From<Thing> for MyThingOut {
    fn from(thing: Thing) -> Self {
        Self {
            thing_name: thing.thing_name,
            owner: thing.owner,
            category: Category {
                category_name: thing.category_name,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("alice@example.com"));
        assert!(valid_email("a.b+c@sub.example.org"));
        assert!(!valid_email("alice"));
        assert!(!valid_email("alice@example"));
        assert!(!valid_email("alice @example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn user_out_has_no_password_hash() -> anyhow::Result<()> {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret-hash".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: None,
            avatar_public_id: None,
            avatar_uri: "https://api.multiavatar.com/alice.png".to_string(),
            disabled: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(UserOut::from(user))?;
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("secret-hash"));
        assert_eq!(json["avatar"]["uri"], "https://api.multiavatar.com/alice.png");
        assert_eq!(json["first_name"], "Alice");
        Ok(())
    }
}
