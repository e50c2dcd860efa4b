//! Persistence contract for users and their things.
//!
//! The auth core only needs `find_one`; the rest of the API uses the full
//! contract. Two backends implement it: [`PgStore`] for PostgreSQL and
//! [`MemoryStore`] for tests and local development (`--dsn memory://`).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Stored user record. `password_hash` never leaves the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_public_id: Option<String>,
    pub avatar_uri: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_uri: String,
}

/// Partial update; `None` leaves the column untouched. The username is not
/// part of the patch since handles are immutable after creation.
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub disabled: Option<bool>,
}

impl UserPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.disabled.is_none()
    }
}

/// Equality filter for single-record lookups.
#[derive(Clone, Debug)]
pub enum UserFilter {
    Id(Uuid),
    Username(String),
    Email(String),
}

#[derive(Debug)]
pub enum InsertOutcome<T> {
    Created(T),
    Conflict,
}

#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(User),
    NotFound,
    Conflict,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thing {
    pub id: Uuid,
    pub thing_name: String,
    pub thing_description: Option<String>,
    pub category_name: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewThing {
    pub thing_name: String,
    pub thing_description: Option<String>,
    pub category_name: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_one(&self, filter: UserFilter) -> Result<Option<User>>;
    async fn list(&self) -> Result<Vec<User>>;
    async fn insert(&self, user: NewUser) -> Result<InsertOutcome<User>>;
    async fn update_fields(&self, id: Uuid, patch: UserPatch) -> Result<UpdateOutcome>;
    /// Delete a user and everything it owns. Returns `false` if absent.
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait ThingStore: Send + Sync {
    /// Attach a thing to `owner`; `Conflict` if the owner already has one
    /// with the same name.
    async fn insert_thing(&self, owner: &User, thing: NewThing) -> Result<InsertOutcome<Thing>>;
    async fn things_for_owner(&self, owner: &User) -> Result<Vec<Thing>>;
}

/// Build the avatar URI assigned at registration.
#[must_use]
pub fn avatar_uri(username: &str) -> String {
    format!("https://api.multiavatar.com/{username}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_uri_embeds_username() {
        assert_eq!(
            avatar_uri("alice"),
            "https://api.multiavatar.com/alice.png"
        );
    }

    #[test]
    fn user_patch_empty_only_without_fields() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            disabled: Some(true),
            ..UserPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
