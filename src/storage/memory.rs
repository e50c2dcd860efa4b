//! In-memory store used by tests and `--dsn memory://`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    InsertOutcome, NewThing, NewUser, Thing, ThingStore, UpdateOutcome, User, UserFilter,
    UserPatch, UserStore,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    things: Vec<Thing>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(user: &User, filter: &UserFilter) -> bool {
    match filter {
        UserFilter::Id(id) => user.id == *id,
        UserFilter::Username(username) => user.username == *username,
        UserFilter::Email(email) => user.email == *email,
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_one(&self, filter: UserFilter) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| matches_filter(user, &filter))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn insert(&self, user: NewUser) -> Result<InsertOutcome<User>> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|existing| existing.username == user.username || existing.email == user.email)
        {
            return Ok(InsertOutcome::Conflict);
        }

        let record = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            first_name: None,
            last_name: None,
            avatar_public_id: None,
            avatar_uri: user.avatar_uri,
            disabled: false,
            created_at: Utc::now(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn update_fields(&self, id: Uuid, patch: UserPatch) -> Result<UpdateOutcome> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &patch.email {
            if tables
                .users
                .values()
                .any(|existing| existing.id != id && existing.email == *email)
            {
                return Ok(UpdateOutcome::Conflict);
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if let Some(first_name) = patch.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(disabled) = patch.disabled {
            user.disabled = disabled;
        }
        Ok(UpdateOutcome::Updated(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.remove(&id) else {
            return Ok(false);
        };
        tables.things.retain(|thing| thing.owner != user.username);
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ThingStore for MemoryStore {
    async fn insert_thing(&self, owner: &User, thing: NewThing) -> Result<InsertOutcome<Thing>> {
        let mut tables = self.tables.write().await;
        if tables
            .things
            .iter()
            .any(|existing| existing.owner == owner.username && existing.thing_name == thing.thing_name)
        {
            return Ok(InsertOutcome::Conflict);
        }

        let record = Thing {
            id: Uuid::new_v4(),
            thing_name: thing.thing_name,
            thing_description: thing.thing_description,
            category_name: thing.category_name,
            owner: owner.username.clone(),
            created_at: Utc::now(),
        };
        tables.things.push(record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn things_for_owner(&self, owner: &User) -> Result<Vec<Thing>> {
        let tables = self.tables.read().await;
        Ok(tables
            .things
            .iter()
            .filter(|thing| thing.owner == owner.username)
            .cloned()
            .collect())
    }
}
