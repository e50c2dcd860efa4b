//! PostgreSQL backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{
    InsertOutcome, NewThing, NewUser, Thing, ThingStore, UpdateOutcome, User, UserFilter,
    UserPatch, UserStore,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     avatar_public_id, avatar_uri, disabled, created_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and make sure the schema exists.
    ///
    /// # Errors
    /// Returns an error if the connection or schema setup fails.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> Result<()> {
        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        Ok(())
    }
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        avatar_public_id: row.get("avatar_public_id"),
        avatar_uri: row.get("avatar_uri"),
        disabled: row.get("disabled"),
        created_at: row.get("created_at"),
    }
}

fn thing_from_row(row: &sqlx::postgres::PgRow) -> Thing {
    Thing {
        id: row.get("id"),
        thing_name: row.get("thing_name"),
        thing_description: row.get("thing_description"),
        category_name: row.get("category_name"),
        owner: row.get("owner"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_one(&self, filter: UserFilter) -> Result<Option<User>> {
        let column = match filter {
            UserFilter::Id(_) => "id",
            UserFilter::Username(_) => "username",
            UserFilter::Email(_) => "email",
        };
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1 LIMIT 1");
        let statement = match filter {
            UserFilter::Id(id) => sqlx::query(&query).bind(id),
            UserFilter::Username(value) | UserFilter::Email(value) => {
                sqlx::query(&query).bind(value)
            }
        };
        let row = statement
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .with_context(|| format!("failed to lookup user by {column}"))?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn list(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to list users")?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn insert(&self, user: NewUser) -> Result<InsertOutcome<User>> {
        let query = format!(
            "INSERT INTO users (id, username, email, password_hash, avatar_uri) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.avatar_uri)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", &query))
            .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Created(user_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn update_fields(&self, id: Uuid, patch: UserPatch) -> Result<UpdateOutcome> {
        let query = format!(
            "UPDATE users SET \
                first_name = COALESCE($1, first_name), \
                last_name = COALESCE($2, last_name), \
                email = COALESCE($3, email), \
                disabled = COALESCE($4, disabled) \
             WHERE id = $5 RETURNING {USER_COLUMNS}"
        );
        let result = sqlx::query(&query)
            .bind(patch.first_name)
            .bind(patch.last_name)
            .bind(patch.email)
            .bind(patch.disabled)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", &query))
            .await;

        match result {
            Ok(Some(row)) => Ok(UpdateOutcome::Updated(user_from_row(&row))),
            Ok(None) => Ok(UpdateOutcome::NotFound),
            Err(err) if is_unique_violation(&err) => Ok(UpdateOutcome::Conflict),
            Err(err) => Err(err).context("failed to update user"),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let query = "DELETE FROM users WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}

#[async_trait]
impl ThingStore for PgStore {
    async fn insert_thing(&self, owner: &User, thing: NewThing) -> Result<InsertOutcome<Thing>> {
        let query = r"
            INSERT INTO things (id, owner_id, thing_name, thing_description, category_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, thing_name, thing_description, category_name, $6::text AS owner, created_at
        ";
        let result = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(owner.id)
            .bind(&thing.thing_name)
            .bind(&thing.thing_description)
            .bind(&thing.category_name)
            .bind(&owner.username)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Created(thing_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert thing"),
        }
    }

    async fn things_for_owner(&self, owner: &User) -> Result<Vec<Thing>> {
        let query = r"
            SELECT t.id, t.thing_name, t.thing_description, t.category_name,
                   u.username AS owner, t.created_at
            FROM things t
            JOIN users u ON u.id = t.owner_id
            WHERE t.owner_id = $1
            ORDER BY t.created_at
        ";
        let rows = sqlx::query(query)
            .bind(owner.id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to list things")?;

        Ok(rows.iter().map(thing_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sql_statements_drops_empty_tail() {
        let statements = split_sql_statements("CREATE TABLE a (id INT);\n\nCREATE INDEX b ON a (id);\n");
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE a (id INT)".to_string(),
                "CREATE INDEX b ON a (id)".to_string()
            ]
        );
    }

    #[test]
    fn bundled_schema_creates_both_tables() {
        let statements = split_sql_statements(SCHEMA_SQL);
        assert!(statements
            .iter()
            .any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS users")));
        assert!(statements
            .iter()
            .any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS things")));
    }

    #[test]
    fn is_unique_violation_ignores_non_database_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
