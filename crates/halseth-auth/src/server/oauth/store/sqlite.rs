//! SQLite credential store.
//!
//! Durable backend: codes survive restarts, and redemption relies on a
//! conditional `UPDATE ... WHERE used = 0` so that concurrent exchanges of
//! one code race at the database rather than in process memory.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::CredentialStore;
use crate::error::{StoreError, StoreResult};
use crate::server::oauth::types::{AuthorizationCode, Client, Token};

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS oauth_clients (
        client_id     TEXT PRIMARY KEY,
        client_name   TEXT NOT NULL,
        redirect_uris TEXT NOT NULL,
        created_at    TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS oauth_codes (
        code                  TEXT PRIMARY KEY,
        client_id             TEXT NOT NULL,
        redirect_uri          TEXT NOT NULL,
        code_challenge        TEXT,
        code_challenge_method TEXT NOT NULL,
        created_at            TEXT NOT NULL,
        expires_at            TEXT NOT NULL,
        used                  INTEGER NOT NULL DEFAULT 0
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS oauth_tokens (
        token      TEXT PRIMARY KEY,
        client_id  TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    ",
];

/// SQLite-backed OAuth state store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to a SQLite database, creating the file if needed.
    ///
    /// `sqlite::memory:` gets a single long-lived connection so every query
    /// sees the same database.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let in_memory = database_url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .create_if_missing(true);

        let pool_options = if in_memory {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the OAuth tables if they do not exist.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn client_from_row(row: &SqliteRow) -> StoreResult<Client> {
        let redirect_uris: String = row.try_get("redirect_uris")?;
        Ok(Client {
            client_id: row.try_get("client_id")?,
            client_name: row.try_get("client_name")?,
            redirect_uris: serde_json::from_str(&redirect_uris)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn code_from_row(row: &SqliteRow) -> StoreResult<AuthorizationCode> {
        Ok(AuthorizationCode {
            code: row.try_get("code")?,
            client_id: row.try_get("client_id")?,
            redirect_uri: row.try_get("redirect_uri")?,
            code_challenge: row.try_get("code_challenge")?,
            code_challenge_method: row.try_get("code_challenge_method")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
            used: row.try_get("used")?,
        })
    }

    fn token_from_row(row: &SqliteRow) -> StoreResult<Token> {
        Ok(Token {
            token: row.try_get("token")?,
            client_id: row.try_get("client_id")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn insert_client(&self, client: &Client) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO oauth_clients (client_id, client_name, redirect_uris, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&client.client_id)
        .bind(&client.client_name)
        .bind(serde_json::to_string(&client.redirect_uris)?)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> StoreResult<Option<Client>> {
        let row = sqlx::query("SELECT * FROM oauth_clients WHERE client_id = ?")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::client_from_row).transpose()
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        let rows = sqlx::query("SELECT * FROM oauth_clients ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::client_from_row).collect()
    }

    async fn insert_code(&self, code: &AuthorizationCode) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO oauth_codes \
             (code, client_id, redirect_uri, code_challenge, code_challenge_method, created_at, expires_at, used) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&code.code)
        .bind(&code.client_id)
        .bind(&code.redirect_uri)
        .bind(&code.code_challenge)
        .bind(&code.code_challenge_method)
        .bind(code.created_at)
        .bind(code.expires_at)
        .bind(code.used)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_unused_code(&self, code: &str) -> StoreResult<Option<AuthorizationCode>> {
        let row = sqlx::query("SELECT * FROM oauth_codes WHERE code = ? AND used = 0")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::code_from_row).transpose()
    }

    async fn redeem_code(&self, code: &str, token: &Token) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE oauth_codes SET used = 1 WHERE code = ? AND used = 0")
            .bind(code)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO oauth_tokens (token, client_id, created_at) VALUES (?, ?, ?)")
            .bind(&token.token)
            .bind(&token.client_id)
            .bind(token.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn insert_token(&self, token: &Token) -> StoreResult<()> {
        sqlx::query("INSERT INTO oauth_tokens (token, client_id, created_at) VALUES (?, ?, ?)")
            .bind(&token.token)
            .bind(&token.client_id)
            .bind(token.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_token(&self, token: &str) -> StoreResult<Option<Token>> {
        let row = sqlx::query("SELECT * FROM oauth_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::token_from_row).transpose()
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("connections", &self.pool.size()).finish()
    }
}
