//! Database module for persistent storage.
//!
//! Provides async SQLite access using SQLx for the identity-link table
//! (player UUID ↔ chat account id with created/last-seen timestamps).

mod links;

pub use links::{Link, LinkRepository};

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::identity::{LinkStore, ResolvedIdentity};
use crate::platform::UserId;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error: {0}")]
    Migration(sqlx::migrate::MigrateError),
    #[error("player or chat account already linked")]
    AlreadyLinked,
    #[error("corrupt link row: {0}")]
    CorruptRow(String),
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a new database connection, running migrations if needed.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let pool = if path == ":memory:" {
            // Uniquely named shared-cache memory database per call;
            // `file::memory:` would collide across parallel tests.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:linksync-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Database connected");

        Self::run_migrations(&pool).await?;

        // WAL lets sweeps read links while a link command writes.
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run embedded migrations.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(DbError::Migration)?;

        info!("Database migrations checked/applied");
        Ok(())
    }

    /// Get link repository.
    pub fn links(&self) -> LinkRepository<'_> {
        LinkRepository::new(&self.pool)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err)
    }
}

#[async_trait]
impl LinkStore for Database {
    async fn user_for_player(&self, player: Uuid) -> Result<Option<UserId>, DbError> {
        Ok(self.links().get_by_player(player).await?.map(|link| link.user))
    }

    async fn player_for_user(&self, user: UserId) -> Result<Option<Uuid>, DbError> {
        Ok(self.links().get_by_user(user).await?.map(|link| link.player))
    }

    async fn create_link(&self, player: Uuid, user: UserId) -> Result<(), DbError> {
        self.links().insert(player, user).await.map(|_| ())
    }

    async fn remove_link(&self, player: Uuid) -> Result<Option<UserId>, DbError> {
        Ok(self.links().delete_by_player(player).await?.map(|link| link.user))
    }

    async fn touch(&self, player: Uuid) -> Result<(), DbError> {
        self.links().touch(player).await
    }

    async fn linked_accounts(&self) -> Result<Vec<ResolvedIdentity>, DbError> {
        Ok(self
            .links()
            .all()
            .await?
            .into_iter()
            .map(|link| ResolvedIdentity::new(link.player, link.user))
            .collect())
    }

    async fn link_count(&self) -> Result<i64, DbError> {
        self.links().count().await
    }
}
