//! Link repository: the player ↔ chat-account table.

use super::DbError;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::platform::UserId;

/// A stored identity link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub player: Uuid,
    pub user: UserId,
    pub created_at: i64,
    pub last_seen_at: i64,
}

type LinkRow = (String, i64, i64, i64);

fn from_row((player, user, created_at, last_seen_at): LinkRow) -> Result<Link, DbError> {
    let player = Uuid::parse_str(&player).map_err(|_| DbError::CorruptRow(player.clone()))?;
    Ok(Link {
        player,
        user: UserId(user as u64),
        created_at,
        last_seen_at,
    })
}

/// Repository for link operations.
pub struct LinkRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LinkRepository<'a> {
    /// Create a new link repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_player(&self, player: Uuid) -> Result<Option<Link>, DbError> {
        let row = sqlx::query_as::<_, LinkRow>(
            "SELECT player_uuid, user_id, created_at, last_seen_at FROM links WHERE player_uuid = ?",
        )
        .bind(player.to_string())
        .fetch_optional(self.pool)
        .await?;
        row.map(from_row).transpose()
    }

    pub async fn get_by_user(&self, user: UserId) -> Result<Option<Link>, DbError> {
        let row = sqlx::query_as::<_, LinkRow>(
            "SELECT player_uuid, user_id, created_at, last_seen_at FROM links WHERE user_id = ?",
        )
        .bind(user.0 as i64)
        .fetch_optional(self.pool)
        .await?;
        row.map(from_row).transpose()
    }

    /// Insert a link. Either side already being linked is `AlreadyLinked`.
    pub async fn insert(&self, player: Uuid, user: UserId) -> Result<Link, DbError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO links (player_uuid, user_id, created_at, last_seen_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(player.to_string())
        .bind(user.0 as i64)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::AlreadyLinked;
            }
            DbError::from(e)
        })?;

        Ok(Link {
            player,
            user,
            created_at: now,
            last_seen_at: now,
        })
    }

    /// Delete the link for `player`, returning it if one existed.
    pub async fn delete_by_player(&self, player: Uuid) -> Result<Option<Link>, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, LinkRow>(
            "SELECT player_uuid, user_id, created_at, last_seen_at FROM links WHERE player_uuid = ?",
        )
        .bind(player.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        if row.is_some() {
            sqlx::query("DELETE FROM links WHERE player_uuid = ?")
                .bind(player.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        row.map(from_row).transpose()
    }

    /// Update last-seen time. Unknown players are ignored.
    pub async fn touch(&self, player: Uuid) -> Result<(), DbError> {
        sqlx::query("UPDATE links SET last_seen_at = ? WHERE player_uuid = ?")
            .bind(chrono::Utc::now().timestamp())
            .bind(player.to_string())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn all(&self) -> Result<Vec<Link>, DbError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            "SELECT player_uuid, user_id, created_at, last_seen_at FROM links ORDER BY created_at, player_uuid",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(from_row).collect()
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM links")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
