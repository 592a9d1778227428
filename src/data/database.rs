//! SQLite database operations
//!
//! All database access goes through this module.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Insert a new user
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, user).await
    }

    /// Number of stored users
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Patch posting preference options.
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching user row exists.
    pub async fn update_user_options(
        &self,
        user_id: &str,
        patch: &UserOptionsPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
        builder.push_bind(updated_at);

        if let Some(value) = patch.boost_options {
            builder.push(", boost_options = ").push_bind(value);
        }
        if let Some(value) = patch.masto_reply_options {
            builder.push(", masto_reply_options = ").push_bind(value);
        }
        if let Some(value) = patch.masto_mention_options {
            builder.push(", masto_mention_options = ").push_bind(value);
        }

        builder.push(" WHERE id = ").push_bind(user_id.to_string());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    /// Record the newest post id for a provider unless one is already stored.
    ///
    /// The `IS NULL` guard makes concurrent bootstraps keep the first value.
    ///
    /// # Returns
    /// `true` if the id was stored.
    pub async fn set_last_post_id_if_unset(
        &self,
        user_id: &str,
        provider: Provider,
        post_id: &str,
    ) -> Result<bool, AppError> {
        let sql = match provider {
            Provider::Twitter => {
                "UPDATE users SET last_tweet = ?, updated_at = ? WHERE id = ? AND last_tweet IS NULL"
            }
            Provider::Mastodon => {
                "UPDATE users SET last_toot = ?, updated_at = ? WHERE id = ? AND last_toot IS NULL"
            }
        };

        let result = sqlx::query(sql)
            .bind(post_id)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Authorizations
    // =========================================================================

    /// Find the link for an external identity
    pub async fn find_authorization(
        &self,
        provider: Provider,
        uid: &str,
    ) -> Result<Option<Authorization>, AppError> {
        let link = sqlx::query_as::<_, Authorization>(
            "SELECT * FROM authorizations WHERE provider = ? AND uid = ?",
        )
        .bind(provider)
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    /// All links owned by a user, oldest first
    pub async fn get_authorizations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Authorization>, AppError> {
        let links = sqlx::query_as::<_, Authorization>(
            "SELECT * FROM authorizations WHERE user_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }

    /// Number of stored links
    pub async fn count_authorizations(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM authorizations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// The designated link a user's API calls go through for a provider
    pub async fn get_primary_authorization(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<Authorization>, AppError> {
        let link = sqlx::query_as::<_, Authorization>(
            r#"
            SELECT a.* FROM authorizations a
            JOIN primary_identities p ON p.authorization_id = a.id
            WHERE p.user_id = ? AND p.provider = ?
            "#,
        )
        .bind(user_id)
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    /// Persist a link and make it its owner's primary identity.
    ///
    /// Runs in one transaction:
    /// 1. Insert `new_owner` when the owner is not stored yet
    /// 2. Upsert the link on (provider, uid), overwriting credentials and owner
    /// 3. When the link changed owner, move the previous owner's primary
    ///    designation to their newest remaining link for the provider, or
    ///    drop it if they have none
    /// 4. Designate the link as primary for (owner, provider)
    ///
    /// # Returns
    /// The stored link. Its `id` is the existing row's when the identity was
    /// already linked.
    ///
    /// Two racing first links each insert their own `new_owner`; the link
    /// ends up with the later one and the earlier user keeps no links.
    pub async fn save_authorization(
        &self,
        link: &Authorization,
        new_owner: Option<&User>,
    ) -> Result<Authorization, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(user) = new_owner {
            insert_user(&mut tx, user).await?;
        }

        let previous_owner = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM authorizations WHERE provider = ? AND uid = ?",
        )
        .bind(link.provider)
        .bind(&link.uid)
        .fetch_optional(&mut *tx)
        .await?;

        let stored = sqlx::query_as::<_, Authorization>(
            r#"
            INSERT INTO authorizations (
                id, provider, uid, token, secret, user_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(provider, uid) DO UPDATE SET
                token = excluded.token,
                secret = excluded.secret,
                user_id = excluded.user_id,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&link.id)
        .bind(link.provider)
        .bind(&link.uid)
        .bind(&link.token)
        .bind(&link.secret)
        .bind(&link.user_id)
        .bind(link.created_at)
        .bind(link.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(previous_owner) = previous_owner.filter(|id| *id != stored.user_id) {
            sqlx::query("DELETE FROM primary_identities WHERE authorization_id = ? AND user_id = ?")
                .bind(&stored.id)
                .bind(&previous_owner)
                .execute(&mut *tx)
                .await?;

            // Keeps an existing designation pointing at another link
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO primary_identities (user_id, provider, authorization_id)
                SELECT user_id, provider, id FROM authorizations
                WHERE user_id = ? AND provider = ?
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(&previous_owner)
            .bind(stored.provider)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO primary_identities (user_id, provider, authorization_id)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, provider) DO UPDATE SET
                authorization_id = excluded.authorization_id
            "#,
        )
        .bind(&stored.user_id)
        .bind(stored.provider)
        .bind(&stored.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(stored)
    }
}

async fn insert_user(conn: &mut sqlx::SqliteConnection, user: &User) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO users (
            id, boost_options, masto_reply_options, masto_mention_options,
            last_tweet, last_toot, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(user.boost_options)
    .bind(user.masto_reply_options)
    .bind(user.masto_mention_options)
    .bind(&user.last_tweet)
    .bind(&user.last_toot)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}
