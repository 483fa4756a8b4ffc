// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite-backed implementation of the feed source traits.
//!
//! Each fetch is a recency-ordered, limit-truncated query over one event
//! table, joined with song/album metadata. Joins are LEFT joins: a
//! missing catalog record degrades the row (the normalizer substitutes
//! fallback labels), it never drops it.

use crate::error::AppError;
use crate::services::sources::{
    ActivityStore, AlbumListenRow, AlbumRatingRow, AvatarResolver, ReviewRow, SongListenRow,
    SongRatingRow,
};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Schema bootstrap for local development and tests. Production uses
/// managed migrations; the shapes must stay in sync.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    avatar_url TEXT
);
CREATE TABLE IF NOT EXISTS follows (
    follower_id TEXT NOT NULL,
    followed_id TEXT NOT NULL,
    PRIMARY KEY (follower_id, followed_id)
);
CREATE TABLE IF NOT EXISTS albums (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    cover_url TEXT
);
CREATE TABLE IF NOT EXISTS songs (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    album_id TEXT
);
CREATE TABLE IF NOT EXISTS song_listens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    song_id TEXT NOT NULL,
    listened_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS album_listens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    album_id TEXT NOT NULL,
    listened_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS song_ratings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    song_id TEXT NOT NULL,
    rating INTEGER NOT NULL,
    rated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS album_ratings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    album_id TEXT NOT NULL,
    rating INTEGER NOT NULL,
    rated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    review_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    rating INTEGER,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// SQLite store for the follow graph, event sources and avatars.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to {}: {}", database_url, e)))?;

        tracing::info!(url = database_url, "Connected to SQLite");
        Ok(Self { pool })
    }

    /// Create the schema if it does not exist yet.
    pub async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::Database(e.to_string())
}

#[async_trait]
impl ActivityStore for SqliteStore {
    async fn followed_ids(&self, viewer_id: &str) -> Result<Vec<String>, AppError> {
        sqlx::query_scalar::<_, String>(
            "SELECT followed_id FROM follows WHERE follower_id = ?",
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn recent_song_listens(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<SongListenRow>, AppError> {
        if actor_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT sl.user_id AS actor_id,
                   u.username AS actor_username,
                   sl.song_id AS song_id,
                   s.title AS song_title,
                   s.album_id AS album_id,
                   al.name AS album_name,
                   al.cover_url AS cover_url,
                   sl.listened_at AS listened_at
            FROM song_listens sl
            JOIN users u ON u.id = sl.user_id
            LEFT JOIN songs s ON s.id = sl.song_id
            LEFT JOIN albums al ON al.id = s.album_id
            WHERE sl.user_id IN ({})
            ORDER BY sl.listened_at DESC
            LIMIT ?
            "#,
            placeholders(actor_ids.len())
        );
        let mut query = sqlx::query_as::<_, SongListenRow>(&sql);
        for id in actor_ids {
            query = query.bind(id);
        }
        query
            .bind(pool_size as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn recent_album_listens(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<AlbumListenRow>, AppError> {
        if actor_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT al.user_id AS actor_id,
                   u.username AS actor_username,
                   al.album_id AS album_id,
                   a.name AS album_name,
                   a.cover_url AS cover_url,
                   al.listened_at AS listened_at
            FROM album_listens al
            JOIN users u ON u.id = al.user_id
            LEFT JOIN albums a ON a.id = al.album_id
            WHERE al.user_id IN ({})
            ORDER BY al.listened_at DESC
            LIMIT ?
            "#,
            placeholders(actor_ids.len())
        );
        let mut query = sqlx::query_as::<_, AlbumListenRow>(&sql);
        for id in actor_ids {
            query = query.bind(id);
        }
        query
            .bind(pool_size as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn recent_song_ratings(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<SongRatingRow>, AppError> {
        if actor_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT sr.user_id AS actor_id,
                   u.username AS actor_username,
                   sr.song_id AS song_id,
                   s.title AS song_title,
                   s.album_id AS album_id,
                   al.name AS album_name,
                   al.cover_url AS cover_url,
                   sr.rating AS rating,
                   sr.rated_at AS rated_at
            FROM song_ratings sr
            JOIN users u ON u.id = sr.user_id
            LEFT JOIN songs s ON s.id = sr.song_id
            LEFT JOIN albums al ON al.id = s.album_id
            WHERE sr.user_id IN ({})
            ORDER BY sr.rated_at DESC
            LIMIT ?
            "#,
            placeholders(actor_ids.len())
        );
        let mut query = sqlx::query_as::<_, SongRatingRow>(&sql);
        for id in actor_ids {
            query = query.bind(id);
        }
        query
            .bind(pool_size as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn recent_album_ratings(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<AlbumRatingRow>, AppError> {
        if actor_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT ar.user_id AS actor_id,
                   u.username AS actor_username,
                   ar.album_id AS album_id,
                   a.name AS album_name,
                   a.cover_url AS cover_url,
                   ar.rating AS rating,
                   ar.rated_at AS rated_at
            FROM album_ratings ar
            JOIN users u ON u.id = ar.user_id
            LEFT JOIN albums a ON a.id = ar.album_id
            WHERE ar.user_id IN ({})
            ORDER BY ar.rated_at DESC
            LIMIT ?
            "#,
            placeholders(actor_ids.len())
        );
        let mut query = sqlx::query_as::<_, AlbumRatingRow>(&sql);
        for id in actor_ids {
            query = query.bind(id);
        }
        query
            .bind(pool_size as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn recent_reviews(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<ReviewRow>, AppError> {
        if actor_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT r.id AS id,
                   r.user_id AS actor_id,
                   u.username AS actor_username,
                   r.review_type AS review_type,
                   r.target_id AS target_id,
                   CASE WHEN r.review_type = 'album' THEN a.name ELSE s.title END AS target_name,
                   CASE WHEN r.review_type = 'album' THEN a.cover_url ELSE sa.cover_url END AS cover_url,
                   r.rating AS rating,
                   r.text AS text,
                   CASE WHEN r.review_type = 'song' THEN s.album_id END AS album_id,
                   CASE WHEN r.review_type = 'song' THEN sa.name END AS album_name,
                   r.created_at AS created_at
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            LEFT JOIN albums a ON r.review_type = 'album' AND a.id = r.target_id
            LEFT JOIN songs s ON r.review_type = 'song' AND s.id = r.target_id
            LEFT JOIN albums sa ON sa.id = s.album_id
            WHERE r.user_id IN ({})
            ORDER BY r.created_at DESC
            LIMIT ?
            "#,
            placeholders(actor_ids.len())
        );
        let mut query = sqlx::query_as::<_, ReviewRow>(&sql);
        for id in actor_ids {
            query = query.bind(id);
        }
        query
            .bind(pool_size as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl AvatarResolver for SqliteStore {
    async fn resolve_many(&self, actor_ids: &[String]) -> HashMap<String, String> {
        if actor_ids.is_empty() {
            return HashMap::new();
        }
        let sql = format!(
            "SELECT id, avatar_url FROM users WHERE id IN ({})",
            placeholders(actor_ids.len())
        );
        let mut query = sqlx::query_as::<_, (String, Option<String>)>(&sql);
        for id in actor_ids {
            query = query.bind(id);
        }

        // Avatar failures degrade per actor; the request never fails here.
        match query.fetch_all(&self.pool).await {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|(id, url)| url.map(|u| (id, u)))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Avatar resolution failed; using placeholders");
                HashMap::new()
            }
        }
    }
}
