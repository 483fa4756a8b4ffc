// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Interfaces the feed engine consumes: the follow graph, the five event
//! sources, and batched avatar resolution.
//!
//! The engine only ever sees these traits; `db::SqliteStore` is the
//! production implementation and tests supply in-memory fakes.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::HashMap;

/// Raw song-listen row, joined with song and album metadata.
#[derive(Debug, Clone, FromRow)]
pub struct SongListenRow {
    pub actor_id: String,
    pub actor_username: String,
    pub song_id: String,
    pub song_title: Option<String>,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub cover_url: Option<String>,
    pub listened_at: DateTime<Utc>,
}

/// Raw album-listen row, joined with album metadata.
#[derive(Debug, Clone, FromRow)]
pub struct AlbumListenRow {
    pub actor_id: String,
    pub actor_username: String,
    pub album_id: String,
    pub album_name: Option<String>,
    pub cover_url: Option<String>,
    pub listened_at: DateTime<Utc>,
}

/// Raw song-rating row.
#[derive(Debug, Clone, FromRow)]
pub struct SongRatingRow {
    pub actor_id: String,
    pub actor_username: String,
    pub song_id: String,
    pub song_title: Option<String>,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub cover_url: Option<String>,
    pub rating: i64,
    pub rated_at: DateTime<Utc>,
}

/// Raw album-rating row.
#[derive(Debug, Clone, FromRow)]
pub struct AlbumRatingRow {
    pub actor_id: String,
    pub actor_username: String,
    pub album_id: String,
    pub album_name: Option<String>,
    pub cover_url: Option<String>,
    pub rating: i64,
    pub rated_at: DateTime<Utc>,
}

/// Raw review row. `review_type` is `"song"` or `"album"`; song reviews
/// additionally carry the joined parent album so they can cluster.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: String,
    pub actor_id: String,
    pub actor_username: String,
    pub review_type: String,
    pub target_id: String,
    pub target_name: Option<String>,
    pub cover_url: Option<String>,
    pub rating: Option<i64>,
    pub text: String,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read access to the follow graph and the five activity event sources.
///
/// Every fetch returns rows ordered by recency descending, truncated to
/// `pool_size`, scoped to the given actor ids.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Ids of the users `viewer_id` follows.
    async fn followed_ids(&self, viewer_id: &str) -> Result<Vec<String>>;

    async fn recent_song_listens(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<SongListenRow>>;

    async fn recent_album_listens(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<AlbumListenRow>>;

    async fn recent_song_ratings(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<SongRatingRow>>;

    async fn recent_album_ratings(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<AlbumRatingRow>>;

    async fn recent_reviews(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<ReviewRow>>;
}

/// Batched avatar lookup.
///
/// Infallible by contract: actors that cannot be resolved are simply
/// absent from the returned map and the caller substitutes a placeholder.
#[async_trait]
pub trait AvatarResolver: Send + Sync {
    async fn resolve_many(&self, actor_ids: &[String]) -> HashMap<String, String>;
}
