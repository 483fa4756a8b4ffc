// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test fixtures: an in-memory activity store, a canned avatar
//! resolver, and row builders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crescendo::config::Config;
use crescendo::error::{AppError, Result};
use crescendo::routes::create_router;
use crescendo::services::sources::{
    ActivityStore, AlbumListenRow, AlbumRatingRow, AvatarResolver, ReviewRow, SongListenRow,
    SongRatingRow,
};
use crescendo::services::FeedService;
use crescendo::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Minutes-from-epoch timestamp helper.
#[allow(dead_code)]
pub fn ts(mins: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(mins * 60, 0).unwrap()
}

/// In-memory `ActivityStore`, pre-populated per test. Fetches apply the
/// same contract as the real store: actor filter, recency-descending
/// order, truncation to the pool size.
#[derive(Default)]
pub struct FakeStore {
    pub follows: HashMap<String, Vec<String>>,
    pub song_listens: Vec<SongListenRow>,
    pub album_listens: Vec<AlbumListenRow>,
    pub song_ratings: Vec<SongRatingRow>,
    pub album_ratings: Vec<AlbumRatingRow>,
    pub reviews: Vec<ReviewRow>,
    /// Number of source fetches performed (not counting follow lookups).
    pub fetch_calls: AtomicUsize,
    /// When set, every source fetch fails.
    pub fail_fetches: AtomicBool,
}

impl FakeStore {
    #[allow(dead_code)]
    pub fn with_follows(viewer: &str, followed: &[&str]) -> Self {
        let mut store = Self::default();
        store.follows.insert(
            viewer.to_string(),
            followed.iter().map(|s| s.to_string()).collect(),
        );
        store
    }

    fn fetch<R: Clone>(
        &self,
        rows: &[R],
        actor_of: impl Fn(&R) -> &str,
        date_of: impl Fn(&R) -> DateTime<Utc>,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<R>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated source failure".to_string()));
        }
        let mut out: Vec<R> = rows
            .iter()
            .filter(|r| actor_ids.iter().any(|id| id.as_str() == actor_of(r)))
            .cloned()
            .collect();
        out.sort_by_key(|r| std::cmp::Reverse(date_of(r)));
        out.truncate(pool_size as usize);
        Ok(out)
    }
}

#[async_trait]
impl ActivityStore for FakeStore {
    async fn followed_ids(&self, viewer_id: &str) -> Result<Vec<String>> {
        Ok(self.follows.get(viewer_id).cloned().unwrap_or_default())
    }

    async fn recent_song_listens(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<SongListenRow>> {
        self.fetch(
            &self.song_listens,
            |r| r.actor_id.as_str(),
            |r| r.listened_at,
            actor_ids,
            pool_size,
        )
    }

    async fn recent_album_listens(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<AlbumListenRow>> {
        self.fetch(
            &self.album_listens,
            |r| r.actor_id.as_str(),
            |r| r.listened_at,
            actor_ids,
            pool_size,
        )
    }

    async fn recent_song_ratings(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<SongRatingRow>> {
        self.fetch(
            &self.song_ratings,
            |r| r.actor_id.as_str(),
            |r| r.rated_at,
            actor_ids,
            pool_size,
        )
    }

    async fn recent_album_ratings(
        &self,
        actor_ids: &[String],
        pool_size: u32,
    ) -> Result<Vec<AlbumRatingRow>> {
        self.fetch(
            &self.album_ratings,
            |r| r.actor_id.as_str(),
            |r| r.rated_at,
            actor_ids,
            pool_size,
        )
    }

    async fn recent_reviews(&self, actor_ids: &[String], pool_size: u32) -> Result<Vec<ReviewRow>> {
        self.fetch(
            &self.reviews,
            |r| r.actor_id.as_str(),
            |r| r.created_at,
            actor_ids,
            pool_size,
        )
    }
}

/// Avatar resolver backed by a fixed map; anything absent stays
/// unresolved, exercising the placeholder fallback.
#[derive(Default)]
pub struct FakeAvatars {
    pub urls: HashMap<String, String>,
}

impl FakeAvatars {
    #[allow(dead_code)]
    pub fn with(urls: &[(&str, &str)]) -> Self {
        Self {
            urls: urls
                .iter()
                .map(|(id, url)| (id.to_string(), url.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl AvatarResolver for FakeAvatars {
    async fn resolve_many(&self, actor_ids: &[String]) -> HashMap<String, String> {
        actor_ids
            .iter()
            .filter_map(|id| self.urls.get(id).map(|u| (id.clone(), u.clone())))
            .collect()
    }
}

/// Build a feed service over fakes.
#[allow(dead_code)]
pub fn feed_service(store: Arc<FakeStore>, avatars: Arc<FakeAvatars>) -> FeedService {
    FeedService::new(store, avatars)
}

/// Build a full test app (router + state) over fakes.
#[allow(dead_code)]
pub fn create_test_app(store: Arc<FakeStore>, avatars: Arc<FakeAvatars>) -> axum::Router {
    let state = Arc::new(AppState {
        config: Config::test_default(),
        feed: FeedService::new(store, avatars),
    });
    create_router(state)
}

// ─── Row builders ────────────────────────────────────────────

#[allow(dead_code)]
pub fn song_listen(actor: &str, song: &str, album: &str, mins: i64) -> SongListenRow {
    SongListenRow {
        actor_id: actor.to_string(),
        actor_username: actor.to_string(),
        song_id: song.to_string(),
        song_title: Some(format!("Song {}", song)),
        album_id: Some(album.to_string()),
        album_name: Some(format!("Album {}", album)),
        cover_url: Some(format!("covers/{}.jpg", album)),
        listened_at: ts(mins),
    }
}

#[allow(dead_code)]
pub fn album_listen(actor: &str, album: &str, mins: i64) -> AlbumListenRow {
    AlbumListenRow {
        actor_id: actor.to_string(),
        actor_username: actor.to_string(),
        album_id: album.to_string(),
        album_name: Some(format!("Album {}", album)),
        cover_url: Some(format!("covers/{}.jpg", album)),
        listened_at: ts(mins),
    }
}

#[allow(dead_code)]
pub fn song_rating(actor: &str, song: &str, album: &str, mins: i64, rating: i64) -> SongRatingRow {
    SongRatingRow {
        actor_id: actor.to_string(),
        actor_username: actor.to_string(),
        song_id: song.to_string(),
        song_title: Some(format!("Song {}", song)),
        album_id: Some(album.to_string()),
        album_name: Some(format!("Album {}", album)),
        cover_url: Some(format!("covers/{}.jpg", album)),
        rating,
        rated_at: ts(mins),
    }
}

#[allow(dead_code)]
pub fn album_review(actor: &str, id: &str, album: &str, mins: i64, text: &str) -> ReviewRow {
    ReviewRow {
        id: id.to_string(),
        actor_id: actor.to_string(),
        actor_username: actor.to_string(),
        review_type: "album".to_string(),
        target_id: album.to_string(),
        target_name: Some(format!("Album {}", album)),
        cover_url: Some(format!("covers/{}.jpg", album)),
        rating: None,
        text: text.to_string(),
        album_id: None,
        album_name: None,
        created_at: ts(mins),
    }
}
