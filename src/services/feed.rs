// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Followed-activity feed assembly.
//!
//! The full pipeline for one request:
//! 1. Resolve the viewer's follow set
//! 2. Concurrent fan-out fetch across the five event sources
//! 3. Normalize rows into canonical activities
//! 4. Cluster into group representatives
//! 5. Sort and slice the requested page
//! 6. Attach avatars for the actors on that page
//!
//! The engine is a pure function of (viewer, limit, offset) plus the
//! sources' state at call time; nothing is written and nothing is cached
//! across requests. Cancellation is owned by the caller: dropping the
//! future aborts the in-flight fetches.

use crate::error::{AppError, Result};
use crate::models::Activity;
use crate::services::cluster::cluster_activities;
use crate::services::normalize;
use crate::services::sources::{ActivityStore, AvatarResolver};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Clustering is lossy, so each source is over-provisioned relative to
/// the requested range. Scaled by offset + limit so deep pages do not
/// starve after aggregation collapses rows.
const OVERFETCH_FACTOR: u32 = 3;

/// Avatar used when resolution fails for an actor.
const AVATAR_PLACEHOLDER: &str = "/images/avatar-placeholder.png";

/// Builds the followed-activity feed for a viewer.
pub struct FeedService {
    store: Arc<dyn ActivityStore>,
    avatars: Arc<dyn AvatarResolver>,
}

impl FeedService {
    pub fn new(store: Arc<dyn ActivityStore>, avatars: Arc<dyn AvatarResolver>) -> Self {
        Self { store, avatars }
    }

    /// The feed page `[offset, offset + limit)` of what the viewer's
    /// followed users have been doing, most recent first.
    ///
    /// An empty follow set yields an empty feed without touching the
    /// event sources. A failed source fetch fails the whole call; an
    /// empty feed is never silently substituted for an error.
    pub async fn recent_followed_activities(
        &self,
        viewer_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Activity>> {
        let follow_ids = self.store.followed_ids(viewer_id).await?;
        if follow_ids.is_empty() {
            tracing::debug!(viewer_id, "Viewer follows nobody; empty feed");
            return Ok(Vec::new());
        }

        let pool_size = offset
            .saturating_add(limit)
            .saturating_mul(OVERFETCH_FACTOR);
        tracing::debug!(
            viewer_id,
            followed = follow_ids.len(),
            limit,
            offset,
            pool_size,
            "Fetching activity pools"
        );

        // Scatter-gather barrier: all five fetches run concurrently and
        // the first failure aborts the whole call.
        let (song_listens, album_listens, song_ratings, album_ratings, reviews) = tokio::try_join!(
            self.store.recent_song_listens(&follow_ids, pool_size),
            self.store.recent_album_listens(&follow_ids, pool_size),
            self.store.recent_song_ratings(&follow_ids, pool_size),
            self.store.recent_album_ratings(&follow_ids, pool_size),
            self.store.recent_reviews(&follow_ids, pool_size),
        )
        .map_err(|e| AppError::SourceFetch(e.to_string()))?;

        let mut pool = Vec::with_capacity(
            song_listens.len()
                + album_listens.len()
                + song_ratings.len()
                + album_ratings.len()
                + reviews.len(),
        );
        pool.extend(song_listens.into_iter().map(normalize::from_song_listen));
        pool.extend(album_listens.into_iter().map(normalize::from_album_listen));
        pool.extend(song_ratings.into_iter().map(normalize::from_song_rating));
        pool.extend(album_ratings.into_iter().map(normalize::from_album_rating));
        pool.extend(reviews.into_iter().map(normalize::from_review));

        let raw_count = pool.len();
        let representatives = cluster_activities(pool);
        tracing::debug!(
            viewer_id,
            raw = raw_count,
            clustered = representatives.len(),
            "Clustered activity pool"
        );

        let mut page = paginate(representatives, limit, offset);
        self.attach_avatars(&mut page).await;
        Ok(page)
    }

    /// Resolve avatars for the distinct actors on the final page only
    /// (never the whole pool) and attach them everywhere, children
    /// included. Unresolved actors fall back to a placeholder.
    async fn attach_avatars(&self, page: &mut [Activity]) {
        let actor_ids: BTreeSet<String> = page
            .iter()
            .flat_map(|a| {
                std::iter::once(a.actor_id.clone())
                    .chain(a.children.iter().map(|c| c.actor_id.clone()))
            })
            .collect();
        if actor_ids.is_empty() {
            return;
        }

        let actor_ids: Vec<String> = actor_ids.into_iter().collect();
        let resolved = self.avatars.resolve_many(&actor_ids).await;

        let url_for = |actor_id: &str| {
            resolved
                .get(actor_id)
                .cloned()
                .unwrap_or_else(|| AVATAR_PLACEHOLDER.to_string())
        };
        for activity in page.iter_mut() {
            activity.actor_avatar_url = Some(url_for(&activity.actor_id));
            for child in activity.children.iter_mut() {
                child.actor_avatar_url = Some(url_for(&child.actor_id));
            }
        }
    }
}

/// Sort representatives by date descending (stable, so ties keep their
/// insertion order) and slice the requested page.
pub fn paginate(mut representatives: Vec<Activity>, limit: u32, offset: u32) -> Vec<Activity> {
    representatives.sort_by(|a, b| b.date.cmp(&a.date));
    representatives
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityKind, TargetType};
    use chrono::DateTime;

    fn activity(id: &str, secs: i64) -> Activity {
        Activity {
            id: id.to_string(),
            actor_id: "u1".to_string(),
            actor_username: "ana".to_string(),
            actor_avatar_url: None,
            kind: ActivityKind::Listen,
            target_type: TargetType::Album,
            target_id: "al1".to_string(),
            target_name: "Album".to_string(),
            cover_url: String::new(),
            date: DateTime::from_timestamp(secs, 0).unwrap(),
            parent_album_id: None,
            parent_album_name: None,
            is_aggregated: false,
            children: vec![],
        }
    }

    #[test]
    fn test_paginate_sorts_descending() {
        let page = paginate(
            vec![activity("a", 10), activity("b", 30), activity("c", 20)],
            10,
            0,
        );
        let ids: Vec<&str> = page.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_paginate_slices_requested_range() {
        let reps: Vec<Activity> = (0..10)
            .map(|i| activity(&format!("a{}", i), 100 - i))
            .collect();
        let page = paginate(reps.clone(), 3, 2);
        let ids: Vec<&str> = page.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a2", "a3", "a4"]);

        // Offset past the end yields an empty page, not an error.
        assert!(paginate(reps, 3, 50).is_empty());
    }

    #[test]
    fn test_paginate_ties_keep_insertion_order() {
        let page = paginate(
            vec![activity("first", 5), activity("second", 5)],
            10,
            0,
        );
        let ids: Vec<&str> = page.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
    }
}
