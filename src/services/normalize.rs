// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalization of raw source rows into canonical [`Activity`] values.
//!
//! Pure mapping, no I/O. Ids are deterministic: the same raw row always
//! normalizes to the same activity.

use crate::models::{Activity, ActivityKind, TargetType};
use crate::services::sources::{
    AlbumListenRow, AlbumRatingRow, ReviewRow, SongListenRow, SongRatingRow,
};
use chrono::{DateTime, Utc};

/// Fallback labels for missing joined metadata. A broken join degrades
/// the row, it never fails it.
pub const UNKNOWN_SONG: &str = "Unknown Song";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
const COVER_PLACEHOLDER: &str = "/images/cover-placeholder.png";

/// Composite id for non-review activities.
fn composite_id(kind: &str, actor_id: &str, target_id: &str, date: DateTime<Utc>) -> String {
    format!("{}-{}-{}-{}", kind, actor_id, target_id, date.timestamp())
}

fn clamp_rating(raw: i64) -> u8 {
    raw.clamp(1, 5) as u8
}

pub fn from_song_listen(row: SongListenRow) -> Activity {
    Activity {
        id: composite_id("listen", &row.actor_id, &row.song_id, row.listened_at),
        actor_id: row.actor_id,
        actor_username: row.actor_username,
        actor_avatar_url: None,
        kind: ActivityKind::Listen,
        target_type: TargetType::Song,
        target_id: row.song_id,
        target_name: row.song_title.unwrap_or_else(|| UNKNOWN_SONG.to_string()),
        cover_url: row
            .cover_url
            .unwrap_or_else(|| COVER_PLACEHOLDER.to_string()),
        date: row.listened_at,
        parent_album_id: row.album_id,
        parent_album_name: row.album_name,
        is_aggregated: false,
        children: vec![],
    }
}

pub fn from_album_listen(row: AlbumListenRow) -> Activity {
    Activity {
        id: composite_id("listen", &row.actor_id, &row.album_id, row.listened_at),
        actor_id: row.actor_id,
        actor_username: row.actor_username,
        actor_avatar_url: None,
        kind: ActivityKind::Listen,
        target_type: TargetType::Album,
        target_id: row.album_id,
        target_name: row.album_name.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
        cover_url: row
            .cover_url
            .unwrap_or_else(|| COVER_PLACEHOLDER.to_string()),
        date: row.listened_at,
        parent_album_id: None,
        parent_album_name: None,
        is_aggregated: false,
        children: vec![],
    }
}

pub fn from_song_rating(row: SongRatingRow) -> Activity {
    Activity {
        id: composite_id("rating", &row.actor_id, &row.song_id, row.rated_at),
        actor_id: row.actor_id,
        actor_username: row.actor_username,
        actor_avatar_url: None,
        kind: ActivityKind::Rating {
            rating: clamp_rating(row.rating),
        },
        target_type: TargetType::Song,
        target_id: row.song_id,
        target_name: row.song_title.unwrap_or_else(|| UNKNOWN_SONG.to_string()),
        cover_url: row
            .cover_url
            .unwrap_or_else(|| COVER_PLACEHOLDER.to_string()),
        date: row.rated_at,
        parent_album_id: row.album_id,
        parent_album_name: row.album_name,
        is_aggregated: false,
        children: vec![],
    }
}

pub fn from_album_rating(row: AlbumRatingRow) -> Activity {
    Activity {
        id: composite_id("rating", &row.actor_id, &row.album_id, row.rated_at),
        actor_id: row.actor_id,
        actor_username: row.actor_username,
        actor_avatar_url: None,
        kind: ActivityKind::Rating {
            rating: clamp_rating(row.rating),
        },
        target_type: TargetType::Album,
        target_id: row.album_id,
        target_name: row.album_name.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
        cover_url: row
            .cover_url
            .unwrap_or_else(|| COVER_PLACEHOLDER.to_string()),
        date: row.rated_at,
        parent_album_id: None,
        parent_album_name: None,
        is_aggregated: false,
        children: vec![],
    }
}

pub fn from_review(row: ReviewRow) -> Activity {
    // The review's own type field decides the target type; anything
    // unrecognized is treated as a song review.
    let target_type = if row.review_type.eq_ignore_ascii_case("album") {
        TargetType::Album
    } else {
        TargetType::Song
    };
    let fallback = match target_type {
        TargetType::Song => UNKNOWN_SONG,
        TargetType::Album => UNKNOWN_ALBUM,
    };
    let (parent_album_id, parent_album_name) = match target_type {
        TargetType::Song => (row.album_id, row.album_name),
        TargetType::Album => (None, None),
    };

    Activity {
        id: row.id,
        actor_id: row.actor_id,
        actor_username: row.actor_username,
        actor_avatar_url: None,
        kind: ActivityKind::Review {
            rating: row.rating.map(clamp_rating),
            text: row.text,
        },
        target_type,
        target_id: row.target_id,
        target_name: row.target_name.unwrap_or_else(|| fallback.to_string()),
        cover_url: row
            .cover_url
            .unwrap_or_else(|| COVER_PLACEHOLDER.to_string()),
        date: row.created_at,
        parent_album_id,
        parent_album_name,
        is_aggregated: false,
        children: vec![],
    }
}
