// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Canonical feed activity model.
//!
//! An [`Activity`] is the unit of feed content: one listen, rating or
//! review by a followed user, or an aggregated card covering a burst of
//! closely-related actions on the same album. Activities are immutable
//! value objects built fresh per request; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What an activity points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Song,
    Album,
}

/// The kind of action an activity records.
///
/// Fields live on the variant that owns them, so a `Listen` cannot carry
/// review text and a `Grouped` headline cannot carry a rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActivityKind {
    /// Plain listen, no extra payload.
    Listen,
    /// A 1-5 star rating.
    Rating { rating: u8 },
    /// A written review; may also carry a rating given alongside it.
    Review {
        #[serde(skip_serializing_if = "Option::is_none")]
        rating: Option<u8>,
        text: String,
    },
    /// Headline of an aggregated card. Carries the rating/text of the
    /// member it was promoted from; both empty when synthesized.
    Grouped {
        #[serde(skip_serializing_if = "Option::is_none")]
        rating: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl ActivityKind {
    /// The rating carried by this kind, if any.
    pub fn rating(&self) -> Option<u8> {
        match self {
            ActivityKind::Listen => None,
            ActivityKind::Rating { rating } => Some(*rating),
            ActivityKind::Review { rating, .. } => *rating,
            ActivityKind::Grouped { rating, .. } => *rating,
        }
    }

    /// The review text carried by this kind, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ActivityKind::Review { text, .. } => Some(text.as_str()),
            ActivityKind::Grouped { text, .. } => text.as_deref(),
            _ => None,
        }
    }
}

/// A single feed entry (leaf or aggregated card).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Stable composite key. `"{kind}-{actor}-{target}-{unix_ts}"` for
    /// listens and ratings, the review's own id for reviews,
    /// `"aggregated-{actor}-{album}-{unix_ts}"` for cards.
    pub id: String,
    pub actor_id: String,
    pub actor_username: String,
    /// Resolved avatar URL; attached after pagination, only for actors
    /// that appear on the final page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_avatar_url: Option<String>,
    #[serde(flatten)]
    pub kind: ActivityKind,
    pub target_type: TargetType,
    pub target_id: String,
    pub target_name: String,
    pub cover_url: String,
    /// Effective time of the activity. For merged/aggregated entries this
    /// is the most recent instant the entry covers.
    pub date: DateTime<Utc>,
    /// Album a song target belongs to; used for clustering, not display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_album_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_album_name: Option<String>,
    pub is_aggregated: bool,
    /// Non-empty iff `is_aggregated`; children are always leaves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Activity>,
}

impl Activity {
    /// The album this activity resolves to for clustering purposes:
    /// the target itself for album activities, the parent album for
    /// song activities, `None` when no album is resolvable.
    pub fn album_key(&self) -> Option<&str> {
        match self.target_type {
            TargetType::Album => Some(self.target_id.as_str()),
            TargetType::Song => self.parent_album_id.as_deref(),
        }
    }

    /// Identity of the concrete thing acted on, for same-target merging.
    pub fn target_key(&self) -> (TargetType, &str) {
        (self.target_type, self.target_id.as_str())
    }

    pub fn rating(&self) -> Option<u8> {
        self.kind.rating()
    }

    pub fn text(&self) -> Option<&str> {
        self.kind.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: ActivityKind) -> Activity {
        Activity {
            id: "listen-u1-s1-0".to_string(),
            actor_id: "u1".to_string(),
            actor_username: "ana".to_string(),
            actor_avatar_url: None,
            kind,
            target_type: TargetType::Song,
            target_id: "s1".to_string(),
            target_name: "Song One".to_string(),
            cover_url: "covers/al1.jpg".to_string(),
            date: DateTime::from_timestamp(0, 0).unwrap(),
            parent_album_id: Some("al1".to_string()),
            parent_album_name: Some("Album One".to_string()),
            is_aggregated: false,
            children: vec![],
        }
    }

    #[test]
    fn test_album_key_prefers_target_for_albums() {
        let mut a = leaf(ActivityKind::Listen);
        a.target_type = TargetType::Album;
        a.target_id = "al9".to_string();
        assert_eq!(a.album_key(), Some("al9"));
    }

    #[test]
    fn test_album_key_uses_parent_for_songs() {
        let a = leaf(ActivityKind::Listen);
        assert_eq!(a.album_key(), Some("al1"));

        let mut orphan = leaf(ActivityKind::Listen);
        orphan.parent_album_id = None;
        assert_eq!(orphan.album_key(), None);
    }

    #[test]
    fn test_kind_serializes_flattened() {
        let a = leaf(ActivityKind::Rating { rating: 4 });
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["kind"], "rating");
        assert_eq!(json["rating"], 4);
        // A listen carries no rating or text fields at all.
        let l = serde_json::to_value(leaf(ActivityKind::Listen)).unwrap();
        assert_eq!(l["kind"], "listen");
        assert!(l.get("rating").is_none());
        assert!(l.get("text").is_none());
    }

    #[test]
    fn test_review_accessors() {
        let a = leaf(ActivityKind::Review {
            rating: Some(5),
            text: "great record".to_string(),
        });
        assert_eq!(a.rating(), Some(5));
        assert_eq!(a.text(), Some("great record"));
    }
}
