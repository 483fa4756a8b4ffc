// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session-window clustering of normalized activities.
//!
//! Groups activities by (actor, album, time window), merges duplicate
//! targets within a group, and decides whether a group surfaces as a
//! single activity or an aggregated card with a promoted or synthesized
//! headline. Pure, in-memory, single pass over a bounded pool.

use crate::models::{Activity, ActivityKind, TargetType};
use crate::services::normalize::UNKNOWN_ALBUM;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Window for admitting activities into an open group, measured from the
/// group's anchor (its first member), not from the most recent member.
const CLUSTER_WINDOW_MINUTES: i64 = 15;

/// An open cluster group: one actor, one album, one time window.
struct Group {
    actor_id: String,
    album_key: String,
    /// Best-known display name for the album, filled from the first
    /// member that can name it.
    album_name: Option<String>,
    /// Timestamp of the first activity ever placed in this group; the
    /// admission window is fixed to it.
    anchor: DateTime<Utc>,
    /// Number of raw activities admitted, before same-target merging.
    raw_count: usize,
    /// Members, unique per (target_type, target_id).
    members: Vec<Activity>,
}

/// Output slot in first-encounter order: either an activity that could
/// not cluster (no resolvable album) or an open group.
enum Slot {
    Singleton(Activity),
    Group(Group),
}

/// Cluster a normalized pool into group-representative activities.
///
/// The pool is processed in ascending date order (stable), so the
/// "last contributor" in the merge rules is always the most recent one.
/// Output order is first-encounter order; the paginator re-sorts by date.
pub fn cluster_activities(mut pool: Vec<Activity>) -> Vec<Activity> {
    pool.sort_by_key(|a| a.date);

    let window = Duration::minutes(CLUSTER_WINDOW_MINUTES);
    let mut slots: Vec<Slot> = Vec::new();
    // Open groups addressed by (actor_id, album_key); each address can
    // hold several groups whose windows have drifted apart.
    let mut open: HashMap<(String, String), Vec<usize>> = HashMap::new();

    for activity in pool {
        let Some(album_key) = activity.album_key().map(str::to_string) else {
            slots.push(Slot::Singleton(activity));
            continue;
        };

        let addr = (activity.actor_id.clone(), album_key.clone());
        // Pool is ascending, so activity.date >= anchor for every open group.
        let matched = open.get(&addr).and_then(|indices| {
            indices.iter().copied().find(|&i| match &slots[i] {
                Slot::Group(g) => activity.date - g.anchor <= window,
                Slot::Singleton(_) => false,
            })
        });

        match matched {
            Some(i) => {
                if let Slot::Group(group) = &mut slots[i] {
                    group.admit(activity);
                }
            }
            None => {
                let i = slots.len();
                slots.push(Slot::Group(Group::open(album_key, activity)));
                open.entry(addr).or_default().push(i);
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Singleton(activity) => activity,
            Slot::Group(group) => group.into_representative(),
        })
        .collect()
}

impl Group {
    fn open(album_key: String, first: Activity) -> Self {
        Self {
            actor_id: first.actor_id.clone(),
            album_key,
            album_name: album_display_name(&first),
            anchor: first.date,
            raw_count: 1,
            members: vec![first],
        }
    }

    /// Admit one more raw activity, merging it into an existing member
    /// when it describes the same concrete target.
    fn admit(&mut self, activity: Activity) {
        self.raw_count += 1;
        if self.album_name.is_none() {
            self.album_name = album_display_name(&activity);
        }

        let same_target = self
            .members
            .iter_mut()
            .find(|m| m.target_key() == activity.target_key());
        match same_target {
            Some(member) => merge_same_target(member, activity),
            None => self.members.push(activity),
        }
    }

    /// Collapse the group into the single activity the feed shows.
    fn into_representative(mut self) -> Activity {
        // A group holding exactly one raw activity surfaces unchanged.
        if self.raw_count == 1 {
            return self.members.remove(0);
        }

        let headline_idx = self.select_headline();
        match headline_idx {
            Some(i) => {
                let headline = self.members.remove(i);
                if self.members.is_empty() {
                    // Everything merged into the headline itself; nothing
                    // left to aggregate under it.
                    headline
                } else {
                    let children = std::mem::take(&mut self.members);
                    self.build_card(
                        ActivityKind::Grouped {
                            rating: headline.rating(),
                            text: headline.text().map(str::to_string),
                        },
                        &headline,
                        children,
                    )
                }
            }
            None => {
                // No explicit album-level member: synthesize a headline
                // from the group's first member, with rating/text cleared.
                let children = std::mem::take(&mut self.members);
                let first = children[0].clone();
                self.build_card(
                    ActivityKind::Grouped {
                        rating: None,
                        text: None,
                    },
                    &first,
                    children,
                )
            }
        }
    }

    /// Headline priority: album review, then album rating, then any
    /// album-typed member.
    fn select_headline(&self) -> Option<usize> {
        let albums = || {
            self.members
                .iter()
                .enumerate()
                .filter(|(_, m)| m.target_type == TargetType::Album)
        };
        albums()
            .find(|(_, m)| matches!(m.kind, ActivityKind::Review { .. }))
            .or_else(|| albums().find(|(_, m)| matches!(m.kind, ActivityKind::Rating { .. })))
            .or_else(|| albums().next())
            .map(|(i, _)| i)
    }

    fn build_card(
        self,
        kind: ActivityKind,
        headline: &Activity,
        children: Vec<Activity>,
    ) -> Activity {
        // The card sorts by the most recent instant it covers.
        let date = children
            .iter()
            .map(|c| c.date)
            .chain(std::iter::once(headline.date))
            .max()
            .unwrap_or(headline.date);
        let target_name = self
            .album_name
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        Activity {
            id: format!(
                "aggregated-{}-{}-{}",
                self.actor_id,
                self.album_key,
                date.timestamp()
            ),
            actor_id: self.actor_id,
            actor_username: headline.actor_username.clone(),
            actor_avatar_url: None,
            kind,
            target_type: TargetType::Album,
            target_id: self.album_key,
            target_name,
            cover_url: headline.cover_url.clone(),
            date,
            parent_album_id: None,
            parent_album_name: None,
            is_aggregated: true,
            children,
        }
    }
}

/// Merge a later activity for the same target into the running member.
/// Non-empty rating/text from the later contributor win per field; the
/// date takes the maximum; the kind is re-derived from the accumulated
/// fields so a listen is promoted once a rating or review contributes.
fn merge_same_target(member: &mut Activity, incoming: Activity) {
    let rating = incoming.rating().or_else(|| member.rating());
    let text = incoming
        .text()
        .or_else(|| member.text())
        .map(str::to_string);

    member.kind = match (rating, text) {
        (rating, Some(text)) => ActivityKind::Review { rating, text },
        (Some(rating), None) => ActivityKind::Rating { rating },
        (None, None) => ActivityKind::Listen,
    };
    member.date = member.date.max(incoming.date);
    if member.parent_album_name.is_none() {
        member.parent_album_name = incoming.parent_album_name;
    }
}

/// Display name the group should use for its album, taken from the
/// member itself when it targets the album, otherwise from its parent.
fn album_display_name(activity: &Activity) -> Option<String> {
    match activity.target_type {
        TargetType::Album => Some(activity.target_name.clone()),
        TargetType::Song => activity.parent_album_name.clone(),
    }
}
