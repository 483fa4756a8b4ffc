// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Followed-activity feed endpoint.

use crate::error::{AppError, Result};
use crate::models::Activity;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_LIMIT: u32 = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/feed", get(get_feed))
}

#[derive(Deserialize)]
struct FeedQuery {
    /// Whose feed to build. Authentication happens upstream; this
    /// service trusts the id it is handed.
    viewer_id: String,
    /// Page size
    #[serde(default = "default_limit")]
    limit: u32,
    /// Number of post-aggregation entries to skip
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub activities: Vec<Activity>,
    pub limit: u32,
    pub offset: u32,
}

/// Get the reverse-chronological, aggregated feed of followed users'
/// activity.
async fn get_feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedQuery>,
) -> Result<Json<FeedResponse>> {
    if params.viewer_id.trim().is_empty() {
        return Err(AppError::BadRequest("viewer_id must not be empty".to_string()));
    }
    if params.limit == 0 || params.limit > MAX_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    tracing::debug!(
        viewer_id = %params.viewer_id,
        limit = params.limit,
        offset = params.offset,
        "Fetching followed-activity feed"
    );

    let activities = state
        .feed
        .recent_followed_activities(&params.viewer_id, params.limit, params.offset)
        .await?;

    Ok(Json(FeedResponse {
        activities,
        limit: params.limit,
        offset: params.offset,
    }))
}
