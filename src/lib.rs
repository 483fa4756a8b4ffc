// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Crescendo: backend for a social music-review application.
//!
//! The algorithmic core is the followed-activity feed aggregator: it
//! fans out across the five activity event sources, normalizes the raw
//! rows, clusters closely-related actions into display cards and serves
//! the paginated result.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::FeedService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub feed: FeedService,
}
