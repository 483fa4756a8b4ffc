// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cluster;
pub mod feed;
pub mod normalize;
pub mod sources;

pub use feed::FeedService;
pub use sources::{ActivityStore, AvatarResolver};
