// Copyright © Roundtable 2026-present

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//    https://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-game event log and used-card set.
//!
//! The log is the authority: the in-memory aggregate is an optimization and
//! may be discarded and rebuilt at any time by folding events in order.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{CardId, EventId, GameEvent, GameId};

pub mod in_memory;
pub mod sled_log;

/// Append-only per-game event stream plus the derived used-card set. The
/// used-card set is a derived index but part of the log's contract because
/// it is consulted while constructing new events.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Appends `event`, atomic and order-preserving per game id.
    async fn append(&self, event: &GameEvent) -> Result<()>;

    /// The full ordered sequence of events for a game.
    async fn events_for(&self, game_id: GameId) -> Result<Vec<GameEvent>>;

    /// Events for a game with `created_at >= since`.
    async fn events_since(&self, game_id: GameId, since: DateTime<Utc>) -> Result<Vec<GameEvent>>;

    /// Direct lookup of a single event by id.
    async fn event_by_id(&self, event_id: EventId) -> Result<Option<GameEvent>>;

    /// Purges a game's events, called 30s after it finishes.
    async fn delete_all(&self, game_id: GameId) -> Result<()>;

    /// Adds card ids to the used-card set for a game, in one batch.
    async fn add_used(&self, game_id: GameId, ids: &[CardId]) -> Result<()>;

    /// The current used-card set for a game.
    async fn get_used(&self, game_id: GameId) -> Result<HashSet<CardId>>;

    /// Clears the used-card set, called when a `Shuffle` event is applied.
    async fn clear_used(&self, game_id: GameId) -> Result<()>;
}
