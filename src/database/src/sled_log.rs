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

//! `sled`-backed [EventLog] implementation.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{CardId, EventId, GameEvent, GameId};
use once_cell::sync::Lazy;
use serde_json::{de, ser};
use sled::{Db, Tree};
use with_error::WithError;

use crate::EventLog;

static DATABASE: Lazy<Db> =
    Lazy::new(|| sled::open("roundtable-db").expect("unable to open event log database"));

pub struct SledEventLog;

impl SledEventLog {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SledEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLog for SledEventLog {
    async fn append(&self, event: &GameEvent) -> Result<()> {
        let key = event_key(event.game_id, event.created_at, event.id);
        let bytes =
            ser::to_vec(event).with_error(|| format!("error serializing event {}", event.id))?;
        events()?.insert(&key, bytes.clone())?;
        index()?.insert(event_id_key(event.id), key)?;
        Ok(())
    }

    async fn events_for(&self, game_id: GameId) -> Result<Vec<GameEvent>> {
        let prefix = game_prefix(game_id);
        let mut out = Vec::new();
        for entry in events()?.scan_prefix(&prefix) {
            let (_, value) = entry.with_error(|| format!("error scanning events for {game_id}"))?;
            out.push(de::from_slice(&value).with_error(|| "error deserializing event")?);
        }
        Ok(out)
    }

    async fn events_since(&self, game_id: GameId, since: DateTime<Utc>) -> Result<Vec<GameEvent>> {
        Ok(self
            .events_for(game_id)
            .await?
            .into_iter()
            .filter(|event| event.created_at >= since)
            .collect())
    }

    async fn event_by_id(&self, event_id: EventId) -> Result<Option<GameEvent>> {
        let Some(key) = index()?.get(event_id_key(event_id))? else {
            return Ok(None);
        };
        let Some(value) = events()?.get(key)? else {
            return Ok(None);
        };
        Ok(Some(de::from_slice(&value).with_error(|| "error deserializing event")?))
    }

    async fn delete_all(&self, game_id: GameId) -> Result<()> {
        let prefix = game_prefix(game_id);
        let keys: Vec<_> = events()?.scan_prefix(&prefix).keys().collect::<std::result::Result<_, _>>()?;
        for key in keys {
            events()?.remove(key)?;
        }
        used_cards()?.remove(game_id.to_string().as_bytes())?;
        Ok(())
    }

    async fn add_used(&self, game_id: GameId, ids: &[CardId]) -> Result<()> {
        let mut current = self.get_used(game_id).await?;
        current.extend(ids.iter().cloned());
        put_used(game_id, &current)
    }

    async fn get_used(&self, game_id: GameId) -> Result<HashSet<CardId>> {
        match used_cards()?.get(game_id.to_string().as_bytes())? {
            Some(bytes) => Ok(de::from_slice(&bytes).with_error(|| "error deserializing used-card set")?),
            None => Ok(HashSet::new()),
        }
    }

    async fn clear_used(&self, game_id: GameId) -> Result<()> {
        used_cards()?.remove(game_id.to_string().as_bytes())?;
        Ok(())
    }
}

fn put_used(game_id: GameId, ids: &HashSet<CardId>) -> Result<()> {
    let bytes = ser::to_vec(ids).with_error(|| "error serializing used-card set")?;
    used_cards()?.insert(game_id.to_string().as_bytes(), bytes)?;
    Ok(())
}

fn events() -> Result<Tree> {
    DATABASE.open_tree("events").with_error(|| "error opening the 'events' tree")
}

fn index() -> Result<Tree> {
    DATABASE.open_tree("event_index").with_error(|| "error opening the 'event_index' tree")
}

fn used_cards() -> Result<Tree> {
    DATABASE.open_tree("used_cards").with_error(|| "error opening the 'used_cards' tree")
}

fn game_prefix(game_id: GameId) -> Vec<u8> {
    let mut key = game_id.to_string().into_bytes();
    key.push(0);
    key
}

/// `game_id | 0x00 | created_at (nanos, big-endian) | event_id`. sled keeps
/// keys within a tree sorted lexicographically, so scanning this prefix
/// yields events for one game in append order.
fn event_key(game_id: GameId, created_at: DateTime<Utc>, event_id: EventId) -> Vec<u8> {
    let mut key = game_prefix(game_id);
    key.extend_from_slice(&created_at.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
    key.extend_from_slice(event_id.to_string().as_bytes());
    key
}

fn event_id_key(event_id: EventId) -> Vec<u8> {
    event_id.to_string().into_bytes()
}
