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

//! In-memory [EventLog] used by coordinator and hub tests so they don't
//! need a real `sled` database on disk.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use model::{CardId, EventId, GameEvent, GameId};

use crate::EventLog;

#[derive(Default)]
pub struct InMemoryEventLog {
    events: DashMap<GameId, Vec<GameEvent>>,
    used_cards: DashMap<GameId, HashSet<CardId>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: &GameEvent) -> Result<()> {
        self.events.entry(event.game_id).or_default().push(event.clone());
        Ok(())
    }

    async fn events_for(&self, game_id: GameId) -> Result<Vec<GameEvent>> {
        Ok(self.events.get(&game_id).map(|entry| entry.clone()).unwrap_or_default())
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
        for entry in self.events.iter() {
            if let Some(event) = entry.value().iter().find(|e| e.id == event_id) {
                return Ok(Some(event.clone()));
            }
        }
        Ok(None)
    }

    async fn delete_all(&self, game_id: GameId) -> Result<()> {
        self.events.remove(&game_id);
        self.used_cards.remove(&game_id);
        Ok(())
    }

    async fn add_used(&self, game_id: GameId, ids: &[CardId]) -> Result<()> {
        self.used_cards.entry(game_id).or_default().extend(ids.iter().cloned());
        Ok(())
    }

    async fn get_used(&self, game_id: GameId) -> Result<HashSet<CardId>> {
        Ok(self.used_cards.get(&game_id).map(|entry| entry.clone()).unwrap_or_default())
    }

    async fn clear_used(&self, game_id: GameId) -> Result<()> {
        self.used_cards.insert(game_id, HashSet::new());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use model::{CardPlayedPayload, GameEventPayload, UserId};

    use super::*;

    fn event(game_id: GameId, created_at: DateTime<Utc>) -> GameEvent {
        GameEvent::new(
            game_id,
            created_at,
            GameEventPayload::CardPlayed(CardPlayedPayload {
                user_id: UserId::new("u1"),
                card_id: CardId::new("W1"),
            }),
        )
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let log = InMemoryEventLog::new();
        let game_id = GameId::generate();
        let t0 = Utc::now();
        let e1 = event(game_id, t0);
        let e2 = event(game_id, t0 + chrono::Duration::seconds(1));
        log.append(&e1).await.unwrap();
        log.append(&e2).await.unwrap();
        let events = log.events_for(game_id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, e1.id);
        assert_eq!(events[1].id, e2.id);
    }

    #[tokio::test]
    async fn used_cards_accumulate_and_clear() {
        let log = InMemoryEventLog::new();
        let game_id = GameId::generate();
        log.add_used(game_id, &[CardId::new("W1"), CardId::new("W2")]).await.unwrap();
        assert_eq!(log.get_used(game_id).await.unwrap().len(), 2);
        log.clear_used(game_id).await.unwrap();
        assert!(log.get_used(game_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_all_purges_events_and_used_cards() {
        let log = InMemoryEventLog::new();
        let game_id = GameId::generate();
        log.append(&event(game_id, Utc::now())).await.unwrap();
        log.add_used(game_id, &[CardId::new("W1")]).await.unwrap();
        log.delete_all(game_id).await.unwrap();
        assert!(log.events_for(game_id).await.unwrap().is_empty());
        assert!(log.get_used(game_id).await.unwrap().is_empty());
    }
}
