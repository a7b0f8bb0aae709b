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

//! The closed set of typed events that drive the game aggregate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::primitives::{CardId, EventId, GameId, UserId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameBeginsPayload {
    pub initiator_user_id: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinedGamePayload {
    pub user_id: UserId,
    pub name: String,
    pub image: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShufflePayload {
    pub seed: u64,
    pub shuffle_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DealCardsPayload {
    pub player_id: UserId,
    pub card_ids: Vec<CardId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DrawBlackCardPayload {
    pub card_id: CardId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetJudgePayload {
    pub player_id: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardPlayedPayload {
    pub user_id: UserId,
    pub card_id: CardId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeChoseWinningCardPayload {
    pub card_id: CardId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundContinuedPayload {
    pub player_hand_refills: HashMap<UserId, CardId>,
    pub black_card_id: CardId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameWinnerPayload {
    pub user_id: UserId,
    pub score: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClockUpdatePayload {
    pub next_auto_progress_at: DateTime<Utc>,
}

/// The closed set of events the aggregate knows how to apply. Any other
/// shape arriving from the log is a fatal error.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum GameEventPayload {
    GameBegins(GameBeginsPayload),
    JoinedGame(JoinedGamePayload),
    Shuffle(ShufflePayload),
    DealCards(DealCardsPayload),
    DrawBlackCard(DrawBlackCardPayload),
    SetJudge(SetJudgePayload),
    CardPlayed(CardPlayedPayload),
    JudgeChoseWinningCard(JudgeChoseWinningCardPayload),
    RoundContinued(RoundContinuedPayload),
    GameWinner(GameWinnerPayload),
    ClockUpdate(ClockUpdatePayload),
}

impl GameEventPayload {
    pub fn type_name(&self) -> &'static str {
        match self {
            GameEventPayload::GameBegins(_) => "GameBegins",
            GameEventPayload::JoinedGame(_) => "JoinedGame",
            GameEventPayload::Shuffle(_) => "Shuffle",
            GameEventPayload::DealCards(_) => "DealCards",
            GameEventPayload::DrawBlackCard(_) => "DrawBlackCard",
            GameEventPayload::SetJudge(_) => "SetJudge",
            GameEventPayload::CardPlayed(_) => "CardPlayed",
            GameEventPayload::JudgeChoseWinningCard(_) => "JudgeChoseWinningCard",
            GameEventPayload::RoundContinued(_) => "RoundContinued",
            GameEventPayload::GameWinner(_) => "GameWinner",
            GameEventPayload::ClockUpdate(_) => "ClockUpdate",
        }
    }
}

/// A single appended record. `payload` carries the typed
/// event; the database crate is responsible for the opaque-bytes encoding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: EventId,
    pub game_id: GameId,
    pub created_at: DateTime<Utc>,
    pub payload: GameEventPayload,
}

impl GameEvent {
    pub fn new(game_id: GameId, created_at: DateTime<Utc>, payload: GameEventPayload) -> Self {
        Self { id: EventId::generate(), game_id, created_at, payload }
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }
}
