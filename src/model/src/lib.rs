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

//! Data types for the game aggregate: cards, players, events, and the
//! aggregate itself. This crate has no I/O; it is pure state and pure
//! functions over that state.

pub mod card;
pub mod collection;
pub mod events;
pub mod game_state;
pub mod player;
pub mod primitives;

pub use card::{Card, CardType};
pub use collection::Collection;
pub use events::{
    CardPlayedPayload, ClockUpdatePayload, DealCardsPayload, DrawBlackCardPayload, GameBeginsPayload,
    GameEvent, GameEventPayload, GameWinnerPayload, JoinedGamePayload, JudgeChoseWinningCardPayload,
    RoundContinuedPayload, SetJudgePayload, ShufflePayload,
};
pub use game_state::{GameState, RoundStatus, Status};
pub use player::Player;
pub use primitives::{CardId, EventId, GameId, UserId};
