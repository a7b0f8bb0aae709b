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

//! Immutable card values.

use serde::{Deserialize, Serialize};

use crate::primitives::CardId;

/// The two card colors. Black cards are prompts with blanks; White cards are
/// answers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CardType {
    Black,
    White,
}

/// A single immutable card. Cards never change after the `DeckGenerator`
/// produces them; rounds only move their id between zones (hand, board,
/// black-card slot).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub card_type: CardType,
    pub text: String,
}

impl Card {
    pub fn new(id: impl Into<CardId>, card_type: CardType, text: impl Into<String>) -> Self {
        Self { id: id.into(), card_type, text: text.into() }
    }

    pub fn is_black(&self) -> bool {
        self.card_type == CardType::Black
    }

    pub fn is_white(&self) -> bool {
        self.card_type == CardType::White
    }
}

impl From<String> for CardId {
    fn from(value: String) -> Self {
        CardId::new(value)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        CardId::new(value)
    }
}
