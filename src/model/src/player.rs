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

//! Per-user round-local state.

use serde::{Deserialize, Serialize};

use crate::primitives::{CardId, UserId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub user_id: UserId,
    pub name: String,
    pub image: String,
    pub score: u32,
    pub hand: Vec<CardId>,
    pub placed_card: Option<CardId>,
    pub is_judge: bool,
    pub was_judge: bool,
    pub is_owner: bool,
    pub is_round_winner: bool,
    pub is_game_winner: bool,
}

impl Player {
    pub fn new(user_id: UserId, name: impl Into<String>, image: impl Into<String>, is_owner: bool) -> Self {
        Self {
            user_id,
            name: name.into(),
            image: image.into(),
            score: 0,
            hand: Vec::new(),
            placed_card: None,
            is_judge: false,
            was_judge: false,
            is_owner,
            is_round_winner: false,
            is_game_winner: false,
        }
    }

    pub fn holds(&self, card_id: &CardId) -> bool {
        self.hand.iter().any(|c| c == card_id)
    }

    /// Removes `card_id` from the hand. Returns `false` if it was not held.
    pub fn remove_from_hand(&mut self, card_id: &CardId) -> bool {
        if let Some(index) = self.hand.iter().position(|c| c == card_id) {
            self.hand.remove(index);
            true
        } else {
            false
        }
    }

    pub fn clear_round_state(&mut self) {
        self.placed_card = None;
        self.is_round_winner = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new(UserId::new("u1"), "Ada", "https://img/ada.png", true)
    }

    #[test]
    fn removes_held_card() {
        let mut p = player();
        p.hand.push(CardId::new("W1"));
        p.hand.push(CardId::new("W2"));
        assert!(p.remove_from_hand(&CardId::new("W1")));
        assert_eq!(p.hand, vec![CardId::new("W2")]);
    }

    #[test]
    fn remove_of_missing_card_is_noop() {
        let mut p = player();
        p.hand.push(CardId::new("W1"));
        assert!(!p.remove_from_hand(&CardId::new("W9")));
        assert_eq!(p.hand.len(), 1);
    }

    #[test]
    fn clear_round_state_resets_placed_card_and_winner_flag() {
        let mut p = player();
        p.placed_card = Some(CardId::new("W1"));
        p.is_round_winner = true;
        p.clear_round_state();
        assert!(p.placed_card.is_none());
        assert!(!p.is_round_winner);
    }
}
