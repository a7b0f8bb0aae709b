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

//! The full aggregate snapshot sent to clients in a `GAME_UPDATE` frame.
//! Field names are `snake_case`; timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use model::{Card, CardId, CardType, GameState, RoundStatus, Status, UserId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub id: CardId,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub card_value: String,
}

impl From<&Card> for CardSnapshot {
    fn from(card: &Card) -> Self {
        Self { id: card.id.clone(), card_type: card.card_type, card_value: card.text.clone() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub cards: Vec<CardSnapshot>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub user_id: UserId,
    pub name: String,
    pub image: String,
    pub score: u32,
    pub hand: Vec<CardSnapshot>,
    pub placed_card: Option<CardSnapshot>,
    pub is_judge: bool,
    pub was_judge: bool,
    pub is_owner: bool,
    pub is_round_winner: bool,
    pub is_game_winner: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: String,
    pub name: String,
    pub collection: CollectionSnapshot,
    pub winner_count: u32,
    pub max_player_count: usize,
    pub status: Status,
    pub players: Vec<PlayerSnapshot>,
    pub white_cards: Vec<CardSnapshot>,
    pub black_card: Option<CardSnapshot>,
    pub round_status: RoundStatus,
    pub current_game_round: u32,
    pub round_winner: Option<UserId>,
    pub next_auto_progress_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Renders the live aggregate into the wire snapshot. Per the core's
/// fairness stance, hands are carried through unredacted; any
/// per-connection redaction is a client or gateway concern.
pub fn build(game: &GameState) -> GameSnapshot {
    let card_snapshot = |id: &CardId| -> Option<CardSnapshot> { game.collection.by_id(id).map(CardSnapshot::from) };

    GameSnapshot {
        id: game.id.to_string(),
        name: game.name.clone(),
        collection: CollectionSnapshot {
            cards: game.collection.cards().iter().map(CardSnapshot::from).collect(),
        },
        winner_count: game.winner_score,
        max_player_count: game.max_players,
        status: game.status,
        players: game
            .players
            .iter()
            .map(|player| PlayerSnapshot {
                user_id: player.user_id.clone(),
                name: player.name.clone(),
                image: player.image.clone(),
                score: player.score,
                hand: player.hand.iter().filter_map(|id| card_snapshot(id)).collect(),
                placed_card: player.placed_card.as_ref().and_then(|id| card_snapshot(id)),
                is_judge: player.is_judge,
                was_judge: player.was_judge,
                is_owner: player.is_owner,
                is_round_winner: player.is_round_winner,
                is_game_winner: player.is_game_winner,
            })
            .collect(),
        white_cards: game.board_white_cards.iter().filter_map(|id| card_snapshot(id)).collect(),
        black_card: game.black_card.as_ref().and_then(|id| card_snapshot(id)),
        round_status: game.round_status,
        current_game_round: game.round_index,
        round_winner: game.round_winner.clone(),
        next_auto_progress_at: game.next_auto_progress_at,
        created_at: game.created_at,
        updated_at: game.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use model::{Collection, GameId};

    use super::*;

    #[test]
    fn snapshot_carries_status_and_round_status_as_pascal_case_strings() {
        let game = GameState::new(
            GameId::generate(),
            "room",
            Collection::new(vec![Card::new("B1", CardType::Black, "prompt")]),
            5,
            4,
            UserId::new("u1"),
            "U1",
            "img",
            Utc::now(),
        );
        let snapshot = build(&game);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"status\":\"Setup\""));
        assert!(json.contains("\"round_status\":\"Waiting\""));
    }

    #[test]
    fn hand_cards_are_resolved_to_full_card_values() {
        let mut game = GameState::new(
            GameId::generate(),
            "room",
            Collection::new(vec![Card::new("W1", CardType::White, "an answer")]),
            5,
            4,
            UserId::new("u1"),
            "U1",
            "img",
            Utc::now(),
        );
        game.players[0].hand.push(CardId::new("W1"));
        let snapshot = build(&game);
        assert_eq!(snapshot.players[0].hand.len(), 1);
        assert_eq!(snapshot.players[0].hand[0].card_value, "an answer");
    }
}
