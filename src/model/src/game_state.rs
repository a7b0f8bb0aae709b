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

//! The game aggregate: authoritative round state and its event application.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use with_error::{CoordinatorError, CoordinatorResult};

use crate::card::CardType;
use crate::collection::Collection;
use crate::events::{GameEvent, GameEventPayload};
use crate::player::Player;
use crate::primitives::{CardId, GameId, UserId};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Status {
    Setup,
    InProgress,
    Finished,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RoundStatus {
    Waiting,
    PlayersPickingCard,
    JudgePickingWinningCard,
    JudgeChoseWinningCard,
    GameOver,
}

/// The authoritative, in-memory materialization of one game. Mutated
/// exclusively through [GameState::apply].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub id: GameId,
    pub name: String,
    pub collection: Collection,
    pub winner_score: u32,
    pub max_players: usize,
    pub status: Status,
    pub players: Vec<Player>,
    pub board_white_cards: Vec<CardId>,
    pub used_cards: HashSet<CardId>,
    pub black_card: Option<CardId>,
    pub round_status: RoundStatus,
    pub round_index: u32,
    pub round_winner: Option<UserId>,
    pub next_auto_progress_at: Option<DateTime<Utc>>,
    pub last_event_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameState {
    /// Constructs a brand-new game in `Setup` with the owner as its sole
    /// player. `CreateGame` is a direct constructor, not an
    /// event.
    pub fn new(
        id: GameId,
        name: impl Into<String>,
        collection: Collection,
        winner_score: u32,
        max_players: usize,
        owner: UserId,
        owner_name: impl Into<String>,
        owner_image: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let owner_player = Player::new(owner, owner_name, owner_image, true);
        Self {
            id,
            name: name.into(),
            collection,
            winner_score,
            max_players,
            status: Status::Setup,
            players: vec![owner_player],
            board_white_cards: Vec::new(),
            used_cards: HashSet::new(),
            black_card: None,
            round_status: RoundStatus::Waiting,
            round_index: 0,
            round_winner: None,
            next_auto_progress_at: None,
            last_event_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn player(&self, user_id: &UserId) -> Option<&Player> {
        self.players.iter().find(|p| &p.user_id == user_id)
    }

    pub fn player_mut(&mut self, user_id: &UserId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.user_id == user_id)
    }

    pub fn judge(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_judge)
    }

    pub fn non_judges(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.is_judge)
    }

    /// Count of cards of `card_type` in the collection that have not been
    /// drawn since the last `Shuffle`.
    pub fn unused_count(&self, card_type: CardType) -> usize {
        self.collection
            .iter_of_type(card_type)
            .filter(|c| !self.used_cards.contains(&c.id))
            .count()
    }

    /// Applies a single event, mutating the aggregate in place. On failure
    /// the aggregate is left unmodified (every branch validates before it
    /// mutates) and the caller aborts the whole command.
    pub fn apply(&mut self, event: &GameEvent) -> CoordinatorResult<()> {
        match &event.payload {
            GameEventPayload::GameBegins(payload) => self.apply_game_begins(payload)?,
            GameEventPayload::JoinedGame(payload) => self.apply_joined_game(payload)?,
            GameEventPayload::Shuffle(payload) => self.apply_shuffle(payload),
            GameEventPayload::DealCards(payload) => self.apply_deal_cards(payload)?,
            GameEventPayload::DrawBlackCard(payload) => self.apply_draw_black_card(payload)?,
            GameEventPayload::SetJudge(payload) => self.apply_set_judge(payload)?,
            GameEventPayload::CardPlayed(payload) => self.apply_card_played(payload)?,
            GameEventPayload::JudgeChoseWinningCard(payload) => {
                self.apply_judge_chose_winning_card(payload)?
            }
            GameEventPayload::RoundContinued(payload) => self.apply_round_continued(payload)?,
            GameEventPayload::GameWinner(payload) => self.apply_game_winner(payload)?,
            GameEventPayload::ClockUpdate(payload) => self.apply_clock_update(payload),
        }
        self.last_event_at = event.created_at;
        self.updated_at = event.created_at;
        Ok(())
    }

    fn apply_game_begins(
        &mut self,
        payload: &crate::events::GameBeginsPayload,
    ) -> CoordinatorResult<()> {
        if self.status != Status::Setup {
            return Err(CoordinatorError::validation("game has already begun"));
        }
        if self.players.len() < constants::MINIMUM_PLAYERS_TO_BEGIN {
            return Err(CoordinatorError::validation("not enough players to begin"));
        }
        let _ = &payload.initiator_user_id;
        self.status = Status::InProgress;
        self.round_status = RoundStatus::PlayersPickingCard;
        self.round_index = 1;
        Ok(())
    }

    fn apply_joined_game(
        &mut self,
        payload: &crate::events::JoinedGamePayload,
    ) -> CoordinatorResult<()> {
        if self.players.len() >= self.max_players {
            return Err(CoordinatorError::validation("game is full"));
        }
        if self.player(&payload.user_id).is_some() {
            return Err(CoordinatorError::Conflict);
        }
        self.players.push(Player::new(
            payload.user_id.clone(),
            payload.name.clone(),
            payload.image.clone(),
            false,
        ));
        Ok(())
    }

    fn apply_shuffle(&mut self, payload: &crate::events::ShufflePayload) {
        self.used_cards.clear();
        self.collection.shuffle(payload.seed);
    }

    fn apply_deal_cards(
        &mut self,
        payload: &crate::events::DealCardsPayload,
    ) -> CoordinatorResult<()> {
        for card_id in &payload.card_ids {
            if self.collection.by_id(card_id).is_none() {
                return Err(CoordinatorError::not_found(format!("unknown card {card_id}")));
            }
        }
        let player = self
            .player_mut(&payload.player_id)
            .ok_or_else(|| CoordinatorError::not_found(format!("unknown player {}", payload.player_id)))?;
        player.hand = payload.card_ids.clone();
        self.used_cards.extend(payload.card_ids.iter().cloned());
        Ok(())
    }

    fn apply_draw_black_card(
        &mut self,
        payload: &crate::events::DrawBlackCardPayload,
    ) -> CoordinatorResult<()> {
        let card = self
            .collection
            .by_id(&payload.card_id)
            .ok_or_else(|| CoordinatorError::not_found(format!("unknown card {}", payload.card_id)))?;
        if !card.is_black() {
            return Err(CoordinatorError::validation("card is not a Black card"));
        }
        self.black_card = Some(payload.card_id.clone());
        self.used_cards.insert(payload.card_id.clone());
        Ok(())
    }

    fn apply_set_judge(&mut self, payload: &crate::events::SetJudgePayload) -> CoordinatorResult<()> {
        if self.player(&payload.player_id).is_none() {
            return Err(CoordinatorError::not_found(format!("unknown player {}", payload.player_id)));
        }
        for player in &mut self.players {
            player.is_judge = player.user_id == payload.player_id;
        }
        Ok(())
    }

    fn apply_card_played(
        &mut self,
        payload: &crate::events::CardPlayedPayload,
    ) -> CoordinatorResult<()> {
        if self.round_status != RoundStatus::PlayersPickingCard {
            return Err(CoordinatorError::validation("round is not accepting plays"));
        }
        let player = self
            .player_mut(&payload.user_id)
            .ok_or_else(|| CoordinatorError::not_found(format!("unknown player {}", payload.user_id)))?;
        if player.is_judge {
            return Err(CoordinatorError::validation("the Judge cannot play a card"));
        }
        if player.placed_card.is_some() {
            return Err(CoordinatorError::validation("player has already placed a card"));
        }
        if !player.remove_from_hand(&payload.card_id) {
            return Err(CoordinatorError::validation("card is not in hand"));
        }
        player.placed_card = Some(payload.card_id.clone());
        self.board_white_cards.push(payload.card_id.clone());
        if self.non_judges().all(|p| p.placed_card.is_some()) {
            self.round_status = RoundStatus::JudgePickingWinningCard;
        }
        Ok(())
    }

    fn apply_judge_chose_winning_card(
        &mut self,
        payload: &crate::events::JudgeChoseWinningCardPayload,
    ) -> CoordinatorResult<()> {
        if self.round_status != RoundStatus::JudgePickingWinningCard {
            return Err(CoordinatorError::validation("no winner can be picked right now"));
        }
        if !self.board_white_cards.iter().any(|c| c == &payload.card_id) {
            return Err(CoordinatorError::validation("card is not on the board"));
        }
        let winner = self
            .players
            .iter_mut()
            .find(|p| p.placed_card.as_ref() == Some(&payload.card_id))
            .ok_or_else(|| CoordinatorError::Fatal(anyhow::anyhow!("board card has no owner")))?;
        winner.score += 1;
        winner.is_round_winner = true;
        self.round_winner = Some(winner.user_id.clone());
        self.round_status = RoundStatus::JudgeChoseWinningCard;
        Ok(())
    }

    fn apply_round_continued(
        &mut self,
        payload: &crate::events::RoundContinuedPayload,
    ) -> CoordinatorResult<()> {
        if self.round_status != RoundStatus::JudgeChoseWinningCard {
            return Err(CoordinatorError::validation("round has not reached its end"));
        }
        let card = self
            .collection
            .by_id(&payload.black_card_id)
            .ok_or_else(|| CoordinatorError::not_found(format!("unknown card {}", payload.black_card_id)))?;
        if !card.is_black() {
            return Err(CoordinatorError::validation("card is not a Black card"));
        }

        for player in &mut self.players {
            if player.is_judge {
                continue;
            }
            player.clear_round_state();
            if let Some(refill) = payload.player_hand_refills.get(&player.user_id) {
                player.hand.push(refill.clone());
            }
        }
        self.used_cards.extend(payload.player_hand_refills.values().cloned());
        self.used_cards.insert(payload.black_card_id.clone());

        if let Some(current_judge) = self.players.iter_mut().find(|p| p.is_judge) {
            current_judge.is_judge = false;
            current_judge.was_judge = true;
        }
        self.rotate_judge();

        self.board_white_cards.clear();
        self.round_winner = None;
        self.black_card = Some(payload.black_card_id.clone());
        self.round_index += 1;
        self.round_status = RoundStatus::PlayersPickingCard;
        Ok(())
    }

    fn apply_game_winner(
        &mut self,
        payload: &crate::events::GameWinnerPayload,
    ) -> CoordinatorResult<()> {
        let player = self
            .player_mut(&payload.user_id)
            .ok_or_else(|| CoordinatorError::not_found(format!("unknown player {}", payload.user_id)))?;
        if player.score < self.winner_score {
            return Err(CoordinatorError::validation("no player has reached the winning score"));
        }
        player.is_game_winner = true;
        self.status = Status::Finished;
        self.round_status = RoundStatus::GameOver;
        Ok(())
    }

    fn apply_clock_update(&mut self, payload: &crate::events::ClockUpdatePayload) {
        self.next_auto_progress_at = Some(payload.next_auto_progress_at);
    }

    /// Next Judge = first player in insertion order with `¬isJudge ∧
    /// ¬wasJudge`. If none exists, `wasJudge` is cleared on every player
    /// (a new rotation cycle begins) and the rule is reapplied.
    fn rotate_judge(&mut self) {
        if self.players.iter().all(|p| p.is_judge || p.was_judge) {
            for player in &mut self.players {
                player.was_judge = false;
            }
        }
        if let Some(next) = self.players.iter_mut().find(|p| !p.is_judge && !p.was_judge) {
            next.is_judge = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;

    fn deck() -> Collection {
        let mut cards = Vec::new();
        for i in 0..20 {
            cards.push(Card::new(format!("W{i}"), CardType::White, format!("white {i}")));
        }
        for i in 0..5 {
            cards.push(Card::new(format!("B{i}"), CardType::Black, format!("black {i}")));
        }
        Collection::new(cards)
    }

    fn fresh_game() -> GameState {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        GameState::new(
            GameId::generate(),
            "test room",
            deck(),
            1,
            3,
            UserId::new("u1"),
            "U1",
            "img",
            now,
        )
    }

    fn event(game: &GameState, payload: GameEventPayload) -> GameEvent {
        GameEvent::new(game.id, game.updated_at, payload)
    }

    #[test]
    fn game_begins_requires_two_players() {
        let mut game = fresh_game();
        let e = event(
            &game,
            GameEventPayload::GameBegins(crate::events::GameBeginsPayload {
                initiator_user_id: UserId::new("u1"),
            }),
        );
        assert!(game.apply(&e).is_err());
    }

    #[test]
    fn joined_game_is_rejected_when_full() {
        let mut game = fresh_game();
        game.max_players = 1;
        let e = event(
            &game,
            GameEventPayload::JoinedGame(crate::events::JoinedGamePayload {
                user_id: UserId::new("u2"),
                name: "U2".into(),
                image: "img".into(),
            }),
        );
        assert!(game.apply(&e).is_err());
    }

    #[test]
    fn joined_game_rejects_duplicate_user() {
        let mut game = fresh_game();
        game.max_players = 5;
        let join = |uid: &str| {
            GameEventPayload::JoinedGame(crate::events::JoinedGamePayload {
                user_id: UserId::new(uid),
                name: uid.into(),
                image: "img".into(),
            })
        };
        let e1 = event(&game, join("u2"));
        game.apply(&e1).unwrap();
        let e2 = event(&game, join("u2"));
        let result = game.apply(&e2);
        assert!(matches!(result, Err(CoordinatorError::Conflict)));
    }

    #[test]
    fn card_played_transitions_round_status_once_all_non_judges_placed() {
        let mut game = fresh_game();
        game.max_players = 3;
        for uid in ["u2", "u3"] {
            let e = event(
                &game,
                GameEventPayload::JoinedGame(crate::events::JoinedGamePayload {
                    user_id: UserId::new(uid),
                    name: uid.into(),
                    image: "img".into(),
                }),
            );
            game.apply(&e).unwrap();
        }
        let begins = event(
            &game,
            GameEventPayload::GameBegins(crate::events::GameBeginsPayload {
                initiator_user_id: UserId::new("u1"),
            }),
        );
        game.apply(&begins).unwrap();
        let set_judge = event(
            &game,
            GameEventPayload::SetJudge(crate::events::SetJudgePayload { player_id: UserId::new("u1") }),
        );
        game.apply(&set_judge).unwrap();
        for (uid, card) in [("u2", "W1"), ("u3", "W2")] {
            game.player_mut(&UserId::new(uid)).unwrap().hand.push(CardId::new(card));
        }

        let play_u2 = event(
            &game,
            GameEventPayload::CardPlayed(crate::events::CardPlayedPayload {
                user_id: UserId::new("u2"),
                card_id: CardId::new("W1"),
            }),
        );
        game.apply(&play_u2).unwrap();
        assert_eq!(game.round_status, RoundStatus::PlayersPickingCard);

        let play_u3 = event(
            &game,
            GameEventPayload::CardPlayed(crate::events::CardPlayedPayload {
                user_id: UserId::new("u3"),
                card_id: CardId::new("W2"),
            }),
        );
        game.apply(&play_u3).unwrap();
        assert_eq!(game.round_status, RoundStatus::JudgePickingWinningCard);
        assert_eq!(game.board_white_cards.len(), 2);
    }

    #[test]
    fn judge_cannot_play_a_card() {
        let mut game = fresh_game();
        game.round_status = RoundStatus::PlayersPickingCard;
        game.players[0].is_judge = true;
        game.players[0].hand.push(CardId::new("W1"));
        let e = event(
            &game,
            GameEventPayload::CardPlayed(crate::events::CardPlayedPayload {
                user_id: UserId::new("u1"),
                card_id: CardId::new("W1"),
            }),
        );
        assert!(game.apply(&e).is_err());
    }

    #[test]
    fn judge_rotation_prefers_first_eligible_player_in_insertion_order() {
        let mut game = fresh_game();
        game.players.push(Player::new(UserId::new("u2"), "U2", "img", false));
        game.players.push(Player::new(UserId::new("u3"), "U3", "img", false));
        game.players[0].is_judge = true;
        game.rotate_judge();
        assert_eq!(game.players[0].is_judge, true);
        game.players[0].is_judge = false;
        game.players[0].was_judge = true;
        game.rotate_judge();
        assert!(game.players[1].is_judge);
    }

    #[test]
    fn judge_rotation_starts_new_cycle_when_everyone_has_served() {
        let mut game = fresh_game();
        game.players.push(Player::new(UserId::new("u2"), "U2", "img", false));
        for player in &mut game.players {
            player.was_judge = true;
        }
        game.rotate_judge();
        assert!(game.players.iter().all(|p| !p.was_judge) || game.players.iter().any(|p| p.is_judge));
        assert!(game.players.iter().any(|p| p.is_judge));
    }

    #[test]
    fn game_winner_requires_reaching_winner_score() {
        let mut game = fresh_game();
        let e = event(
            &game,
            GameEventPayload::GameWinner(crate::events::GameWinnerPayload {
                user_id: UserId::new("u1"),
                score: 1,
            }),
        );
        assert!(game.apply(&e).is_err());
        game.players[0].score = 1;
        let e2 = event(
            &game,
            GameEventPayload::GameWinner(crate::events::GameWinnerPayload {
                user_id: UserId::new("u1"),
                score: 1,
            }),
        );
        game.apply(&e2).unwrap();
        assert_eq!(game.status, Status::Finished);
        assert_eq!(game.round_status, RoundStatus::GameOver);
        assert!(game.players[0].is_game_winner);
    }
}
