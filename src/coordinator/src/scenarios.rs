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

//! End-to-end tests driving the coordinator through whole command sequences,
//! exercising real collaborators (in-memory log, static deck generator, hub)
//! instead of mocking them out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use database::in_memory::InMemoryEventLog;
use database::EventLog;
use deck_generator::{DeckGenerator, StaticDeckGenerator};
use hub::Hub;
use model::{Card, CardType, Collection};
use with_error::CoordinatorError;

use crate::{Coordinator, CoordinatorConfig, CoordinatorDeadlineHandler};

fn build_coordinator(config: CoordinatorConfig, deck_generator: Arc<dyn DeckGenerator>) -> Arc<Coordinator> {
    let event_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    let hub = Arc::new(Hub::new(config.outbound_queue_capacity));
    Coordinator::new(event_log, deck_generator, hub, config)
}

fn standard_coordinator() -> Arc<Coordinator> {
    build_coordinator(CoordinatorConfig::default(), Arc::new(StaticDeckGenerator::new()))
}

/// A deck just barely big enough to get one round going, so that continuing
/// past it forces the exhaustion-triggered reshuffle.
struct TinyDeckGenerator;

#[async_trait]
impl DeckGenerator for TinyDeckGenerator {
    async fn generate(&self, _subject: &str) -> Result<Collection> {
        Ok(Collection::new(vec![
            Card::new("W1", CardType::White, "tiny white one"),
            Card::new("W2", CardType::White, "tiny white two"),
            Card::new("B1", CardType::Black, "tiny black"),
        ]))
    }
}

#[tokio::test]
async fn scenario_minimal_game_flow_advances_through_a_full_round() {
    let coordinator = standard_coordinator();

    let owner = model::UserId::new("owner");
    let opponent = model::UserId::new("opponent");

    let created = coordinator
        .create_game("living room".into(), "space".into(), 5, 4, owner.clone(), "Owner".into(), "img".into())
        .await
        .unwrap();
    let game_id = model::GameId::parse(&created.id).unwrap();

    coordinator.join(game_id, opponent.clone(), "Opponent".into(), "img".into()).await.unwrap();

    let handler = CoordinatorDeadlineHandler::new(coordinator.clone());
    let snapshot = coordinator.begin_game(game_id, owner.clone(), handler).await.unwrap();
    assert_eq!(snapshot.status, model::Status::InProgress);
    assert_eq!(snapshot.round_status, model::RoundStatus::PlayersPickingCard);

    let opponent_hand_card = snapshot
        .players
        .iter()
        .find(|p| p.user_id == opponent)
        .unwrap()
        .hand
        .first()
        .unwrap()
        .id
        .clone();

    let snapshot = coordinator.play_card(game_id, opponent.clone(), opponent_hand_card.clone()).await.unwrap();
    assert_eq!(snapshot.round_status, model::RoundStatus::JudgePickingWinningCard);
    assert_eq!(snapshot.white_cards.len(), 1);

    let snapshot = coordinator.pick_winner(game_id, owner.clone(), opponent_hand_card).await.unwrap();
    assert_eq!(snapshot.round_status, model::RoundStatus::JudgeChoseWinningCard);
    assert_eq!(snapshot.players.iter().find(|p| p.user_id == opponent).unwrap().score, 1);

    let snapshot = coordinator.continue_round(game_id).await.unwrap();
    assert_eq!(snapshot.round_status, model::RoundStatus::PlayersPickingCard);
    assert_eq!(snapshot.current_game_round, 2);
    // The owner served as Judge for round one and should have rotated off.
    assert!(!snapshot.players.iter().find(|p| p.user_id == owner).unwrap().is_judge);
}

#[tokio::test]
async fn scenario_round_continuation_reshuffles_once_the_deck_runs_out() {
    let config = CoordinatorConfig { starting_hand_size: 1, ..CoordinatorConfig::default() };
    let coordinator = build_coordinator(config, Arc::new(TinyDeckGenerator));

    let owner = model::UserId::new("owner");
    let opponent = model::UserId::new("opponent");

    let created = coordinator
        .create_game("trivia night".into(), "anything".into(), 10, 4, owner.clone(), "Owner".into(), "img".into())
        .await
        .unwrap();
    let game_id = model::GameId::parse(&created.id).unwrap();
    coordinator.join(game_id, opponent.clone(), "Opponent".into(), "img".into()).await.unwrap();

    let handler = CoordinatorDeadlineHandler::new(coordinator.clone());
    let snapshot = coordinator.begin_game(game_id, owner.clone(), handler).await.unwrap();
    let card = snapshot.players.iter().find(|p| p.user_id == opponent).unwrap().hand[0].id.clone();

    coordinator.play_card(game_id, opponent.clone(), card.clone()).await.unwrap();
    coordinator.pick_winner(game_id, owner.clone(), card).await.unwrap();

    // Before continuing, the tiny deck has no Black cards left unused, which
    // must trigger a Shuffle rather than fail the command.
    let snapshot = coordinator.continue_round(game_id).await.unwrap();
    assert_eq!(snapshot.round_status, model::RoundStatus::PlayersPickingCard);
    assert!(snapshot.black_card.is_some());
    assert_eq!(snapshot.players.iter().find(|p| p.user_id == opponent).unwrap().hand.len(), 1);
}

#[tokio::test]
async fn scenario_joining_twice_is_idempotent() {
    let coordinator = standard_coordinator();
    let owner = model::UserId::new("owner");
    let opponent = model::UserId::new("opponent");

    let created = coordinator
        .create_game("room".into(), "space".into(), 5, 4, owner.clone(), "Owner".into(), "img".into())
        .await
        .unwrap();
    let game_id = model::GameId::parse(&created.id).unwrap();

    coordinator.join(game_id, opponent.clone(), "Opponent".into(), "img".into()).await.unwrap();
    let snapshot = coordinator.join(game_id, opponent.clone(), "Someone Else".into(), "other img".into()).await.unwrap();

    assert_eq!(snapshot.players.len(), 2);
    let rejoined = snapshot.players.iter().find(|p| p.user_id == opponent).unwrap();
    assert_eq!(rejoined.name, "Opponent");
}

#[tokio::test(start_paused = true)]
async fn scenario_reaching_the_winner_score_stops_the_auto_progress_timer() {
    let config = CoordinatorConfig {
        round_deadline: Duration::from_millis(100),
        finished_game_cleanup: Duration::from_millis(50),
        ..CoordinatorConfig::default()
    };
    let coordinator = build_coordinator(config, Arc::new(StaticDeckGenerator::new()));

    let owner = model::UserId::new("owner");
    let opponent = model::UserId::new("opponent");

    let created = coordinator
        .create_game("room".into(), "space".into(), 1, 4, owner.clone(), "Owner".into(), "img".into())
        .await
        .unwrap();
    let game_id = model::GameId::parse(&created.id).unwrap();
    coordinator.join(game_id, opponent.clone(), "Opponent".into(), "img".into()).await.unwrap();

    let handler = CoordinatorDeadlineHandler::new(coordinator.clone());
    let snapshot = coordinator.begin_game(game_id, owner.clone(), handler).await.unwrap();
    let card = snapshot.players.iter().find(|p| p.user_id == opponent).unwrap().hand[0].id.clone();

    coordinator.play_card(game_id, opponent.clone(), card.clone()).await.unwrap();
    let snapshot = coordinator.pick_winner(game_id, owner.clone(), card).await.unwrap();
    assert_eq!(snapshot.status, model::Status::Finished);

    // With the timer stopped, letting well more than its deadline elapse
    // must not synthesize any further commands against the finished game.
    tokio::time::advance(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;

    let result = coordinator.play_card(game_id, opponent, card_placeholder()).await;
    assert!(matches!(result, Err(CoordinatorError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn scenario_a_stalled_judge_is_auto_picked_by_the_deadline_timer() {
    let config = CoordinatorConfig {
        round_deadline: Duration::from_millis(100),
        finished_game_cleanup: Duration::from_millis(50),
        ..CoordinatorConfig::default()
    };
    let coordinator = build_coordinator(config, Arc::new(StaticDeckGenerator::new()));

    let owner = model::UserId::new("owner");
    let opponent = model::UserId::new("opponent");

    let created = coordinator
        .create_game("room".into(), "space".into(), 5, 4, owner.clone(), "Owner".into(), "img".into())
        .await
        .unwrap();
    let game_id = model::GameId::parse(&created.id).unwrap();
    coordinator.join(game_id, opponent.clone(), "Opponent".into(), "img".into()).await.unwrap();

    let handler = CoordinatorDeadlineHandler::new(coordinator.clone());
    let snapshot = coordinator.begin_game(game_id, owner.clone(), handler).await.unwrap();
    let card = snapshot.players.iter().find(|p| p.user_id == opponent).unwrap().hand[0].id.clone();

    let snapshot = coordinator.play_card(game_id, opponent.clone(), card).await.unwrap();
    assert_eq!(snapshot.round_status, model::RoundStatus::JudgePickingWinningCard);

    // The Judge never calls pick_winner; letting the deadline elapse must
    // synthesize the pick on its own rather than leave the round stuck.
    tokio::time::advance(Duration::from_secs(1)).await;
    tokio::task::yield_now().await;

    // continue_round only accepts a round sitting at JudgeChoseWinningCard,
    // so its success here is proof the stalled Judge was auto-picked.
    let snapshot = coordinator.continue_round(game_id).await.unwrap();
    assert_eq!(snapshot.round_status, model::RoundStatus::PlayersPickingCard);
    assert_eq!(snapshot.players.iter().find(|p| p.user_id == opponent).unwrap().score, 1);
}

fn card_placeholder() -> model::CardId {
    model::CardId::new("unused")
}
