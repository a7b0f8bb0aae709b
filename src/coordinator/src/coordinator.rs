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

//! The single entry point for commands. For each command: resolve the
//! aggregate, validate, construct events, apply them, append to the log,
//! update the used-card set, and broadcast the result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use database::EventLog;
use deck_generator::DeckGenerator;
use hub::Hub;
use model::{
    CardId, CardPlayedPayload, CardType, ClockUpdatePayload, DealCardsPayload, DrawBlackCardPayload,
    GameBeginsPayload, GameEvent, GameEventPayload, GameId, GameState, GameWinnerPayload, JoinedGamePayload,
    JudgeChoseWinningCardPayload, RoundContinuedPayload, SetJudgePayload, ShufflePayload, UserId,
};
use protocol::{GameSnapshot, OutboundFrame};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use with_error::{CoordinatorError, CoordinatorResult};

/// Tunables threaded in from the composition root rather than read from
/// global state, so tests can construct a `Coordinator` with short deadlines.
#[derive(Clone, Copy, Debug)]
pub struct CoordinatorConfig {
    pub round_deadline: Duration,
    pub finished_game_cleanup: Duration,
    pub outbound_queue_capacity: usize,
    pub starting_hand_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            round_deadline: Duration::from_secs(constants::ROUND_DEADLINE_SECS),
            finished_game_cleanup: Duration::from_secs(constants::FINISHED_GAME_CLEANUP_SECS),
            outbound_queue_capacity: constants::OUTBOUND_QUEUE_CAPACITY,
            starting_hand_size: constants::STARTING_HAND_SIZE,
        }
    }
}

pub struct Coordinator {
    event_log: Arc<dyn EventLog>,
    deck_generator: Arc<dyn DeckGenerator>,
    hub: Arc<Hub>,
    games: DashMap<GameId, Arc<Mutex<GameState>>>,
    timers: DashMap<GameId, timer::TimerHandle>,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(
        event_log: Arc<dyn EventLog>,
        deck_generator: Arc<dyn DeckGenerator>,
        hub: Arc<Hub>,
        config: CoordinatorConfig,
    ) -> Arc<Self> {
        Arc::new(Self { event_log, deck_generator, hub, games: DashMap::new(), timers: DashMap::new(), config })
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Creates a new game directly (not event-sourced, per the command
    /// table: `CreateGame` is a constructor). The owner becomes the first
    /// player.
    #[instrument(skip(self))]
    pub async fn create_game(
        &self,
        name: String,
        subject: String,
        winner_score: u32,
        max_players: usize,
        owner: UserId,
        owner_name: String,
        owner_image: String,
    ) -> CoordinatorResult<GameSnapshot> {
        let collection = self
            .deck_generator
            .generate(&subject)
            .await
            .map_err(CoordinatorError::Io)?;
        let game_id = GameId::generate();
        let now = Utc::now();
        let game = GameState::new(
            game_id, name, collection, winner_score, max_players, owner, owner_name, owner_image, now,
        );
        let snapshot = protocol::snapshot::build(&game);
        self.games.insert(game_id, Arc::new(Mutex::new(game)));
        info!(%game_id, "game created");
        Ok(snapshot)
    }

    /// Idempotent: joining a game the user is already in is a no-op that
    /// still returns the current snapshot.
    #[instrument(skip(self))]
    pub async fn join(&self, game_id: GameId, user_id: UserId, name: String, image: String) -> CoordinatorResult<GameSnapshot> {
        let mutex = self.resolve(game_id)?;
        let mut guard = mutex.lock().await;
        let mut scratch = guard.clone();
        let event = GameEvent::new(
            game_id,
            Utc::now(),
            GameEventPayload::JoinedGame(JoinedGamePayload { user_id, name, image }),
        );
        match scratch.apply(&event) {
            Ok(()) => {
                self.event_log.append(&event).await.map_err(CoordinatorError::Io)?;
                *guard = scratch;
            }
            Err(CoordinatorError::Conflict) => {}
            Err(other) => return Err(other),
        }
        let snapshot = self.broadcast_snapshot(game_id, &guard);
        Ok(snapshot)
    }

    /// Only the owner may begin the game. Deals each player a full hand,
    /// draws the first Black card, and assigns the owner as Judge.
    #[instrument(skip(self))]
    pub async fn begin_game<H>(&self, game_id: GameId, owner: UserId, deadline_handler: H) -> CoordinatorResult<GameSnapshot>
    where
        H: timer::DeadlineHandler + 'static,
    {
        let mutex = self.resolve(game_id)?;
        let mut guard = mutex.lock().await;

        {
            let owner_player =
                guard.player(&owner).ok_or_else(|| CoordinatorError::not_found(format!("unknown player {owner}")))?;
            if !owner_player.is_owner {
                return Err(CoordinatorError::validation("only the owner may begin the game"));
            }
        }

        let now = Utc::now();
        let mut scratch = guard.clone();
        let mut events = Vec::new();

        apply_one(&mut scratch, &mut events, game_id, now, GameEventPayload::GameBegins(GameBeginsPayload { initiator_user_id: owner.clone() }))?;
        apply_one(&mut scratch, &mut events, game_id, now, GameEventPayload::SetJudge(SetJudgePayload { player_id: owner }))?;

        let seed = game_id_hash(game_id);
        apply_one(
            &mut scratch,
            &mut events,
            game_id,
            now,
            GameEventPayload::Shuffle(ShufflePayload { seed, shuffle_id: model::EventId::generate().to_string() }),
        )?;

        let mut reserved: HashSet<CardId> = HashSet::new();
        let player_ids: Vec<UserId> = scratch.players.iter().map(|p| p.user_id.clone()).collect();
        for player_id in player_ids {
            let cards = draw_unused(&scratch, CardType::White, self.config.starting_hand_size, &mut reserved)
                .ok_or_else(|| CoordinatorError::validation("not enough White cards to deal a starting hand"))?;
            apply_one(
                &mut scratch,
                &mut events,
                game_id,
                now,
                GameEventPayload::DealCards(DealCardsPayload { player_id, card_ids: cards }),
            )?;
        }

        let black_card = draw_unused(&scratch, CardType::Black, 1, &mut reserved)
            .and_then(|mut cards| cards.pop())
            .ok_or_else(|| CoordinatorError::validation("no Black cards available to draw"))?;
        apply_one(&mut scratch, &mut events, game_id, now, GameEventPayload::DrawBlackCard(DrawBlackCardPayload { card_id: black_card }))?;

        self.commit(game_id, &mut guard, scratch, events).await?;

        let handle = timer::spawn(game_id, self.config.round_deadline, deadline_handler);
        self.timers.insert(game_id, handle);

        Ok(self.broadcast_snapshot(game_id, &guard))
    }

    #[instrument(skip(self))]
    pub async fn play_card(&self, game_id: GameId, user_id: UserId, card_id: CardId) -> CoordinatorResult<GameSnapshot> {
        let mutex = self.resolve(game_id)?;
        let mut guard = mutex.lock().await;
        let now = Utc::now();
        let mut scratch = guard.clone();
        let mut events = Vec::new();
        apply_one(&mut scratch, &mut events, game_id, now, GameEventPayload::CardPlayed(CardPlayedPayload { user_id, card_id }))?;
        self.commit(game_id, &mut guard, scratch, events).await?;
        self.reset_timer(game_id);
        Ok(self.broadcast_snapshot(game_id, &guard))
    }

    #[instrument(skip(self))]
    pub async fn pick_winner(&self, game_id: GameId, user_id: UserId, card_id: CardId) -> CoordinatorResult<GameSnapshot> {
        let mutex = self.resolve(game_id)?;
        let mut guard = mutex.lock().await;

        {
            let judge = guard.player(&user_id).ok_or_else(|| CoordinatorError::not_found(format!("unknown player {user_id}")))?;
            if !judge.is_judge {
                return Err(CoordinatorError::validation("only the Judge may pick the winning card"));
            }
        }

        let now = Utc::now();
        let mut scratch = guard.clone();
        let mut events = Vec::new();
        apply_one(
            &mut scratch,
            &mut events,
            game_id,
            now,
            GameEventPayload::JudgeChoseWinningCard(JudgeChoseWinningCardPayload { card_id }),
        )?;

        if let Some(winner) = scratch.players.iter().find(|p| p.score >= scratch.winner_score) {
            let payload = GameWinnerPayload { user_id: winner.user_id.clone(), score: winner.score };
            apply_one(&mut scratch, &mut events, game_id, now, GameEventPayload::GameWinner(payload))?;
        }

        let finished = scratch.status == model::Status::Finished;
        self.commit(game_id, &mut guard, scratch, events).await?;

        if finished {
            self.finish_game(game_id);
        } else {
            self.reset_timer(game_id);
        }

        Ok(self.broadcast_snapshot(game_id, &guard))
    }

    #[instrument(skip(self))]
    pub async fn continue_round(&self, game_id: GameId) -> CoordinatorResult<GameSnapshot> {
        let mutex = self.resolve(game_id)?;
        let mut guard = mutex.lock().await;
        let now = Utc::now();
        let mut scratch = guard.clone();
        let mut events = Vec::new();

        let non_judge_count = scratch.non_judges().count();
        if scratch.unused_count(CardType::White) < non_judge_count || scratch.unused_count(CardType::Black) < 1 {
            let seed = random_seed();
            apply_one(
                &mut scratch,
                &mut events,
                game_id,
                now,
                GameEventPayload::Shuffle(ShufflePayload { seed, shuffle_id: model::EventId::generate().to_string() }),
            )?;
        }

        let mut reserved: HashSet<CardId> = scratch.used_cards.clone();
        let recipients: Vec<UserId> = scratch.non_judges().map(|p| p.user_id.clone()).collect();
        let mut refills = std::collections::HashMap::new();
        for user_id in recipients {
            let card = draw_unused(&scratch, CardType::White, 1, &mut reserved)
                .and_then(|mut cards| cards.pop())
                .ok_or_else(|| CoordinatorError::validation("not enough White cards to refill hands"))?;
            refills.insert(user_id, card);
        }
        let black_card = draw_unused(&scratch, CardType::Black, 1, &mut reserved)
            .and_then(|mut cards| cards.pop())
            .ok_or_else(|| CoordinatorError::validation("no Black cards available to draw"))?;

        apply_one(
            &mut scratch,
            &mut events,
            game_id,
            now,
            GameEventPayload::RoundContinued(RoundContinuedPayload { player_hand_refills: refills, black_card_id: black_card }),
        )?;

        self.commit(game_id, &mut guard, scratch, events).await?;
        self.reset_timer(game_id);
        Ok(self.broadcast_snapshot(game_id, &guard))
    }

    /// Pure fan-out: no aggregate mutation.
    pub fn emoji_clicked(&self, game_id: GameId, user_id: UserId, emoji: String) {
        let frame = OutboundFrame::EmojiClicked(protocol::outbound::EmojiClickedPayload { user_id, emoji, game_id });
        if let Ok(json) = frame.to_json() {
            self.hub.broadcast(game_id, json);
        }
    }

    pub fn chat(&self, game_id: GameId, message: impl Into<String>) {
        if let Ok(json) = OutboundFrame::chat(message).to_json() {
            self.hub.broadcast(game_id, json);
        }
    }

    /// Fires when the auto-progress deadline elapses. Errors
    /// from synthetic commands are swallowed (logged only) so a stuck
    /// round never wedges the timer loop.
    pub async fn fire_deadline(&self, game_id: GameId) {
        let Some(mutex) = self.games.get(&game_id).map(|entry| entry.clone()) else {
            return;
        };
        let snapshot = {
            let guard = mutex.lock().await;
            guard.clone()
        };

        let result = match snapshot.round_status {
            model::RoundStatus::PlayersPickingCard => self.auto_play_cards(game_id, &snapshot).await,
            model::RoundStatus::JudgePickingWinningCard => self.auto_pick_winner(game_id, &snapshot).await,
            model::RoundStatus::JudgeChoseWinningCard => self.continue_round(game_id).await.map(|_| ()),
            _ => Ok(()),
        };

        if let Err(error) = result {
            warn!(%game_id, %error, "auto-progress command failed, will retry next deadline");
        }

        let _ = self.clock_update(game_id).await;
    }

    async fn auto_play_cards(&self, game_id: GameId, snapshot: &GameState) -> CoordinatorResult<()> {
        for player in snapshot.non_judges() {
            if player.placed_card.is_none() && !player.hand.is_empty() {
                let index = rand::thread_rng().gen_range(0..player.hand.len());
                let card_id = player.hand[index].clone();
                self.play_card(game_id, player.user_id.clone(), card_id).await?;
            }
        }
        Ok(())
    }

    async fn auto_pick_winner(&self, game_id: GameId, snapshot: &GameState) -> CoordinatorResult<()> {
        if snapshot.board_white_cards.is_empty() {
            return Ok(());
        }
        let Some(judge) = snapshot.players.iter().find(|p| p.is_judge) else {
            return Ok(());
        };
        let index = rand::thread_rng().gen_range(0..snapshot.board_white_cards.len());
        let card_id = snapshot.board_white_cards[index].clone();
        self.pick_winner(game_id, judge.user_id.clone(), card_id).await?;
        Ok(())
    }

    async fn clock_update(&self, game_id: GameId) -> CoordinatorResult<()> {
        let mutex = self.resolve(game_id)?;
        let mut guard = mutex.lock().await;
        let now = Utc::now();
        let next = now + chrono::Duration::from_std(self.config.round_deadline).unwrap_or_default();
        let mut scratch = guard.clone();
        let mut events = Vec::new();
        apply_one(&mut scratch, &mut events, game_id, now, GameEventPayload::ClockUpdate(ClockUpdatePayload { next_auto_progress_at: next }))?;
        self.commit(game_id, &mut guard, scratch, events).await?;
        self.broadcast_snapshot(game_id, &guard);
        Ok(())
    }

    fn reset_timer(&self, game_id: GameId) {
        if let Some(handle) = self.timers.get(&game_id) {
            handle.reset();
        }
    }

    /// Stops the timer and schedules the finished game for cleanup.
    fn finish_game(&self, game_id: GameId) {
        if let Some((_, handle)) = self.timers.remove(&game_id) {
            handle.stop();
        }
        let event_log = self.event_log.clone();
        let games = self.games.clone();
        let cleanup_after = self.config.finished_game_cleanup;
        tokio::spawn(async move {
            tokio::time::sleep(cleanup_after).await;
            games.remove(&game_id);
            if let Err(error) = event_log.delete_all(game_id).await {
                warn!(%game_id, %error, "failed to purge finished game's event log");
            }
        });
    }

    fn resolve(&self, game_id: GameId) -> CoordinatorResult<Arc<Mutex<GameState>>> {
        self.games
            .get(&game_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoordinatorError::not_found(format!("unknown game {game_id}")))
    }

    /// Appends `events` to the log, updates the used-card set in one batch,
    /// and writes `scratch` back into the locked aggregate slot. If log
    /// append fails the in-memory aggregate is left untouched.
    async fn commit(
        &self,
        game_id: GameId,
        guard: &mut GameState,
        scratch: GameState,
        events: Vec<GameEvent>,
    ) -> CoordinatorResult<()> {
        for event in &events {
            self.event_log.append(event).await.map_err(CoordinatorError::Io)?;
        }
        // The aggregate's own `used_cards` is already authoritative after
        // `apply`; mirror it into the persisted store wholesale rather than
        // trying to diff it incrementally against whichever events ran.
        self.event_log.clear_used(game_id).await.map_err(CoordinatorError::Io)?;
        let used: Vec<CardId> = scratch.used_cards.iter().cloned().collect();
        if !used.is_empty() {
            self.event_log.add_used(game_id, &used).await.map_err(CoordinatorError::Io)?;
        }
        *guard = scratch;
        Ok(())
    }

    fn broadcast_snapshot(&self, game_id: GameId, state: &GameState) -> GameSnapshot {
        let snapshot = protocol::snapshot::build(state);
        if let Ok(frame) = OutboundFrame::GameUpdate(snapshot.clone()).to_json() {
            self.hub.broadcast(game_id, frame);
        }
        snapshot
    }
}

fn apply_one(
    scratch: &mut GameState,
    events: &mut Vec<GameEvent>,
    game_id: GameId,
    now: DateTime<Utc>,
    payload: GameEventPayload,
) -> CoordinatorResult<()> {
    let event = GameEvent::new(game_id, now, payload);
    scratch.apply(&event)?;
    events.push(event);
    Ok(())
}

/// Picks `count` card ids of `card_type` from `state`'s collection that are
/// not already in `reserved`, marking each as reserved as it's picked so a
/// single multi-recipient command never hands out the same card twice.
fn draw_unused(state: &GameState, card_type: CardType, count: usize, reserved: &mut HashSet<CardId>) -> Option<Vec<CardId>> {
    let mut picked = Vec::with_capacity(count);
    for card in state.collection.iter_of_type(card_type) {
        if picked.len() == count {
            break;
        }
        if !reserved.contains(&card.id) {
            reserved.insert(card.id.clone());
            picked.push(card.id.clone());
        }
    }
    if picked.len() == count {
        Some(picked)
    } else {
        None
    }
}

/// `BeginGame`'s initial shuffle seed: derived from the game id so the
/// opening deal is reproducible from the id alone. FNV-1a, matching
/// `deck_generator::subject_hash`'s approach to a small, dependency-free,
/// cross-platform-stable hash.
fn game_id_hash(game_id: GameId) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in game_id.to_string().as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// A reshuffle-on-exhaustion seed is drawn fresh each time (a monotonic
/// clock and random nonce stand-in), since unlike `BeginGame`'s opening
/// shuffle there is no single input it needs to be reproducible from; the
/// `Shuffle` event still carries the seed it drew, so replay is
/// deterministic.
fn random_seed() -> u64 {
    rand::thread_rng().gen::<u64>()
}

/// Adapts a `Coordinator` so the `timer` crate can fire deadlines back into
/// it without this crate depending on `timer`'s internals beyond the trait.
pub struct CoordinatorDeadlineHandler {
    coordinator: Arc<Coordinator>,
}

impl CoordinatorDeadlineHandler {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl timer::DeadlineHandler for CoordinatorDeadlineHandler {
    async fn on_deadline(&self, game_id: GameId) {
        self.coordinator.fire_deadline(game_id).await;
    }
}

#[cfg(test)]
mod scenarios;
