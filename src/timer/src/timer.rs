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

//! One cooperative deadline loop per active game. Rescues stalled rounds
//! (a disconnected Judge, an AFK player) by synthesizing the same events a
//! human would once `round_deadline` elapses with no state-advancing
//! command.

use std::time::Duration;

use async_trait::async_trait;
use model::GameId;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Signals delivered to a running timer. Both kinds share a single-slot
/// channel; a signal that cannot be enqueued (the slot is already full) is
/// simply dropped; the timer re-checks on its own next deadline regardless.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Signal {
    Reset,
    Stop,
}

/// What happens when a game's deadline fires. Implemented by the
/// coordinator, which is the only thing that knows how to turn a
/// `round_status` into a synthetic command; kept as a trait here so this
/// crate has no dependency on the coordinator crate.
#[async_trait]
pub trait DeadlineHandler: Send + Sync {
    async fn on_deadline(&self, game_id: GameId);
}

/// A handle to a running timer task. Cloning it is cheap (it's just a
/// channel sender) so every reader task for a game can hold one.
#[derive(Clone)]
pub struct TimerHandle {
    sender: mpsc::Sender<Signal>,
}

impl TimerHandle {
    /// A player or Judge issued a command that advanced state: push the
    /// deadline back out.
    pub fn reset(&self) {
        let _ = self.sender.try_send(Signal::Reset);
    }

    /// The game finished; the timer should exit.
    pub fn stop(&self) {
        let _ = self.sender.try_send(Signal::Stop);
    }
}

/// Spawns the deadline loop for `game_id` and returns a handle to control
/// it. The loop exits (and its task ends) on a `Stop` signal.
pub fn spawn<H>(game_id: GameId, deadline: Duration, handler: H) -> TimerHandle
where
    H: DeadlineHandler + 'static,
{
    let (sender, mut receiver) = mpsc::channel(constants::TIMER_SIGNAL_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut next_deadline = Instant::now() + deadline;
        loop {
            tokio::select! {
                _ = sleep_until(next_deadline) => {
                    debug!(%game_id, "auto-progress deadline fired");
                    handler.on_deadline(game_id).await;
                    next_deadline = Instant::now() + deadline;
                }
                signal = receiver.recv() => {
                    match signal {
                        Some(Signal::Reset) => {
                            next_deadline = Instant::now() + deadline;
                        }
                        Some(Signal::Stop) | None => {
                            info!(%game_id, "auto-progress timer stopped");
                            break;
                        }
                    }
                }
            }
        }
    });

    TimerHandle { sender }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use model::GameId;

    use super::*;

    struct CountingHandler {
        fired: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DeadlineHandler for CountingHandler {
        async fn on_deadline(&self, _game_id: GameId) {
            self.fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_the_deadline_elapses() {
        let fired = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler { fired: fired.clone() };
        let game_id = GameId::generate();
        let _handle = spawn(game_id, Duration::from_secs(30), handler);

        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_pushes_the_deadline_back_out() {
        let fired = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler { fired: fired.clone() };
        let game_id = GameId::generate();
        let handle = spawn(game_id, Duration::from_secs(30), handler);

        tokio::time::advance(Duration::from_secs(20)).await;
        handle.reset();
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(20)).await;
        tokio::task::yield_now().await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_loop_without_further_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler { fired: fired.clone() };
        let game_id = GameId::generate();
        let handle = spawn(game_id, Duration::from_secs(30), handler);

        handle.stop();
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
