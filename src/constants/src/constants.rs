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

//! Numerical constants for game rules and server tuning.

/// Number of White cards dealt to each non-Judge player at `BeginGame` and
/// refilled to after each round.
pub const STARTING_HAND_SIZE: usize = 7;

/// Minimum number of players required to begin a game.
pub const MINIMUM_PLAYERS_TO_BEGIN: usize = 2;

/// Seconds from the last state-advancing event before the auto-progress
/// timer synthesizes one.
pub const ROUND_DEADLINE_SECS: u64 = 30;

/// Seconds after a game enters `Finished` before its aggregate and event log
/// are purged.
pub const FINISHED_GAME_CLEANUP_SECS: u64 = 30;

/// Per-connection outbound queue capacity in the room broadcaster. A
/// connection that cannot keep up with this many unsent messages is evicted.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Capacity of the auto-progress timer's single-slot reset/stop channel.
pub const TIMER_SIGNAL_CHANNEL_CAPACITY: usize = 1;
