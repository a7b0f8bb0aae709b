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

//! Composition root: reads configuration from the environment, wires the
//! event log, hub, and coordinator together, and starts the wire server.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use coordinator::{Coordinator, CoordinatorConfig};
use database::sled_log::SledEventLog;
use database::EventLog;
use deck_generator::StaticDeckGenerator;
use hub::Hub;
use server::AppState;
use tracing::warn;

struct Config {
    bind_addr: SocketAddr,
    round_deadline_secs: u64,
    outbound_queue_capacity: usize,
    finished_game_cleanup_secs: u64,
    default_hand_size: usize,
}

impl Config {
    fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:80".to_string())
                .parse()
                .expect("BIND_ADDR must be a valid socket address"),
            round_deadline_secs: env_parsed("ROUND_DEADLINE_SECS", 30),
            outbound_queue_capacity: env_parsed("OUTBOUND_QUEUE_CAPACITY", 64),
            finished_game_cleanup_secs: env_parsed("FINISHED_GAME_CLEANUP_SECS", 30),
            default_hand_size: env_parsed("DEFAULT_HAND_SIZE", 7),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::initialize();

    let config = Config::from_env();
    warn!(
        bind_addr = %config.bind_addr,
        round_deadline_secs = config.round_deadline_secs,
        "starting roundtable"
    );

    let event_log: Arc<dyn EventLog> = Arc::new(SledEventLog::new());
    let hub = Arc::new(Hub::new(config.outbound_queue_capacity));
    let deck_generator = Arc::new(StaticDeckGenerator::new());
    let coordinator_config = CoordinatorConfig {
        round_deadline: Duration::from_secs(config.round_deadline_secs),
        finished_game_cleanup: Duration::from_secs(config.finished_game_cleanup_secs),
        outbound_queue_capacity: config.outbound_queue_capacity,
        starting_hand_size: config.default_hand_size,
    };
    let coordinator = Coordinator::new(event_log, deck_generator, hub, coordinator_config);

    server::run_server(config.bind_addr, AppState { coordinator }).await
}
