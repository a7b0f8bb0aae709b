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

//! One registry per game id: tracks active duplex connections and fans
//! outbound frames out to them, shedding slow consumers rather than
//! blocking the producer.

use std::fmt;

use dashmap::DashMap;
use model::GameId;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use ulid::Ulid;

/// Identifies one duplex connection within a room.
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct ConnectionId(Ulid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The receiving half handed back to the caller of [Hub::join]; the
/// connection's writer task drains this and writes frames to the wire.
pub type OutboundReceiver = mpsc::Receiver<String>;

struct Room {
    connections: DashMap<ConnectionId, mpsc::Sender<String>>,
}

impl Room {
    fn new() -> Self {
        Self { connections: DashMap::new() }
    }
}

/// Per-room connection set plus per-connection bounded outbound queues.
/// Registration, eviction, and fan-out are all safe under concurrent calls
/// from many producers (readers and the auto-progress timer alike).
#[derive(Default)]
pub struct Hub {
    rooms: DashMap<GameId, Room>,
    queue_capacity: usize,
}

impl Hub {
    pub fn new(queue_capacity: usize) -> Self {
        Self { rooms: DashMap::new(), queue_capacity }
    }

    /// Registers a new connection in `game_id`'s room, returning the
    /// receiving half of its bounded outbound queue.
    pub fn join(&self, game_id: GameId) -> (ConnectionId, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let connection_id = ConnectionId::generate();
        self.rooms.entry(game_id).or_insert_with(Room::new).connections.insert(connection_id, tx);
        debug!(%game_id, %connection_id, "connection joined room");
        (connection_id, rx)
    }

    /// Deregisters a connection. Dropping its `Sender` closes the queue,
    /// which in turn ends the writer task's drain loop.
    pub fn leave(&self, game_id: GameId, connection_id: ConnectionId) {
        if let Some(room) = self.rooms.get(&game_id) {
            room.connections.remove(&connection_id);
        }
        debug!(%game_id, %connection_id, "connection left room");
        self.prune_if_empty(game_id);
    }

    /// Enqueues `message` to every connection in `game_id`'s room.
    /// Best-effort: a connection whose queue is full is evicted and closed
    /// instead of blocking this call.
    pub fn broadcast(&self, game_id: GameId, message: impl Into<String>) {
        let Some(room) = self.rooms.get(&game_id) else {
            return;
        };
        let message = message.into();
        let mut evicted = Vec::new();
        for entry in room.connections.iter() {
            match entry.value().try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%game_id, connection_id = %entry.key(), "evicting slow consumer");
                    evicted.push(*entry.key());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    evicted.push(*entry.key());
                }
            }
        }
        drop(room);
        for connection_id in evicted {
            self.leave(game_id, connection_id);
        }
    }

    /// Enqueues `message` to a single connection only, evicting it on the
    /// same terms as [Hub::broadcast]. Used to reply to the connection that
    /// sent a malformed or rejected command without echoing it to the room.
    pub fn send_to(&self, game_id: GameId, connection_id: ConnectionId, message: impl Into<String>) {
        let Some(room) = self.rooms.get(&game_id) else {
            return;
        };
        let Some(sender) = room.connections.get(&connection_id).map(|entry| entry.clone()) else {
            return;
        };
        drop(room);
        match sender.try_send(message.into()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) | Err(mpsc::error::TrySendError::Closed(_)) => {
                self.leave(game_id, connection_id);
            }
        }
    }

    pub fn room_size(&self, game_id: GameId) -> usize {
        self.rooms.get(&game_id).map(|room| room.connections.len()).unwrap_or(0)
    }

    fn prune_if_empty(&self, game_id: GameId) {
        if self.rooms.get(&game_id).map(|room| room.connections.is_empty()).unwrap_or(false) {
            self.rooms.remove(&game_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use model::GameId;

    use super::*;

    #[tokio::test]
    async fn broadcast_delivers_to_every_connection() {
        let hub = Hub::new(8);
        let game_id = GameId::generate();
        let (_id_a, mut rx_a) = hub.join(game_id);
        let (_id_b, mut rx_b) = hub.join(game_id);

        hub.broadcast(game_id, "hello");

        assert_eq!(rx_a.recv().await, Some("hello".to_string()));
        assert_eq!(rx_b.recv().await, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn slow_consumer_is_evicted_without_blocking_the_producer() {
        let hub = Hub::new(constants::OUTBOUND_QUEUE_CAPACITY);
        let game_id = GameId::generate();
        let (_fast_id, mut fast_rx) = hub.join(game_id);
        // `_slow_rx` is held but never polled, standing in for a writer task
        // that is paused: its queue fills and it gets evicted.
        let (_slow_id, _slow_rx) = hub.join(game_id);

        let drained = tokio::spawn(async move {
            let mut count = 0;
            while fast_rx.recv().await.is_some() {
                count += 1;
            }
            count
        });

        for i in 0..70 {
            hub.broadcast(game_id, format!("message {i}"));
        }

        assert_eq!(hub.room_size(game_id), 1);

        drop(hub);
        assert_eq!(drained.await.unwrap(), 70);
    }

    #[tokio::test]
    async fn send_to_reaches_only_the_named_connection() {
        let hub = Hub::new(8);
        let game_id = GameId::generate();
        let (id_a, mut rx_a) = hub.join(game_id);
        let (_id_b, mut rx_b) = hub.join(game_id);

        hub.send_to(game_id, id_a, "just for you");

        assert_eq!(rx_a.recv().await, Some("just for you".to_string()));
        drop(hub);
        assert_eq!(rx_b.recv().await, None);
    }

    #[tokio::test]
    async fn leave_prunes_empty_rooms() {
        let hub = Hub::new(8);
        let game_id = GameId::generate();
        let (connection_id, _rx) = hub.join(game_id);
        hub.leave(game_id, connection_id);
        assert_eq!(hub.room_size(game_id), 0);
    }
}
