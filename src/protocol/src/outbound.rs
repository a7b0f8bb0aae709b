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

//! Server-to-room frames.

use model::{GameId, UserId};
use serde::{Deserialize, Serialize};

use crate::snapshot::GameSnapshot;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmojiClickedPayload {
    pub user_id: UserId,
    pub emoji: String,
    pub game_id: GameId,
}

/// The outbound frame types a room's connections receive. Players and their
/// hands are included as-is in `GameUpdate`; this layer does not redact
/// other players' hands.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OutboundFrame {
    #[serde(rename = "GAME_UPDATE")]
    GameUpdate(GameSnapshot),
    #[serde(rename = "CHAT_MESSAGE")]
    ChatMessage(String),
    #[serde(rename = "EMOJI_CLICKED")]
    EmojiClicked(EmojiClickedPayload),
}

impl OutboundFrame {
    pub fn chat(message: impl Into<String>) -> Self {
        Self::ChatMessage(message.into())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_serializes_with_the_uppercase_type_tag() {
        let frame = OutboundFrame::chat("Sorry! you can't do that");
        let json = frame.to_json().unwrap();
        assert!(json.contains("\"type\":\"CHAT_MESSAGE\""));
        assert!(json.contains("Sorry! you can't do that"));
    }
}
