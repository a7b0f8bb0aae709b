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

//! Client-to-server frames.

use model::{CardId, GameId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameBeginsFrame {
    pub game_id: GameId,
    pub user_id: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardPlayedFrame {
    pub game_id: GameId,
    pub card_id: CardId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeChoseWinningCardFrame {
    pub game_id: GameId,
    pub card_id: CardId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundContinuedFrame {
    pub game_id: GameId,
    pub user_id: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmojiClickedFrame {
    pub game_id: GameId,
    pub user_id: UserId,
    pub emoji: String,
}

/// The closed set of inbound frame types. Unknown or malformed frames are
/// logged and dropped without closing the connection, so decoding failures
/// are handled by the caller rather than this type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum InboundFrame {
    GameBegins(GameBeginsFrame),
    CardPlayed(CardPlayedFrame),
    JudgeChoseWinningCard(JudgeChoseWinningCardFrame),
    RoundContinued(RoundContinuedFrame),
    EmojiClicked(EmojiClickedFrame),
}

impl InboundFrame {
    pub fn game_id(&self) -> GameId {
        match self {
            InboundFrame::GameBegins(f) => f.game_id,
            InboundFrame::CardPlayed(f) => f.game_id,
            InboundFrame::JudgeChoseWinningCard(f) => f.game_id,
            InboundFrame::RoundContinued(f) => f.game_id,
            InboundFrame::EmojiClicked(f) => f.game_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_played_frame_round_trips_through_the_envelope() {
        let frame = InboundFrame::CardPlayed(CardPlayedFrame {
            game_id: GameId::generate(),
            card_id: CardId::new("W1"),
        });
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"type\":\"CardPlayed\""));
        let decoded: InboundFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.game_id(), frame.game_id());
    }

    #[test]
    fn unknown_type_fails_to_decode() {
        let json = r#"{"type":"NotARealType","payload":{}}"#;
        assert!(serde_json::from_str::<InboundFrame>(json).is_err());
    }
}
