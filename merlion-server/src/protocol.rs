//! Wire protocol: JSON text frames, discriminated on `"type"`.

use serde::{Deserialize, Serialize};

use merlion_engine::score::{PaymentResult, TaiResult};
use merlion_engine::tile::{Tile, TileId};
use merlion_engine::types::ActionType;

use crate::view::{ClientGameState, ClientRoom};

/// Query parameters on the WebSocket connect URL.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub reconnect_token: Option<String>,
}

impl ConnectParams {
    /// Display names are trimmed and capped at 16 characters.
    pub fn display_name(&self) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return "Player".to_string();
        }
        trimmed.chars().take(16).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Ready {
        is_ready: bool,
    },
    StartGame,
    Action {
        action: ActionType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tile_id: Option<TileId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chi_index: Option<usize>,
    },
    NextRound,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnPhase {
    HumanNeedsDraw,
    HumanNeedsDiscard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomState {
        room: ClientRoom,
    },
    GameStart {
        state: ClientGameState,
    },
    GameState {
        state: ClientGameState,
    },
    YourTurn {
        phase: TurnPhase,
        available_actions: Vec<ActionType>,
    },
    ClaimWindow {
        /// Milliseconds until the window auto-resolves.
        timeout: u64,
        available_actions: Vec<ActionType>,
    },
    ChiOptions {
        options: Vec<Vec<Tile>>,
    },
    RoundOver {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner_index: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tai_result: Option<TaiResult>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payment_result: Option<PaymentResult>,
        message: String,
    },
    PlayerDisconnected {
        player_index: u8,
    },
    PlayerReconnected {
        player_index: u8,
    },
    Error {
        message: String,
    },
}

/// Decode one inbound frame. Malformed input is dropped silently by
/// returning `None`; the server never explains its protocol to strangers.
pub fn decode_client(text: &str) -> Option<ClientMessage> {
    serde_json::from_str(text).ok()
}

pub fn encode_server(msg: &ServerMessage) -> String {
    serde_json::to_string(msg).expect("server message serialization cannot fail")
}
