//! Per-recipient projections of server state. One player sees their own
//! tiles; everyone else's hand is elided to a count.

use serde::{Deserialize, Serialize};

use merlion_engine::state::{ConnectionStatus, GameState};
use merlion_engine::tile::{Tile, WindDir};
use merlion_engine::types::{GamePhase, Meld};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPlayer {
    pub name: String,
    pub avatar: String,
    pub seat_wind: WindDir,
    /// Present only for the recipient's own seat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Tile>>,
    pub hand_count: usize,
    pub discards: Vec<Tile>,
    pub melds: Vec<Meld>,
    pub revealed_bonuses: Vec<Tile>,
    pub score: i32,
    pub connection: ConnectionStatus,
    pub is_current_turn: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientGameState {
    pub players: Vec<ClientPlayer>,
    pub you: u8,
    pub current_player: u8,
    pub round_wind: WindDir,
    pub round_number: u8,
    pub turn: u32,
    pub wall_remaining: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_discard: Option<Tile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_discarder: Option<u8>,
    pub phase: GamePhase,
}

pub fn project_game(gs: &GameState, you: u8) -> ClientGameState {
    let players = gs
        .players
        .iter()
        .enumerate()
        .map(|(i, p)| ClientPlayer {
            name: p.name.clone(),
            avatar: p.avatar.clone(),
            seat_wind: p.seat_wind,
            hand: (i == you as usize).then(|| p.hand.clone()),
            hand_count: p.hand.len(),
            discards: p.discards.clone(),
            melds: p.melds.clone(),
            revealed_bonuses: p.revealed_bonuses.clone(),
            score: p.score,
            connection: p.connection,
            is_current_turn: p.is_current_turn,
        })
        .collect();

    ClientGameState {
        players,
        you,
        current_player: gs.current_player,
        round_wind: gs.round_wind,
        round_number: gs.round_number,
        turn: gs.turn,
        wall_remaining: gs.wall.remaining(),
        last_discard: gs.last_discard.map(|(_, t)| t),
        last_discarder: gs.last_discard.map(|(s, _)| s),
        phase: gs.phase,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSeat {
    pub name: String,
    pub avatar: String,
    pub is_ready: bool,
    pub is_bot: bool,
    pub connected: bool,
}

/// Lobby roster as one recipient sees it; the reconnect token is private to
/// that recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRoom {
    pub seats: Vec<Option<ClientSeat>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_index: Option<u8>,
    pub you: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_token: Option<String>,
    pub started: bool,
}
