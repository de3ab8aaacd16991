use serde::{Deserialize, Serialize};

use crate::tile::{sorted_insert, Tile, TileId, WindDir};
use crate::types::{Meld, MeldKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    Human,
    HumanDisconnected,
    Bot,
}

impl ConnectionStatus {
    /// True when the seat's decisions come from the bot policy right now.
    pub fn is_bot_driven(&self) -> bool {
        !matches!(self, ConnectionStatus::Human)
    }
}

/// One seat's complete game-side state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    pub avatar: String,
    pub seat_wind: WindDir,
    /// Tiles not committed to melds, sorted for display.
    pub hand: Vec<Tile>,
    /// Tiles this player threw away, in discard order.
    pub discards: Vec<Tile>,
    pub melds: Vec<Meld>,
    /// Bonus tiles revealed on draw/deal, in order of discovery.
    pub revealed_bonuses: Vec<Tile>,
    pub score: i32,
    pub connection: ConnectionStatus,
    pub is_current_turn: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, avatar: impl Into<String>, seat_wind: WindDir) -> Self {
        Player {
            name: name.into(),
            avatar: avatar.into(),
            seat_wind,
            hand: Vec::new(),
            discards: Vec::new(),
            melds: Vec::new(),
            revealed_bonuses: Vec::new(),
            score: 0,
            connection: ConnectionStatus::Human,
            is_current_turn: false,
        }
    }

    pub fn bot(name: impl Into<String>) -> Self {
        let mut p = Player::new(name, "🤖", WindDir::East);
        p.connection = ConnectionStatus::Bot;
        p
    }

    pub fn take_tile(&mut self, tile: Tile) {
        sorted_insert(&mut self.hand, tile);
    }

    pub fn remove_tile(&mut self, id: TileId) -> Option<Tile> {
        let idx = self.hand.iter().position(|t| t.id == id)?;
        Some(self.hand.remove(idx))
    }

    pub fn holds(&self, id: TileId) -> bool {
        self.hand.iter().any(|t| t.id == id)
    }

    /// Kongs of any flavor still count as a single meld here; the fourth
    /// tile is balanced by the replacement draw.
    pub fn meld_count(&self) -> usize {
        self.melds.len()
    }

    /// Expected hand size when it is not this player's turn to discard.
    pub fn settled_hand_size(&self) -> usize {
        13 - 3 * self.meld_count()
    }

    /// Clear per-hand state, keeping identity, score and connection.
    pub fn reset_for_new_hand(&mut self) {
        self.hand.clear();
        self.discards.clear();
        self.melds.clear();
        self.revealed_bonuses.clear();
        self.is_current_turn = false;
    }

    pub fn pong_meld_mut(&mut self, def: crate::tile::TileDef) -> Option<&mut Meld> {
        self.melds
            .iter_mut()
            .find(|m| m.kind == MeldKind::Pong && m.def() == def)
    }
}
