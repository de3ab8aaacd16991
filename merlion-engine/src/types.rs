use serde::{Deserialize, Serialize};

use crate::tile::{Tile, TileDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeldKind {
    Chi,
    Pong,
    Kong,
    ConcealedKong,
}

/// A declared set of 3 or 4 tiles. Chi and pong hold 3, kongs hold 4.
/// For the hand arithmetic every meld counts as one 3-tile equivalent; the
/// extra kong tile is balanced by its replacement draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meld {
    pub kind: MeldKind,
    pub tiles: Vec<Tile>,
    /// Seat the claimed tile came from; `None` for concealed kongs and
    /// promoted fourth tiles drawn by the owner.
    pub from_seat: Option<u8>,
}

impl Meld {
    /// Concealed kongs keep the "concealed hand" bonus; everything else is open.
    pub fn is_open(&self) -> bool {
        self.kind != MeldKind::ConcealedKong
    }

    pub fn is_pong_like(&self) -> bool {
        matches!(
            self.kind,
            MeldKind::Pong | MeldKind::Kong | MeldKind::ConcealedKong
        )
    }

    /// The definition all tiles share for pong-like melds, or the lowest
    /// tile's definition for a chi.
    pub fn def(&self) -> TileDef {
        self.tiles[0].def
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Draw,
    Discard,
    Chi,
    Pong,
    Kong,
    Win,
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Waiting,
    Playing,
    Finished,
}
