use serde::{Deserialize, Serialize};

/// Number of distinct non-bonus tile kinds: 27 suit kinds + 4 winds + 3 dragons.
pub const KIND_MAX: usize = 34;

/// Total physical tiles in a Singapore set: 4 copies of each non-bonus kind
/// plus 8 unique bonus tiles (4 flowers, 4 animals).
pub const TILE_COUNT: usize = 144;

/// Stable per-game tile identity. Ids are assigned once when the set is
/// built and ride along through every shuffle, draw and meld, so clients can
/// animate a physical tile across state updates.
pub type TileId = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Character = 0,
    Bamboo = 1,
    Dot = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindDir {
    East = 0,
    South = 1,
    West = 2,
    North = 3,
}

impl WindDir {
    pub const ALL: [WindDir; 4] = [WindDir::East, WindDir::South, WindDir::West, WindDir::North];

    /// Counter-clockwise seat rotation order: east -> south -> west -> north -> east.
    pub fn next(self) -> WindDir {
        match self {
            WindDir::East => WindDir::South,
            WindDir::South => WindDir::West,
            WindDir::West => WindDir::North,
            WindDir::North => WindDir::East,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragonColor {
    Red = 0,
    Green = 1,
    White = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusKind {
    Flower = 0,
    Animal = 1,
}

/// What is printed on a tile. Matching for melds and win detection compares
/// definitions; set membership compares [`TileId`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TileDef {
    Suit { suit: Suit, value: u8 },
    Wind { direction: WindDir },
    Dragon { color: DragonColor },
    Bonus { kind: BonusKind, value: u8 },
}

impl TileDef {
    pub fn is_bonus(&self) -> bool {
        matches!(self, TileDef::Bonus { .. })
    }

    pub fn is_honor(&self) -> bool {
        matches!(self, TileDef::Wind { .. } | TileDef::Dragon { .. })
    }

    pub fn suit_value(&self) -> Option<(Suit, u8)> {
        match self {
            TileDef::Suit { suit, value } => Some((*suit, *value)),
            _ => None,
        }
    }

    /// Dense index of the 34 non-bonus kinds, used by the histogram hand
    /// analyzer. Characters 0..9, bamboo 9..18, dots 18..27, winds 27..31,
    /// dragons 31..34. Bonus tiles have no index; they never live in a hand
    /// once replacement has run.
    pub fn kind_index(&self) -> Option<usize> {
        match self {
            TileDef::Suit { suit, value } => Some(*suit as usize * 9 + (*value as usize - 1)),
            TileDef::Wind { direction } => Some(27 + *direction as usize),
            TileDef::Dragon { color } => Some(31 + *color as usize),
            TileDef::Bonus { .. } => None,
        }
    }

    /// Inverse of [`kind_index`](Self::kind_index).
    pub fn from_kind_index(index: usize) -> TileDef {
        match index {
            0..=26 => TileDef::Suit {
                suit: match index / 9 {
                    0 => Suit::Character,
                    1 => Suit::Bamboo,
                    _ => Suit::Dot,
                },
                value: (index % 9) as u8 + 1,
            },
            27..=30 => TileDef::Wind {
                direction: WindDir::ALL[index - 27],
            },
            _ => TileDef::Dragon {
                color: match index - 31 {
                    0 => DragonColor::Red,
                    1 => DragonColor::Green,
                    _ => DragonColor::White,
                },
            },
        }
    }

    /// Total display ordering: characters, bamboo, dots in 1..9, then winds
    /// E S W N, then dragons R G W, then flowers 1..4, then animals 1..4.
    pub fn order_key(&self) -> u8 {
        match self {
            TileDef::Suit { .. } | TileDef::Wind { .. } | TileDef::Dragon { .. } => {
                self.kind_index().unwrap_or(0) as u8
            }
            TileDef::Bonus { kind, value } => KIND_MAX as u8 + *kind as u8 * 4 + (value - 1),
        }
    }
}

/// One physical tile: identity plus printed definition. `face_up` flips when
/// the tile becomes publicly visible (discards, meld tiles, revealed bonuses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: TileId,
    pub def: TileDef,
    pub face_up: bool,
}

impl Tile {
    pub fn new(id: TileId, def: TileDef) -> Self {
        Tile {
            id,
            def,
            face_up: false,
        }
    }
}

/// Build the full 144-tile set in canonical order. Tile ids equal the
/// canonical position, so a given id always denotes the same definition
/// across games.
pub fn standard_set() -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(TILE_COUNT);
    let mut id: TileId = 0;
    for kind in 0..KIND_MAX {
        let def = TileDef::from_kind_index(kind);
        for _ in 0..4 {
            tiles.push(Tile::new(id, def));
            id += 1;
        }
    }
    for kind in [BonusKind::Flower, BonusKind::Animal] {
        for value in 1..=4 {
            tiles.push(Tile::new(id, TileDef::Bonus { kind, value }));
            id += 1;
        }
    }
    tiles
}

/// Insert `tile` into a hand sorted by display order, maintaining the order.
/// Ties break on id so the layout is deterministic.
pub fn sorted_insert(hand: &mut Vec<Tile>, tile: Tile) {
    let key = (tile.def.order_key(), tile.id);
    let pos = hand.partition_point(|t| (t.def.order_key(), t.id) < key);
    hand.insert(pos, tile);
}
