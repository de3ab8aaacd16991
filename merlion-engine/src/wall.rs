use std::collections::VecDeque;

use rand_chacha::ChaCha8Rng;

use crate::seeding::shuffle_tiles;
use crate::tile::{standard_set, Tile};

/// The undrawn tiles, consumable from both ends: normal turn draws come off
/// the head, bonus and kong replacements off the tail. Tiles keep their ids
/// whichever end they leave by.
#[derive(Debug, Clone, Default)]
pub struct Wall {
    tiles: VecDeque<Tile>,
}

impl Wall {
    /// Build and shuffle a fresh 144-tile wall.
    pub fn shuffled(rng: &mut ChaCha8Rng) -> Self {
        let mut tiles = standard_set();
        shuffle_tiles(&mut tiles, rng);
        Wall {
            tiles: tiles.into(),
        }
    }

    /// Fixed-order wall for tests that need scripted deals.
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Wall {
            tiles: tiles.into(),
        }
    }

    pub fn draw_head(&mut self) -> Option<Tile> {
        self.tiles.pop_front()
    }

    pub fn draw_tail(&mut self) -> Option<Tile> {
        self.tiles.pop_back()
    }

    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }
}
