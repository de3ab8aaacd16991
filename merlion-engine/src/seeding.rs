//! Deterministic RNG seeding for walls and bot policy.
//!
//! A room owns one [`SessionRng`]; every hand derives its own wall RNG via a
//! SHA-256 KDF over `(session_seed, hand_index)`, and the bot policy gets an
//! independent stream from the same session seed. Given the same session
//! seed, a bots-only game replays identically on any platform, which is what
//! the scripted end-to-end tests rely on.
//!
//! The tile shuffle lives here too, written out rather than taken from
//! `rand::seq::SliceRandom`, so a recorded session seed keeps producing the
//! same wall across `rand` upgrades.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::tile::Tile;

/// Shuffle a freshly built tile set in place: repeatedly pick a uniform tile
/// from the unsettled prefix and swap it into the last open slot.
pub fn shuffle_tiles(tiles: &mut [Tile], rng: &mut ChaCha8Rng) {
    let mut open = tiles.len();
    while open > 1 {
        let pick = rng.random_range(0..open);
        open -= 1;
        tiles.swap(pick, open);
    }
}

fn derive(seed: &[u8; 32], domain: &[u8], index: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(domain);
    hasher.update(index.to_le_bytes());
    hasher.finalize().into()
}

/// Per-room seed source. Hands walls out one at a time and produces the bot
/// policy seed; both are pure functions of the session seed.
#[derive(Debug, Clone)]
pub struct SessionRng {
    seed: [u8; 32],
    hand_index: u64,
}

impl SessionRng {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            hand_index: 0,
        }
    }

    /// Convenience constructor for tests and the CLI `--seed` flag.
    pub fn from_u64(seed: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        Self::new(bytes)
    }

    /// Fresh entropy for rooms without a configured seed.
    pub fn from_entropy() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill(&mut bytes);
        Self::new(bytes)
    }

    pub fn hand_index(&self) -> u64 {
        self.hand_index
    }

    /// RNG for the next hand's wall shuffle; advances the hand counter.
    pub fn next_wall_rng(&mut self) -> ChaCha8Rng {
        let derived = derive(&self.seed, b"wall", self.hand_index);
        self.hand_index += 1;
        ChaCha8Rng::from_seed(derived)
    }

    /// Seed for the room's bot policy stream. Stable across hands so the
    /// policy RNG is advanced only by decisions actually taken.
    pub fn bot_seed(&self) -> [u8; 32] {
        derive(&self.seed, b"bot", 0)
    }

    /// Seed material for reconnect-token generation.
    pub fn token_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::from_seed(derive(&self.seed, b"token", 0))
    }
}
