//! Heuristic bot policy for vacant and disconnected seats.
//!
//! The policy owns its RNG so a room can seed it deterministically; the
//! probabilities below are part of the behavior, not cosmetics. Discard
//! choice is a pure isolation heuristic and uses no randomness.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::state::{ClaimOptions, Player};
use crate::tile::{TileDef, TileId};

pub const BOT_NAMES: [&str; 4] = ["Ah Beng", "Mei Ling", "Uncle Lim", "Xiao Hua"];

const PONG_CHANCE: f64 = 0.3;
const CHI_CHANCE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotClaim {
    Win,
    Kong,
    Pong,
    Chi(usize),
    Pass,
}

#[derive(Debug, Clone)]
pub struct BotPolicy {
    rng: ChaCha8Rng,
}

impl BotPolicy {
    pub fn new(seed: [u8; 32]) -> Self {
        BotPolicy {
            rng: ChaCha8Rng::from_seed(seed),
        }
    }

    /// Pick the most expendable tile: isolated tiles go first, kept pairs
    /// and near-runs stay, residual bonus tiles (which only appear if the
    /// wall ran dry mid-replacement) go immediately.
    pub fn choose_discard(&mut self, player: &Player) -> TileId {
        let hand = &player.hand;
        let mut best: Option<(i32, TileId)> = None;
        for tile in hand {
            let score = Self::isolation_score(tile.def, hand.iter().map(|t| t.def));
            if best.map(|(b, _)| score > b).unwrap_or(true) {
                best = Some((score, tile.id));
            }
        }
        best.map(|(_, id)| id).expect("discard from empty hand")
    }

    fn isolation_score(def: TileDef, hand: impl Iterator<Item = TileDef> + Clone) -> i32 {
        if def.is_bonus() {
            return 1_000;
        }
        let mut score = 0;
        let copies = hand.clone().filter(|d| *d == def).count() as i32;
        // A pair in hand is a pair kept; a triplet even more so.
        score -= 6 * (copies - 1);
        if let Some((suit, value)) = def.suit_value() {
            for other in hand {
                let Some((s, v)) = other.suit_value() else {
                    continue;
                };
                if s != suit || v == value {
                    continue;
                }
                match (v as i32 - value as i32).abs() {
                    1 => score -= 3,
                    2 => score -= 1,
                    _ => {}
                }
            }
            if value == 1 || value == 9 {
                score += 1;
            }
        }
        score
    }

    /// Claim decision against a discard of `discard_def`. Wins and kongs are
    /// always taken (the room has already applied the tai gate to `win`);
    /// pongs are certain on dragons and the bot's own seat wind, otherwise
    /// probabilistic, as are chis.
    pub fn decide_claim(
        &mut self,
        player: &Player,
        discard_def: TileDef,
        options: &ClaimOptions,
    ) -> BotClaim {
        if options.win {
            return BotClaim::Win;
        }
        if options.kong {
            return BotClaim::Kong;
        }
        if options.pong {
            let certain = match discard_def {
                TileDef::Dragon { .. } => true,
                TileDef::Wind { direction } => direction == player.seat_wind,
                _ => false,
            };
            if certain || self.rng.random_bool(PONG_CHANCE) {
                return BotClaim::Pong;
            }
        }
        if !options.chi.is_empty() && self.rng.random_bool(CHI_CHANCE) {
            return BotClaim::Chi(self.rng.random_range(0..options.chi.len()));
        }
        BotClaim::Pass
    }

    /// Self-kongs are always worth the replacement draw.
    pub fn wants_self_kong(&mut self) -> bool {
        true
    }
}
