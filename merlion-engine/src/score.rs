//! Singapore tai scoring and payment resolution.
//!
//! Patterns are independent and additive. Names on the wire are fixed;
//! clients key their strings off them.

use serde::{Deserialize, Serialize};

use crate::state::{Player, NP};
use crate::tile::{BonusKind, DragonColor, Suit, Tile, TileDef, WindDir};

pub const MAX_TAI: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaiEntry {
    pub name: String,
    pub tai: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaiResult {
    pub entries: Vec<TaiEntry>,
    /// Final tai, clamped to 1..=10.
    pub tai: u32,
    pub base_points: i32,
}

impl TaiResult {
    /// Unclamped pattern sum; the minimum-tai win gate checks this.
    pub fn raw_total(&self) -> u32 {
        self.entries.iter().map(|e| e.tai).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub player_index: u8,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub payments: Vec<Payment>,
    pub winner_total: i32,
}

fn wind_def(direction: WindDir) -> TileDef {
    TileDef::Wind { direction }
}

/// Every tile in the winning arrangement: hand (including the winning tile)
/// plus all meld tiles. Bonus tiles are scored separately.
fn full_tile_set(player: &Player) -> Vec<Tile> {
    let mut tiles = player.hand.clone();
    for m in &player.melds {
        tiles.extend(m.tiles.iter().copied());
    }
    tiles
}

fn count_in_hand(player: &Player, def: TileDef) -> usize {
    player.hand.iter().filter(|t| t.def == def).count()
}

fn pong_like_defs(player: &Player) -> Vec<TileDef> {
    player
        .melds
        .iter()
        .filter(|m| m.is_pong_like())
        .map(|m| m.def())
        .collect()
}

pub fn calculate_tai(player: &Player, round_wind: WindDir, self_draw: bool) -> TaiResult {
    let mut entries = Vec::new();
    let mut push = |name: &str, tai: u32| {
        entries.push(TaiEntry {
            name: name.to_string(),
            tai,
        });
    };

    // --- Bonus tiles ---
    let flowers: Vec<u8> = player
        .revealed_bonuses
        .iter()
        .filter_map(|t| match t.def {
            TileDef::Bonus {
                kind: BonusKind::Flower,
                value,
            } => Some(value),
            _ => None,
        })
        .collect();
    let animals: Vec<u8> = player
        .revealed_bonuses
        .iter()
        .filter_map(|t| match t.def {
            TileDef::Bonus {
                kind: BonusKind::Animal,
                value,
            } => Some(value),
            _ => None,
        })
        .collect();

    if !flowers.is_empty() {
        push("Flowers", flowers.len() as u32);
    }
    if !animals.is_empty() {
        push("Animals", animals.len() as u32);
    }
    if flowers.len() == 4 {
        push("All-flowers", 1);
    }
    if animals.len() == 4 {
        push("All-animals", 1);
    }
    if animals.contains(&1) && animals.contains(&2) {
        push("Cat-and-mouse", 1);
    }
    if animals.contains(&3) && animals.contains(&4) {
        push("Rooster-and-centipede", 1);
    }
    if player.revealed_bonuses.is_empty() {
        push("No bonus tiles", 1);
    }

    if self_draw {
        push("Self-draw", 1);
    }
    if player.melds.iter().all(|m| !m.is_open()) {
        push("Concealed hand", 1);
    }

    // --- Meld shapes ---
    let pongs = pong_like_defs(player);
    if !player.melds.is_empty() && player.melds.iter().all(|m| m.is_pong_like()) {
        push("All pongs", 2);
    }

    let dragon_pongs: Vec<DragonColor> = pongs
        .iter()
        .filter_map(|d| match d {
            TileDef::Dragon { color } => Some(*color),
            _ => None,
        })
        .collect();
    for _ in &dragon_pongs {
        push("Dragon pong", 1);
    }
    if pongs.contains(&wind_def(player.seat_wind)) {
        push("Seat-wind pong", 1);
    }
    if pongs.contains(&wind_def(round_wind)) {
        push("Round-wind pong", 1);
    }

    // --- Whole-hand colors ---
    let tiles = full_tile_set(player);
    let suits: Vec<Suit> = tiles
        .iter()
        .filter_map(|t| t.def.suit_value().map(|(s, _)| s))
        .collect();
    let honor_count = tiles.iter().filter(|t| t.def.is_honor()).count();
    let single_suit = !suits.is_empty() && suits.iter().all(|&s| s == suits[0]);

    if single_suit && honor_count == 0 {
        push("Full flush", 4);
    }
    if single_suit && honor_count > 0 {
        push("Half flush", 2);
    }
    if honor_count == tiles.len() {
        push("All honors", 10);
    }
    if tiles
        .iter()
        .all(|t| matches!(t.def.suit_value(), Some((_, 1)) | Some((_, 9))))
    {
        push("All terminals", 10);
    }

    // --- Dragon and wind families ---
    if dragon_pongs.len() == 2 {
        let third = [DragonColor::Red, DragonColor::Green, DragonColor::White]
            .into_iter()
            .find(|c| !dragon_pongs.contains(c))
            .unwrap();
        if count_in_hand(player, TileDef::Dragon { color: third }) >= 2 {
            push("Small three dragons", 4);
        }
    }
    if dragon_pongs.len() == 3 {
        push("Big three dragons", 8);
    }

    let wind_pongs: Vec<WindDir> = pongs
        .iter()
        .filter_map(|d| match d {
            TileDef::Wind { direction } => Some(*direction),
            _ => None,
        })
        .collect();
    if wind_pongs.len() == 3 {
        let fourth = WindDir::ALL
            .into_iter()
            .find(|w| !wind_pongs.contains(w))
            .unwrap();
        if count_in_hand(player, wind_def(fourth)) >= 2 {
            push("Small four winds", 8);
        }
    }
    if wind_pongs.len() == 4 {
        push("Big four winds", 10);
    }

    let raw: u32 = entries.iter().map(|e| e.tai).sum();
    let tai = raw.clamp(1, MAX_TAI);
    TaiResult {
        entries,
        tai,
        base_points: 1 << tai,
    }
}

/// Resolve payments for a finished hand. On a discard win the shooter pays
/// double; on self-draw every non-winner pays the base. The four entries sum
/// to zero.
pub fn calculate_payments(
    winner: u8,
    shooter: Option<u8>,
    self_draw: bool,
    base_points: i32,
) -> PaymentResult {
    let mut amounts = [0i32; NP];
    for seat in 0..NP as u8 {
        if seat == winner {
            continue;
        }
        let pays = if !self_draw && shooter == Some(seat) {
            2 * base_points
        } else {
            base_points
        };
        amounts[seat as usize] = -pays;
        amounts[winner as usize] += pays;
    }
    let winner_total = amounts[winner as usize];
    PaymentResult {
        payments: amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| Payment {
                player_index: i as u8,
                amount,
            })
            .collect(),
        winner_total,
    }
}
