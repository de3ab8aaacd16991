//! Hand analysis: win detection and claim eligibility.
//!
//! Win detection works on a histogram of the 34 non-bonus kinds. The
//! decomposition tries every pair candidate, then greedily consumes the
//! lowest-indexed kind with a triplet or a run. If neither works for the
//! leading kind the branch fails: the leading kind must be consumed by some
//! set in any valid decomposition, so there is nothing else to try. That
//! cut-off keeps the search polynomial on a 14-tile hand.

use crate::tile::{Suit, Tile, TileDef, KIND_MAX};
use crate::types::{Meld, MeldKind};

/// Histogram of non-bonus tile kinds.
#[derive(Debug, Clone)]
pub struct Hand {
    pub counts: [u8; KIND_MAX],
}

impl Default for Hand {
    fn default() -> Self {
        Hand {
            counts: [0; KIND_MAX],
        }
    }
}

impl Hand {
    /// Build from tiles. Returns `None` if a bonus tile is present; bonus
    /// tiles never participate in hand shapes.
    pub fn from_tiles(tiles: &[Tile]) -> Option<Hand> {
        let mut hand = Hand::default();
        for t in tiles {
            hand.counts[t.def.kind_index()?] += 1;
        }
        Some(hand)
    }

    pub fn add(&mut self, kind: usize) {
        self.counts[kind] += 1;
    }

    pub fn remove(&mut self, kind: usize) {
        debug_assert!(self.counts[kind] > 0);
        self.counts[kind] -= 1;
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }
}

/// True iff `kind` can start a run: a suit kind with value <= 7.
fn can_start_run(kind: usize) -> bool {
    kind < 27 && kind % 9 <= 6
}

fn decompose_sets(counts: &mut [u8; KIND_MAX]) -> bool {
    let lead = match counts.iter().position(|&c| c > 0) {
        Some(i) => i,
        None => return true,
    };

    if counts[lead] >= 3 {
        counts[lead] -= 3;
        let ok = decompose_sets(counts);
        counts[lead] += 3;
        if ok {
            return true;
        }
    }

    if can_start_run(lead) && counts[lead + 1] > 0 && counts[lead + 2] > 0 {
        counts[lead] -= 1;
        counts[lead + 1] -= 1;
        counts[lead + 2] -= 1;
        let ok = decompose_sets(counts);
        counts[lead] += 1;
        counts[lead + 1] += 1;
        counts[lead + 2] += 1;
        if ok {
            return true;
        }
    }

    false
}

/// True iff `hand` plus the declared melds forms 4 sets and a pair. The hand
/// must hold exactly `14 - 3 * melds.len()` tiles (a kong still counts as one
/// meld here; its fourth tile is balanced by the replacement draw).
pub fn check_win(hand: &[Tile], melds: &[Meld]) -> bool {
    if hand.len() != 14usize.saturating_sub(3 * melds.len()) {
        return false;
    }
    let mut counts = match Hand::from_tiles(hand) {
        Some(h) => h.counts,
        None => return false,
    };

    for pair in 0..KIND_MAX {
        if counts[pair] < 2 {
            continue;
        }
        counts[pair] -= 2;
        let ok = decompose_sets(&mut counts);
        counts[pair] += 2;
        if ok {
            return true;
        }
    }
    false
}

/// [`check_win`] on `hand + tile` without mutating `hand`.
pub fn check_win_with_tile(hand: &[Tile], melds: &[Meld], tile: &Tile) -> bool {
    let mut full = hand.to_vec();
    full.push(*tile);
    check_win(&full, melds)
}

/// Two held copies of `def`, if the hand can pong it.
pub fn can_pong(hand: &[Tile], def: TileDef) -> Option<[Tile; 2]> {
    let mut found = hand.iter().filter(|t| t.def == def);
    Some([*found.next()?, *found.next()?])
}

/// Three held copies of `def`, if the hand can kong it.
pub fn can_kong(hand: &[Tile], def: TileDef) -> Option<[Tile; 3]> {
    let mut found = hand.iter().filter(|t| t.def == def);
    Some([*found.next()?, *found.next()?, *found.next()?])
}

/// All chi completions for a discard. Chi is only legal for the player seated
/// immediately after the discarder, and only on suit tiles. Each entry is the
/// pair of hand tiles (distinct ids) that completes the run together with the
/// discard.
pub fn can_all_chi(
    hand: &[Tile],
    discard_def: TileDef,
    claimer: u8,
    discarder: u8,
) -> Vec<[Tile; 2]> {
    if (discarder + 1) % 4 != claimer {
        return Vec::new();
    }
    let (suit, value) = match discard_def.suit_value() {
        Some(sv) => sv,
        None => return Vec::new(),
    };

    let find = |v: i8| -> Option<Tile> {
        if !(1..=9).contains(&v) {
            return None;
        }
        let def = TileDef::Suit {
            suit,
            value: v as u8,
        };
        hand.iter().find(|t| t.def == def).copied()
    };

    let v = value as i8;
    let mut options = Vec::new();
    for (a, b) in [(v - 2, v - 1), (v - 1, v + 1), (v + 1, v + 2)] {
        if let (Some(ta), Some(tb)) = (find(a), find(b)) {
            options.push([ta, tb]);
        }
    }
    options
}

/// A legal self-kong for the current player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfKong {
    /// A hand tile matches one of the player's pong melds; the pong is
    /// upgraded in place.
    Promote { tile: Tile },
    /// Four copies held in hand.
    Concealed { tiles: [Tile; 4] },
}

/// Self-kong detection. Promotion is preferred when both forms are legal:
/// it leaves the player with one more tracked meld.
pub fn can_self_kong(hand: &[Tile], melds: &[Meld]) -> Option<SelfKong> {
    for meld in melds {
        if meld.kind != MeldKind::Pong {
            continue;
        }
        if let Some(tile) = hand.iter().find(|t| t.def == meld.def()) {
            return Some(SelfKong::Promote { tile: *tile });
        }
    }

    for lead in hand {
        let mut copies = hand.iter().filter(|t| t.def == lead.def);
        if let (Some(a), Some(b), Some(c), Some(d)) =
            (copies.next(), copies.next(), copies.next(), copies.next())
        {
            return Some(SelfKong::Concealed {
                tiles: [*a, *b, *c, *d],
            });
        }
    }
    None
}
