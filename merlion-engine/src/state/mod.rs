//! Canonical game state and the move applicators that advance it.
//!
//! Every applicator validates before it mutates: a rejected move returns an
//! error and leaves the state untouched, so the caller can surface the
//! rejection without comparing states. Applicators never perform I/O; the
//! room layer owns sequencing, timers and broadcasts.

use crate::errors::{EngineResult, MahjongError};
use crate::hand::{
    can_all_chi, can_kong, can_pong, can_self_kong, check_win, check_win_with_tile, SelfKong,
};
use crate::tile::{Tile, TileId, WindDir};
use crate::types::{ActionType, GamePhase, Meld, MeldKind};
use crate::wall::Wall;

pub mod player;
pub use player::{ConnectionStatus, Player};

pub const NP: usize = 4;

#[derive(Debug, Clone)]
pub struct GameState {
    pub players: [Player; NP],
    pub wall: Wall,
    pub current_player: u8,
    pub round_wind: WindDir,
    /// Hand number within the current round wind, 1..=4.
    pub round_number: u8,
    /// Discard counter within the current hand.
    pub turn: u32,
    /// The discard currently claimable, with its discarder. The tile also
    /// sits at the end of the discarder's discard pile until claimed.
    pub last_discard: Option<(u8, Tile)>,
    pub phase: GamePhase,
}

/// Result of a head draw or a tail replacement chain. `drawn` is `None` when
/// the wall ran dry before a non-bonus tile arrived.
#[derive(Debug, Clone)]
pub struct DrawOutcome {
    pub drawn: Option<Tile>,
    pub revealed: Vec<Tile>,
}

#[derive(Debug, Clone, Copy)]
pub struct DealOutcome {
    pub exhausted: bool,
}

/// How a self-kong was realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfKongKind {
    Promoted,
    Concealed,
}

/// Claims available to one seat against the current discard.
#[derive(Debug, Clone, Default)]
pub struct ClaimOptions {
    pub win: bool,
    pub kong: bool,
    pub pong: bool,
    pub chi: Vec<[Tile; 2]>,
}

impl ClaimOptions {
    pub fn any(&self) -> bool {
        self.win || self.kong || self.pong || !self.chi.is_empty()
    }

    pub fn available_actions(&self) -> Vec<ActionType> {
        let mut actions = Vec::new();
        if self.win {
            actions.push(ActionType::Win);
        }
        if self.kong {
            actions.push(ActionType::Kong);
        }
        if self.pong {
            actions.push(ActionType::Pong);
        }
        if !self.chi.is_empty() {
            actions.push(ActionType::Chi);
        }
        actions.push(ActionType::Pass);
        actions
    }
}

impl GameState {
    pub fn new(players: [Player; NP]) -> Self {
        let mut state = GameState {
            players,
            wall: Wall::default(),
            current_player: 0,
            round_wind: WindDir::East,
            round_number: 1,
            turn: 0,
            last_discard: None,
            phase: GamePhase::Waiting,
        };
        for (i, p) in state.players.iter_mut().enumerate() {
            p.seat_wind = WindDir::ALL[i];
        }
        state
    }

    pub fn player(&self, seat: u8) -> &Player {
        &self.players[seat as usize]
    }

    pub fn player_mut(&mut self, seat: u8) -> &mut Player {
        &mut self.players[seat as usize]
    }

    /// The dealer holds seat wind east.
    pub fn dealer_index(&self) -> u8 {
        self.players
            .iter()
            .position(|p| p.seat_wind == WindDir::East)
            .unwrap_or(0) as u8
    }

    fn set_current(&mut self, seat: u8) {
        self.current_player = seat;
        for (i, p) in self.players.iter_mut().enumerate() {
            p.is_current_turn = i == seat as usize;
        }
    }

    fn require_playing(&self) -> EngineResult<()> {
        if self.phase != GamePhase::Playing {
            return Err(MahjongError::invalid_state("hand is not in progress"));
        }
        Ok(())
    }

    fn require_current(&self, seat: u8) -> EngineResult<()> {
        self.require_playing()?;
        if self.current_player != seat {
            return Err(MahjongError::invalid_action(format!(
                "seat {seat} is not the current player"
            )));
        }
        Ok(())
    }

    /// True when `seat` has settled to 13 - 3·melds tiles and owes a draw.
    pub fn needs_draw(&self, seat: u8) -> bool {
        let p = self.player(seat);
        p.hand.len() == p.settled_hand_size()
    }

    /// True when `seat` holds the extra tile and owes a discard.
    pub fn holds_extra_tile(&self, seat: u8) -> bool {
        let p = self.player(seat);
        p.hand.len() == p.settled_hand_size() + 1
    }

    // ------------------------------------------------------------------
    // Dealing
    // ------------------------------------------------------------------

    /// Deal a fresh hand from `wall`: 13 tiles each off the head, a 14th for
    /// the dealer, then bonus replacement to fixed point (replacements come
    /// off the tail and may themselves be bonuses). On the vanishingly rare
    /// wall exhaustion during replacement the hand ends immediately in a
    /// draw.
    pub fn deal(&mut self, wall: Wall) -> EngineResult<DealOutcome> {
        if self.phase == GamePhase::Playing {
            return Err(MahjongError::invalid_state("hand already in progress"));
        }

        self.wall = wall;
        self.turn = 0;
        self.last_discard = None;
        for p in self.players.iter_mut() {
            p.reset_for_new_hand();
        }

        let dealer = self.dealer_index();
        for offset in 0..NP as u8 {
            let seat = (dealer + offset) % NP as u8;
            for _ in 0..13 {
                let tile = self
                    .wall
                    .draw_head()
                    .ok_or(MahjongError::WallExhausted)?;
                self.player_mut(seat).take_tile(tile);
            }
        }
        let fourteenth = self.wall.draw_head().ok_or(MahjongError::WallExhausted)?;
        self.player_mut(dealer).take_tile(fourteenth);

        for offset in 0..NP as u8 {
            let seat = (dealer + offset) % NP as u8;
            if !self.replace_bonuses(seat) {
                self.phase = GamePhase::Finished;
                return Ok(DealOutcome { exhausted: true });
            }
        }

        self.phase = GamePhase::Playing;
        self.set_current(dealer);
        Ok(DealOutcome { exhausted: false })
    }

    /// Rotate seats for the next hand and deal it. When the dealer won, the
    /// seats hold and the round counters stand; otherwise every seat wind
    /// advances one step, and a full cycle advances the round wind.
    pub fn rotate_and_deal(&mut self, wall: Wall, dealer_won: bool) -> EngineResult<DealOutcome> {
        if self.phase != GamePhase::Finished {
            return Err(MahjongError::invalid_state("hand is still in progress"));
        }
        if !dealer_won {
            for p in self.players.iter_mut() {
                p.seat_wind = p.seat_wind.next();
            }
            self.round_number += 1;
            if self.round_number > 4 {
                self.round_number = 1;
                self.round_wind = self.round_wind.next();
            }
        }
        self.deal(wall)
    }

    /// Strip bonus tiles from `seat`'s hand to fixed point, replacing each
    /// from the tail. Returns false if the wall ran out.
    fn replace_bonuses(&mut self, seat: u8) -> bool {
        loop {
            let pos = self
                .player(seat)
                .hand
                .iter()
                .position(|t| t.def.is_bonus());
            let Some(pos) = pos else {
                return true;
            };
            let mut bonus = self.player_mut(seat).hand.remove(pos);
            bonus.face_up = true;
            self.player_mut(seat).revealed_bonuses.push(bonus);
            match self.wall.draw_tail() {
                Some(replacement) => self.player_mut(seat).take_tile(replacement),
                None => return false,
            }
        }
    }

    // ------------------------------------------------------------------
    // Draws
    // ------------------------------------------------------------------

    /// Run the bonus chain on `first`: reveal bonuses and pull replacements
    /// off the tail until a non-bonus tile lands in the hand or the wall is
    /// dry.
    fn settle_draw(&mut self, seat: u8, first: Option<Tile>) -> DrawOutcome {
        let mut revealed = Vec::new();
        let mut next = first;
        loop {
            match next {
                None => {
                    return DrawOutcome {
                        drawn: None,
                        revealed,
                    }
                }
                Some(tile) if tile.def.is_bonus() => {
                    let mut bonus = tile;
                    bonus.face_up = true;
                    self.player_mut(seat).revealed_bonuses.push(bonus);
                    revealed.push(bonus);
                    next = self.wall.draw_tail();
                }
                Some(tile) => {
                    self.player_mut(seat).take_tile(tile);
                    return DrawOutcome {
                        drawn: Some(tile),
                        revealed,
                    };
                }
            }
        }
    }

    /// Normal turn draw off the head. `drawn: None` means the wall is
    /// exhausted and the hand ends in a draw.
    pub fn draw(&mut self, seat: u8) -> EngineResult<DrawOutcome> {
        self.require_current(seat)?;
        if !self.needs_draw(seat) {
            return Err(MahjongError::invalid_action("seat already holds 14"));
        }
        let first = self.wall.draw_head();
        Ok(self.settle_draw(seat, first))
    }

    /// Replacement draw off the tail, used after every kong.
    fn replacement_draw(&mut self, seat: u8) -> DrawOutcome {
        let first = self.wall.draw_tail();
        self.settle_draw(seat, first)
    }

    // ------------------------------------------------------------------
    // Discards and claims
    // ------------------------------------------------------------------

    pub fn discard(&mut self, seat: u8, tile_id: TileId) -> EngineResult<Tile> {
        self.require_current(seat)?;
        if !self.holds_extra_tile(seat) {
            return Err(MahjongError::invalid_action("nothing to discard yet"));
        }
        let mut tile = self
            .player_mut(seat)
            .remove_tile(tile_id)
            .ok_or_else(|| MahjongError::invalid_action("tile not in hand"))?;
        tile.face_up = true;
        self.player_mut(seat).discards.push(tile);
        self.last_discard = Some((seat, tile));
        self.turn += 1;
        for p in self.players.iter_mut() {
            p.is_current_turn = false;
        }
        Ok(tile)
    }

    /// All claims `seat` could make against the current discard.
    pub fn claim_options_for(&self, seat: u8) -> ClaimOptions {
        let Some((discarder, tile)) = self.last_discard else {
            return ClaimOptions::default();
        };
        if seat == discarder {
            return ClaimOptions::default();
        }
        let p = self.player(seat);
        ClaimOptions {
            win: check_win_with_tile(&p.hand, &p.melds, &tile),
            kong: can_kong(&p.hand, tile.def).is_some(),
            pong: can_pong(&p.hand, tile.def).is_some(),
            chi: can_all_chi(&p.hand, tile.def, seat, discarder),
        }
    }

    /// Take the pending discard off its discarder's pile. It is always the
    /// most recent discard; claims resolve before anyone discards again.
    fn take_last_discard(&mut self) -> EngineResult<(u8, Tile)> {
        let (discarder, tile) = self
            .last_discard
            .ok_or_else(|| MahjongError::invalid_state("no discard to claim"))?;
        let popped = self
            .player_mut(discarder)
            .discards
            .pop()
            .ok_or_else(|| MahjongError::invalid_state("discard pile empty"))?;
        debug_assert_eq!(popped.id, tile.id);
        self.last_discard = None;
        Ok((discarder, popped))
    }

    fn remove_hand_tiles(&mut self, seat: u8, ids: &[TileId]) -> Vec<Tile> {
        let mut taken = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(mut t) = self.player_mut(seat).remove_tile(id) {
                t.face_up = true;
                taken.push(t);
            }
        }
        taken
    }

    pub fn claim_pong(&mut self, seat: u8) -> EngineResult<()> {
        self.require_playing()?;
        let options = self.claim_options_for(seat);
        if !options.pong {
            return Err(MahjongError::invalid_action("pong not available"));
        }
        let pair = {
            let p = self.player(seat);
            let (_, tile) = self.last_discard.unwrap();
            can_pong(&p.hand, tile.def).unwrap()
        };
        let (discarder, mut claimed) = self.take_last_discard()?;
        claimed.face_up = true;
        let mut tiles = self.remove_hand_tiles(seat, &[pair[0].id, pair[1].id]);
        tiles.push(claimed);
        self.player_mut(seat).melds.push(Meld {
            kind: MeldKind::Pong,
            tiles,
            from_seat: Some(discarder),
        });
        self.set_current(seat);
        Ok(())
    }

    /// Kong from a discard. The claimer draws a replacement off the tail;
    /// the outcome reports it so the caller can run post-draw decisions.
    pub fn claim_kong(&mut self, seat: u8) -> EngineResult<DrawOutcome> {
        self.require_playing()?;
        let options = self.claim_options_for(seat);
        if !options.kong {
            return Err(MahjongError::invalid_action("kong not available"));
        }
        let triple = {
            let p = self.player(seat);
            let (_, tile) = self.last_discard.unwrap();
            can_kong(&p.hand, tile.def).unwrap()
        };
        let (discarder, mut claimed) = self.take_last_discard()?;
        claimed.face_up = true;
        let mut tiles = self.remove_hand_tiles(seat, &[triple[0].id, triple[1].id, triple[2].id]);
        tiles.push(claimed);
        self.player_mut(seat).melds.push(Meld {
            kind: MeldKind::Kong,
            tiles,
            from_seat: Some(discarder),
        });
        self.set_current(seat);
        Ok(self.replacement_draw(seat))
    }

    /// Chi with the `choice`-th completion from [`can_all_chi`].
    pub fn claim_chi(&mut self, seat: u8, choice: usize) -> EngineResult<()> {
        self.require_playing()?;
        let options = self.claim_options_for(seat);
        let pair = *options
            .chi
            .get(choice)
            .ok_or_else(|| MahjongError::invalid_action("chi not available"))?;
        let (discarder, mut claimed) = self.take_last_discard()?;
        claimed.face_up = true;
        let mut tiles = self.remove_hand_tiles(seat, &[pair[0].id, pair[1].id]);
        tiles.push(claimed);
        tiles.sort_by_key(|t| t.def.order_key());
        self.player_mut(seat).melds.push(Meld {
            kind: MeldKind::Chi,
            tiles,
            from_seat: Some(discarder),
        });
        self.set_current(seat);
        Ok(())
    }

    /// Win on the current discard. Returns the winning tile; the caller
    /// still knows the discarder as the shooter.
    pub fn claim_win(&mut self, seat: u8) -> EngineResult<Tile> {
        self.require_playing()?;
        let options = self.claim_options_for(seat);
        if !options.win {
            return Err(MahjongError::invalid_action("hand does not win on this tile"));
        }
        let (_, claimed) = self.take_last_discard()?;
        self.player_mut(seat).take_tile(claimed);
        self.finish_hand();
        Ok(claimed)
    }

    /// Self-drawn win with the 14-tile hand as it stands.
    pub fn declare_self_win(&mut self, seat: u8) -> EngineResult<()> {
        self.require_current(seat)?;
        if !self.holds_extra_tile(seat) {
            return Err(MahjongError::invalid_action("no drawn tile to win on"));
        }
        let p = self.player(seat);
        if !check_win(&p.hand, &p.melds) {
            return Err(MahjongError::invalid_action("hand is not a winning shape"));
        }
        self.finish_hand();
        Ok(())
    }

    fn finish_hand(&mut self) {
        self.phase = GamePhase::Finished;
        for p in self.players.iter_mut() {
            p.is_current_turn = false;
        }
    }

    /// End the hand with no winner (wall exhausted).
    pub fn finish_drawn_hand(&mut self) {
        self.finish_hand();
    }

    // ------------------------------------------------------------------
    // Self-kong
    // ------------------------------------------------------------------

    /// The self-kong the current player could declare, if any.
    pub fn self_kong_option(&self, seat: u8) -> Option<SelfKong> {
        if self.phase != GamePhase::Playing
            || self.current_player != seat
            || !self.holds_extra_tile(seat)
        {
            return None;
        }
        let p = self.player(seat);
        can_self_kong(&p.hand, &p.melds)
    }

    /// Seats that could win on `tile` if it were discarded, ordered by
    /// distance from `from_seat` in turn order. Used to offer robbing when a
    /// pong is promoted to a kong.
    pub fn find_robbers(&self, from_seat: u8, tile: Tile) -> Vec<u8> {
        let mut robbers = Vec::new();
        for offset in 1..NP as u8 {
            let seat = (from_seat + offset) % NP as u8;
            let p = self.player(seat);
            if check_win_with_tile(&p.hand, &p.melds, &tile) {
                robbers.push(seat);
            }
        }
        robbers
    }

    /// Declare the self-kong found by [`self_kong_option`] and draw the
    /// replacement. Robbery checks happen before this is called.
    pub fn apply_self_kong(&mut self, seat: u8) -> EngineResult<(SelfKongKind, DrawOutcome)> {
        let option = self
            .self_kong_option(seat)
            .ok_or_else(|| MahjongError::invalid_action("self-kong not available"))?;
        match option {
            SelfKong::Promote { tile } => {
                let mut promoted = self
                    .player_mut(seat)
                    .remove_tile(tile.id)
                    .ok_or_else(|| MahjongError::invalid_action("tile not in hand"))?;
                promoted.face_up = true;
                let meld = self
                    .player_mut(seat)
                    .pong_meld_mut(promoted.def)
                    .ok_or_else(|| MahjongError::invalid_state("pong meld missing"))?;
                meld.kind = MeldKind::Kong;
                meld.tiles.push(promoted);
                Ok((SelfKongKind::Promoted, self.replacement_draw(seat)))
            }
            SelfKong::Concealed { tiles } => {
                let ids: Vec<TileId> = tiles.iter().map(|t| t.id).collect();
                let taken = self.remove_hand_tiles(seat, &ids);
                if taken.len() != 4 {
                    return Err(MahjongError::invalid_state("concealed kong tiles missing"));
                }
                self.player_mut(seat).melds.push(Meld {
                    kind: MeldKind::ConcealedKong,
                    tiles: taken,
                    from_seat: None,
                });
                Ok((SelfKongKind::Concealed, self.replacement_draw(seat)))
            }
        }
    }

    /// A rob of a promoted kong: the fourth tile goes to the robber's hand
    /// instead of the meld, and the hand ends. The kong player's pong stays
    /// a pong.
    pub fn rob_kong(&mut self, robber: u8, kong_seat: u8, tile_id: TileId) -> EngineResult<Tile> {
        self.require_playing()?;
        let tile = *self
            .player(kong_seat)
            .hand
            .iter()
            .find(|t| t.id == tile_id)
            .ok_or_else(|| MahjongError::invalid_action("promoted tile not in hand"))?;
        {
            let p = self.player(robber);
            if !check_win_with_tile(&p.hand, &p.melds, &tile) {
                return Err(MahjongError::invalid_action("robber cannot win on this tile"));
            }
        }
        let taken = self.player_mut(kong_seat).remove_tile(tile_id).unwrap();
        self.player_mut(robber).take_tile(taken);
        self.finish_hand();
        Ok(taken)
    }

    // ------------------------------------------------------------------
    // Turn order
    // ------------------------------------------------------------------

    pub fn advance_turn(&mut self) {
        let next = (self.current_player + 1) % NP as u8;
        self.set_current(next);
    }

    /// Every tile id currently in circulation: wall, hands, discards, meld
    /// tiles and revealed bonuses. The pending discard lives in its
    /// discarder's pile, so it is not counted twice.
    pub fn tile_census(&self) -> Vec<TileId> {
        let mut ids: Vec<TileId> = self.wall.iter().map(|t| t.id).collect();
        for p in &self.players {
            ids.extend(p.hand.iter().map(|t| t.id));
            ids.extend(p.discards.iter().map(|t| t.id));
            ids.extend(p.revealed_bonuses.iter().map(|t| t.id));
            for m in &p.melds {
                ids.extend(m.tiles.iter().map(|t| t.id));
            }
        }
        ids
    }
}
