//! Per-room actor: one tokio task owns all room state and serializes every
//! mutation. Sockets and timers never touch state directly; they post
//! [`RoomEvent`]s onto the room's channel. Timer events carry generation
//! tokens, and the handler drops any event whose generation is stale, so a
//! cancelled timer is simply one that no longer matches.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use merlion_engine::bot::{BotClaim, BotPolicy, BOT_NAMES};
use merlion_engine::hand::{check_win, SelfKong};
use merlion_engine::score::{calculate_payments, calculate_tai, TaiResult};
use merlion_engine::seeding::SessionRng;
use merlion_engine::state::{ClaimOptions, ConnectionStatus, GameState, Player, NP};
use merlion_engine::tile::{Tile, TileId, WindDir};
use merlion_engine::types::{ActionType, GamePhase};
use merlion_engine::wall::Wall;

use crate::protocol::{ClientMessage, ConnectParams, ServerMessage, TurnPhase};
use crate::view::{project_game, ClientRoom, ClientSeat};

pub type ConnId = u64;
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

pub const NOT_ENOUGH_TAI: &str = "Not enough tai to win!";

#[derive(Debug)]
pub enum RoomEvent {
    Connect {
        conn: ConnId,
        params: ConnectParams,
        outbox: Outbox,
    },
    Message {
        conn: ConnId,
        msg: ClientMessage,
    },
    Disconnect {
        conn: ConnId,
    },
    BotTick {
        generation: u64,
    },
    ClaimTimeout {
        window: u64,
    },
    GraceExpired {
        seat: u8,
        generation: u64,
    },
}

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub bot_delay: Duration,
    pub claim_timeout: Duration,
    pub disconnect_grace: Duration,
    pub min_tai: u32,
    /// Fixed tile orders consumed one per deal before falling back to the
    /// seeded shuffle. Lets replays and scripted scenarios pin the exact
    /// deal; live rooms leave this empty.
    pub preset_walls: Vec<Vec<Tile>>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        RoomConfig {
            bot_delay: Duration::from_millis(800),
            claim_timeout: Duration::from_secs(15),
            disconnect_grace: Duration::from_secs(60),
            min_tai: 1,
            preset_walls: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct RoomHandle {
    pub events: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomHandle {
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

#[derive(Debug, Clone)]
struct LobbySeat {
    name: String,
    avatar: String,
    ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnStage {
    AwaitDraw,
    AwaitDiscard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowResponse {
    Win,
    Kong,
    Pong,
    Chi(usize),
    Pass,
}

/// An open claim window. For a robbed-kong window `rob_tile` is the promoted
/// tile and only wins are on offer; the discarder field holds the kong
/// player.
#[derive(Debug)]
struct ClaimWindow {
    id: u64,
    discarder: u8,
    discard: Tile,
    options: [Option<ClaimOptions>; NP],
    responses: [Option<WindowResponse>; NP],
    rob_tile: Option<TileId>,
}

impl ClaimWindow {
    fn pending(&self) -> bool {
        (0..NP).any(|i| self.options[i].is_some() && self.responses[i].is_none())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RoundSummary {
    dealer_won: bool,
}

pub struct Room {
    name: String,
    cfg: RoomConfig,
    events: mpsc::UnboundedReceiver<RoomEvent>,
    self_tx: mpsc::UnboundedSender<RoomEvent>,

    session: SessionRng,
    bots: BotPolicy,
    token_rng: ChaCha8Rng,

    started: bool,
    lobby: [Option<LobbySeat>; NP],
    host: Option<u8>,
    game: GameState,
    stage: TurnStage,
    window: Option<ClaimWindow>,
    summary: RoundSummary,
    preset_walls: VecDeque<Vec<Tile>>,

    outboxes: [Option<Outbox>; NP],
    seat_by_conn: HashMap<ConnId, u8>,
    tokens: HashMap<String, u8>,
    token_by_seat: [Option<String>; NP],

    bot_generation: u64,
    window_counter: u64,
    grace_generations: [u64; NP],
}

impl Room {
    pub fn new(
        name: String,
        cfg: RoomConfig,
        session: SessionRng,
    ) -> (Self, mpsc::UnboundedSender<RoomEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bots = BotPolicy::new(session.bot_seed());
        let token_rng = session.token_rng();
        let preset_walls: VecDeque<Vec<Tile>> = cfg.preset_walls.clone().into();
        let placeholder: [Player; NP] =
            std::array::from_fn(|i| Player::new(format!("seat{i}"), "", WindDir::East));
        let room = Room {
            name,
            cfg,
            events: rx,
            self_tx: tx.clone(),
            session,
            bots,
            token_rng,
            started: false,
            lobby: Default::default(),
            host: None,
            game: GameState::new(placeholder),
            stage: TurnStage::AwaitDraw,
            window: None,
            summary: RoundSummary::default(),
            preset_walls,
            outboxes: Default::default(),
            seat_by_conn: HashMap::new(),
            tokens: HashMap::new(),
            token_by_seat: Default::default(),
            bot_generation: 0,
            window_counter: 0,
            grace_generations: [0; NP],
        };
        (room, tx)
    }

    pub async fn run(mut self) {
        info!(room = %self.name, "room opened");
        while let Some(event) = self.events.recv().await {
            self.handle_event(event);
            if self.should_close() {
                break;
            }
        }
        info!(room = %self.name, "room closed");
    }

    /// A room lives while a human might still act in it: a bound connection,
    /// or a disconnected seat whose grace has not expired.
    fn should_close(&self) -> bool {
        if !self.started {
            return self.lobby.iter().all(|s| s.is_none()) && self.seat_by_conn.is_empty();
        }
        self.game
            .players
            .iter()
            .all(|p| p.connection == ConnectionStatus::Bot)
    }

    fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Connect {
                conn,
                params,
                outbox,
            } => self.on_connect(conn, params, outbox),
            RoomEvent::Message { conn, msg } => self.on_message(conn, msg),
            RoomEvent::Disconnect { conn } => self.on_disconnect(conn),
            RoomEvent::BotTick { generation } => {
                if generation == self.bot_generation {
                    self.run_bot_turn();
                }
            }
            RoomEvent::ClaimTimeout { window } => self.on_claim_timeout(window),
            RoomEvent::GraceExpired { seat, generation } => {
                self.on_grace_expired(seat, generation)
            }
        }
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    fn on_connect(&mut self, conn: ConnId, params: ConnectParams, outbox: Outbox) {
        if self.started {
            let seat = params
                .reconnect_token
                .as_deref()
                .and_then(|t| self.tokens.get(t).copied());
            match seat {
                Some(seat) if self.outboxes[seat as usize].is_none() => {
                    self.on_reconnect(conn, seat, outbox);
                }
                _ => {
                    let _ = outbox.send(ServerMessage::Error {
                        message: "Game already in progress".to_string(),
                    });
                }
            }
            return;
        }

        let Some(seat) = self.lobby.iter().position(|s| s.is_none()) else {
            let _ = outbox.send(ServerMessage::Error {
                message: "Room is full".to_string(),
            });
            return;
        };

        let seat = seat as u8;
        self.lobby[seat as usize] = Some(LobbySeat {
            name: params.display_name(),
            avatar: params.avatar.clone(),
            ready: false,
        });
        if self.host.is_none() {
            self.host = Some(seat);
        }
        self.outboxes[seat as usize] = Some(outbox);
        self.seat_by_conn.insert(conn, seat);
        let token = self.allocate_token(seat);
        self.token_by_seat[seat as usize] = Some(token);
        info!(room = %self.name, seat, "player joined lobby");
        self.broadcast_room_state();
    }

    fn on_reconnect(&mut self, conn: ConnId, seat: u8, outbox: Outbox) {
        info!(room = %self.name, seat, "player reconnected");
        self.grace_generations[seat as usize] += 1;
        self.outboxes[seat as usize] = Some(outbox);
        self.seat_by_conn.insert(conn, seat);
        self.game.player_mut(seat).connection = ConnectionStatus::Human;

        for other in self.human_seats() {
            if other != seat {
                self.send_to(other, ServerMessage::PlayerReconnected { player_index: seat });
            }
        }
        self.send_to(
            seat,
            ServerMessage::RoomState {
                room: self.client_room_for(seat),
            },
        );
        self.send_to(
            seat,
            ServerMessage::GameState {
                state: project_game(&self.game, seat),
            },
        );

        // Re-issue whatever prompt the seat was owed.
        if let Some(window) = &self.window {
            if let (Some(options), None) = (
                &window.options[seat as usize],
                window.responses[seat as usize],
            ) {
                let msg = ServerMessage::ClaimWindow {
                    timeout: self.cfg.claim_timeout.as_millis() as u64,
                    available_actions: options.available_actions(),
                };
                self.send_to(seat, msg);
            }
        } else if self.game.phase == GamePhase::Playing && self.game.current_player == seat {
            self.prompt_current_human();
        }
    }

    fn on_disconnect(&mut self, conn: ConnId) {
        let Some(seat) = self.seat_by_conn.remove(&conn) else {
            return;
        };
        self.outboxes[seat as usize] = None;

        if !self.started {
            self.lobby[seat as usize] = None;
            if let Some(token) = self.token_by_seat[seat as usize].take() {
                self.tokens.remove(&token);
            }
            if self.host == Some(seat) {
                self.host = (0..NP as u8).find(|&s| self.lobby[s as usize].is_some());
            }
            self.broadcast_room_state();
            return;
        }

        info!(room = %self.name, seat, "player disconnected");
        self.game.player_mut(seat).connection = ConnectionStatus::HumanDisconnected;
        for other in self.human_seats() {
            self.send_to(other, ServerMessage::PlayerDisconnected { player_index: seat });
        }

        // A pending claim becomes an immediate pass so the window can close.
        let mut resolve = false;
        if let Some(window) = self.window.as_mut() {
            if window.options[seat as usize].is_some()
                && window.responses[seat as usize].is_none()
            {
                window.responses[seat as usize] = Some(WindowResponse::Pass);
                resolve = !window.pending();
            }
        }
        if resolve {
            self.resolve_window();
        } else if self.window.is_none()
            && self.game.phase == GamePhase::Playing
            && self.game.current_player == seat
        {
            // Keep the table moving: act for them right away.
            self.schedule_bot(Duration::ZERO);
        }

        self.start_grace_timer(seat);
    }

    fn on_grace_expired(&mut self, seat: u8, generation: u64) {
        if generation != self.grace_generations[seat as usize] {
            return;
        }
        if self.game.player(seat).connection != ConnectionStatus::HumanDisconnected {
            return;
        }
        info!(room = %self.name, seat, "grace expired, seat is bot-owned");
        self.game.player_mut(seat).connection = ConnectionStatus::Bot;
        if let Some(token) = self.token_by_seat[seat as usize].take() {
            self.tokens.remove(&token);
        }
    }

    // ------------------------------------------------------------------
    // Client messages
    // ------------------------------------------------------------------

    fn on_message(&mut self, conn: ConnId, msg: ClientMessage) {
        let Some(&seat) = self.seat_by_conn.get(&conn) else {
            return;
        };
        match msg {
            ClientMessage::Ready { is_ready } => {
                if let Some(entry) = self.lobby[seat as usize].as_mut() {
                    entry.ready = is_ready;
                    self.broadcast_room_state();
                }
            }
            ClientMessage::StartGame => {
                if self.started {
                    return;
                }
                if self.host != Some(seat) {
                    warn!(room = %self.name, seat, "non-host tried to start");
                    return;
                }
                self.start_game();
            }
            ClientMessage::Action {
                action,
                tile_id,
                chi_index,
            } => self.on_action(seat, action, tile_id, chi_index),
            ClientMessage::NextRound => {
                if self.started && self.game.phase == GamePhase::Finished {
                    self.start_next_hand();
                }
            }
            ClientMessage::Leave => {
                self.on_disconnect(conn);
            }
        }
    }

    fn on_action(
        &mut self,
        seat: u8,
        action: ActionType,
        tile_id: Option<TileId>,
        chi_index: Option<usize>,
    ) {
        if !self.started || self.game.phase != GamePhase::Playing {
            return;
        }
        if self.window.is_some() {
            self.on_window_action(seat, action, chi_index);
            return;
        }
        if self.game.current_player != seat {
            debug!(room = %self.name, seat, ?action, "out-of-turn action ignored");
            return;
        }

        match (self.stage, action) {
            (TurnStage::AwaitDraw, ActionType::Draw) => {
                self.perform_draw(seat);
            }
            (TurnStage::AwaitDiscard, ActionType::Discard) => {
                let Some(tile_id) = tile_id else { return };
                if self.game.discard(seat, tile_id).is_ok() {
                    self.after_discard();
                }
            }
            (TurnStage::AwaitDiscard, ActionType::Win) => {
                let p = self.game.player(seat);
                if !check_win(&p.hand, &p.melds) {
                    return;
                }
                let tai = calculate_tai(p, self.game.round_wind, true);
                if tai.raw_total() < self.cfg.min_tai {
                    self.send_to(
                        seat,
                        ServerMessage::Error {
                            message: NOT_ENOUGH_TAI.to_string(),
                        },
                    );
                    return;
                }
                if self.game.declare_self_win(seat).is_ok() {
                    self.end_round(Some(seat), None, true);
                }
            }
            (TurnStage::AwaitDiscard, ActionType::Kong) => {
                self.attempt_self_kong(seat);
            }
            _ => {
                debug!(room = %self.name, seat, ?action, "illegal action ignored");
            }
        }
    }

    // ------------------------------------------------------------------
    // Turn flow
    // ------------------------------------------------------------------

    fn start_game(&mut self) {
        let players: [Player; NP] = std::array::from_fn(|i| {
            match &self.lobby[i] {
                Some(seat) => {
                    let mut p = Player::new(seat.name.clone(), seat.avatar.clone(), WindDir::East);
                    p.connection = if self.outboxes[i].is_some() {
                        ConnectionStatus::Human
                    } else {
                        ConnectionStatus::Bot
                    };
                    p
                }
                None => Player::bot(BOT_NAMES[i]),
            }
        });
        self.game = GameState::new(players);
        self.started = true;
        info!(room = %self.name, "game started");

        let wall = self.next_wall();
        match self.game.deal(wall) {
            Ok(outcome) if outcome.exhausted => {
                self.broadcast_game_state();
                self.end_round(None, None, false);
                return;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(room = %self.name, %err, "deal failed");
                return;
            }
        }

        for seat in self.human_seats() {
            let msg = ServerMessage::GameStart {
                state: project_game(&self.game, seat),
            };
            self.send_to(seat, msg);
        }
        // The dealer starts on 14 tiles and owes a discard.
        self.stage = TurnStage::AwaitDiscard;
        self.begin_turn();
    }

    fn next_wall(&mut self) -> Wall {
        match self.preset_walls.pop_front() {
            Some(tiles) => Wall::from_tiles(tiles),
            None => Wall::shuffled(&mut self.session.next_wall_rng()),
        }
    }

    fn start_next_hand(&mut self) {
        let wall = self.next_wall();
        let dealer_won = self.summary.dealer_won;
        match self.game.rotate_and_deal(wall, dealer_won) {
            Ok(outcome) if outcome.exhausted => {
                self.broadcast_game_state();
                self.end_round(None, None, false);
                return;
            }
            Ok(_) => {}
            Err(err) => {
                debug!(room = %self.name, %err, "next-round ignored");
                return;
            }
        }
        info!(room = %self.name, round = self.game.round_number, "next hand dealt");
        self.broadcast_game_state();
        self.stage = TurnStage::AwaitDiscard;
        self.begin_turn();
    }

    /// Hand control to the current player: prompt a human, schedule a bot.
    fn begin_turn(&mut self) {
        let seat = self.game.current_player;
        if self.game.player(seat).connection.is_bot_driven() {
            self.schedule_bot(self.cfg.bot_delay);
        } else {
            self.prompt_current_human();
        }
    }

    fn prompt_current_human(&mut self) {
        let seat = self.game.current_player;
        let msg = match self.stage {
            TurnStage::AwaitDraw => ServerMessage::YourTurn {
                phase: TurnPhase::HumanNeedsDraw,
                available_actions: vec![ActionType::Draw],
            },
            TurnStage::AwaitDiscard => {
                let p = self.game.player(seat);
                let mut actions = vec![ActionType::Discard];
                if check_win(&p.hand, &p.melds) {
                    actions.push(ActionType::Win);
                }
                if self.game.self_kong_option(seat).is_some() {
                    actions.push(ActionType::Kong);
                }
                ServerMessage::YourTurn {
                    phase: TurnPhase::HumanNeedsDiscard,
                    available_actions: actions,
                }
            }
        };
        self.send_to(seat, msg);
    }

    fn perform_draw(&mut self, seat: u8) {
        let outcome = match self.game.draw(seat) {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(room = %self.name, seat, %err, "draw rejected");
                return;
            }
        };
        if outcome.drawn.is_none() {
            self.game.finish_drawn_hand();
            self.end_round(None, None, false);
            return;
        }
        self.stage = TurnStage::AwaitDiscard;
        self.broadcast_game_state();
        if self.game.player(seat).connection.is_bot_driven() {
            self.bot_post_draw(seat);
        } else {
            self.prompt_current_human();
        }
    }

    fn after_discard(&mut self) {
        self.broadcast_game_state();
        self.open_claim_window();
    }

    /// Self-kong request from the current player (human path; bots go
    /// through [`bot_post_draw`]). A promotion may be robbed: the promoted
    /// tile is offered to every waiting player before the kong commits.
    fn attempt_self_kong(&mut self, seat: u8) {
        let Some(option) = self.game.self_kong_option(seat) else {
            return;
        };
        if let SelfKong::Promote { tile } = option {
            if !self.game.find_robbers(seat, tile).is_empty() {
                self.open_rob_window(seat, tile);
                return;
            }
        }
        self.complete_self_kong(seat);
    }

    /// Apply the kong and its replacement draw, then put the player back in
    /// the post-draw decision.
    fn complete_self_kong(&mut self, seat: u8) {
        let outcome = match self.game.apply_self_kong(seat) {
            Ok((_, outcome)) => outcome,
            Err(err) => {
                debug!(room = %self.name, seat, %err, "self-kong rejected");
                return;
            }
        };
        if outcome.drawn.is_none() {
            self.game.finish_drawn_hand();
            self.end_round(None, None, false);
            return;
        }
        self.stage = TurnStage::AwaitDiscard;
        self.broadcast_game_state();
        if self.game.player(seat).connection.is_bot_driven() {
            self.bot_post_draw(seat);
        } else {
            self.prompt_current_human();
        }
    }

    // ------------------------------------------------------------------
    // Bot driving
    // ------------------------------------------------------------------

    fn schedule_bot(&mut self, delay: Duration) {
        self.bot_generation += 1;
        let generation = self.bot_generation;
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = tx.send(RoomEvent::BotTick { generation });
        });
    }

    /// One scheduled bot action for the current seat. Draw if owed, then
    /// run the post-draw decision chain.
    fn run_bot_turn(&mut self) {
        if self.window.is_some() || self.game.phase != GamePhase::Playing {
            return;
        }
        let seat = self.game.current_player;
        if !self.game.player(seat).connection.is_bot_driven() {
            return;
        }
        if self.stage == TurnStage::AwaitDraw {
            self.perform_draw(seat);
        } else {
            self.bot_post_draw(seat);
        }
    }

    /// Post-draw decisions for a bot seat: win, else self-kong (with
    /// robbery check), else discard.
    fn bot_post_draw(&mut self, seat: u8) {
        {
            let p = self.game.player(seat);
            if check_win(&p.hand, &p.melds) {
                let tai = calculate_tai(p, self.game.round_wind, true);
                if tai.raw_total() >= self.cfg.min_tai && self.game.declare_self_win(seat).is_ok()
                {
                    self.end_round(Some(seat), None, true);
                    return;
                }
            }
        }

        if let Some(option) = self.game.self_kong_option(seat) {
            if self.bots.wants_self_kong() {
                if let SelfKong::Promote { tile } = option {
                    if !self.game.find_robbers(seat, tile).is_empty() {
                        self.open_rob_window(seat, tile);
                        return;
                    }
                }
                self.complete_self_kong(seat);
                return;
            }
        }

        let tile_id = self.bots.choose_discard(self.game.player(seat));
        if self.game.discard(seat, tile_id).is_ok() {
            self.after_discard();
        }
    }

    // ------------------------------------------------------------------
    // Claim window
    // ------------------------------------------------------------------

    fn open_claim_window(&mut self) {
        let Some((discarder, discard)) = self.game.last_discard else {
            return;
        };
        self.window_counter += 1;
        let mut window = ClaimWindow {
            id: self.window_counter,
            discarder,
            discard,
            options: Default::default(),
            responses: Default::default(),
            rob_tile: None,
        };

        for offset in 1..NP as u8 {
            let seat = (discarder + offset) % NP as u8;
            let mut options = self.game.claim_options_for(seat);
            if options.win {
                // The tai gate applies per candidate; hopeless wins are not
                // offered at all to bots, humans learn via the error reply.
                let gated = self
                    .tai_gate_for_claim(seat, discard)
                    .is_some();
                if !gated && self.game.player(seat).connection.is_bot_driven() {
                    options.win = false;
                }
            }
            if !options.any() {
                window.responses[seat as usize] = Some(WindowResponse::Pass);
                continue;
            }
            if self.game.player(seat).connection.is_bot_driven() {
                let claim =
                    self.bots
                        .decide_claim(self.game.player(seat), discard.def, &options);
                window.responses[seat as usize] = Some(match claim {
                    BotClaim::Win => WindowResponse::Win,
                    BotClaim::Kong => WindowResponse::Kong,
                    BotClaim::Pong => WindowResponse::Pong,
                    BotClaim::Chi(i) => WindowResponse::Chi(i),
                    BotClaim::Pass => WindowResponse::Pass,
                });
                window.options[seat as usize] = Some(options);
            } else {
                let msg = ServerMessage::ClaimWindow {
                    timeout: self.cfg.claim_timeout.as_millis() as u64,
                    available_actions: options.available_actions(),
                };
                window.options[seat as usize] = Some(options);
                self.send_to(seat, msg);
            }
        }

        let pending = window.pending();
        self.window = Some(window);
        if pending {
            self.start_claim_timer();
        } else {
            self.resolve_window();
        }
    }

    /// Window offering only `win` on a promoted kong tile. If every robber
    /// passes, the kong completes.
    fn open_rob_window(&mut self, kong_seat: u8, tile: Tile) {
        self.window_counter += 1;
        let mut window = ClaimWindow {
            id: self.window_counter,
            discarder: kong_seat,
            discard: tile,
            options: Default::default(),
            responses: Default::default(),
            rob_tile: Some(tile.id),
        };

        for robber in self.game.find_robbers(kong_seat, tile) {
            let options = ClaimOptions {
                win: true,
                ..Default::default()
            };
            if self.game.player(robber).connection.is_bot_driven() {
                let response = if self.tai_gate_for_claim(robber, tile).is_some() {
                    WindowResponse::Win
                } else {
                    WindowResponse::Pass
                };
                window.responses[robber as usize] = Some(response);
            } else {
                let msg = ServerMessage::ClaimWindow {
                    timeout: self.cfg.claim_timeout.as_millis() as u64,
                    available_actions: options.available_actions(),
                };
                self.send_to(robber, msg);
            }
            window.options[robber as usize] = Some(options);
        }

        let pending = window.pending();
        self.window = Some(window);
        if pending {
            self.start_claim_timer();
        } else {
            self.resolve_window();
        }
    }

    fn start_claim_timer(&self) {
        let Some(window) = &self.window else { return };
        let id = window.id;
        let tx = self.self_tx.clone();
        let timeout = self.cfg.claim_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(RoomEvent::ClaimTimeout { window: id });
        });
    }

    fn on_claim_timeout(&mut self, window_id: u64) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        if window.id != window_id {
            return;
        }
        debug!(room = %self.name, "claim window timed out");
        for i in 0..NP {
            if window.options[i].is_some() && window.responses[i].is_none() {
                window.responses[i] = Some(WindowResponse::Pass);
            }
        }
        self.resolve_window();
    }

    /// A claim-window action from a human with pending options.
    fn on_window_action(&mut self, seat: u8, action: ActionType, chi_index: Option<usize>) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        let Some(options) = window.options[seat as usize].clone() else {
            return;
        };
        if window.responses[seat as usize].is_some() {
            return;
        }

        let response = match action {
            ActionType::Win if options.win => WindowResponse::Win,
            ActionType::Kong if options.kong => WindowResponse::Kong,
            ActionType::Pong if options.pong => WindowResponse::Pong,
            ActionType::Chi if !options.chi.is_empty() => match chi_index {
                None if options.chi.len() > 1 => {
                    // Ambiguous: show the choices and wait for a reissue.
                    let choices = options
                        .chi
                        .iter()
                        .map(|pair| pair.to_vec())
                        .collect();
                    self.send_to(seat, ServerMessage::ChiOptions { options: choices });
                    return;
                }
                None => WindowResponse::Chi(0),
                Some(i) if i < options.chi.len() => WindowResponse::Chi(i),
                Some(_) => return,
            },
            ActionType::Pass => WindowResponse::Pass,
            _ => {
                debug!(room = %self.name, seat, ?action, "claim not available");
                return;
            }
        };

        let window = self.window.as_mut().unwrap();
        window.responses[seat as usize] = Some(response);
        if !window.pending() {
            self.resolve_window();
        }
    }

    /// Resolve a full window by priority: win beats kong beats pong beats
    /// chi; ties go to the seat closest to the discarder in turn order.
    fn resolve_window(&mut self) {
        let Some(window) = self.window.take() else {
            return;
        };
        // Any stale timeout for this window is now a no-op (id mismatch).
        self.window_counter += 1;

        let discarder = window.discarder;
        let seats_by_distance: Vec<u8> =
            (1..NP as u8).map(|o| (discarder + o) % NP as u8).collect();

        // 1. Wins, closest first, each candidate re-validated.
        for &seat in &seats_by_distance {
            if window.responses[seat as usize] != Some(WindowResponse::Win) {
                continue;
            }
            match self.tai_gate_for_claim(seat, window.discard) {
                Some(_) => {
                    let applied = if let Some(tile_id) = window.rob_tile {
                        self.game.rob_kong(seat, discarder, tile_id).is_ok()
                    } else {
                        self.game.claim_win(seat).is_ok()
                    };
                    if applied {
                        self.end_round(Some(seat), Some(discarder), false);
                        return;
                    }
                }
                None => {
                    self.send_to(
                        seat,
                        ServerMessage::Error {
                            message: NOT_ENOUGH_TAI.to_string(),
                        },
                    );
                }
            }
        }

        // A robbed-kong window with no (valid) winner: the kong completes.
        if window.rob_tile.is_some() {
            self.complete_self_kong(discarder);
            return;
        }

        // 2. Kong (at most one is physically possible).
        for &seat in &seats_by_distance {
            if window.responses[seat as usize] == Some(WindowResponse::Kong) {
                match self.game.claim_kong(seat) {
                    Ok(outcome) if outcome.drawn.is_none() => {
                        self.game.finish_drawn_hand();
                        self.end_round(None, None, false);
                    }
                    Ok(_) => {
                        // The claimer drew a replacement and may now win,
                        // kong again, or discard.
                        self.stage = TurnStage::AwaitDiscard;
                        self.broadcast_game_state();
                        self.begin_turn();
                    }
                    Err(err) => {
                        debug!(room = %self.name, seat, %err, "kong claim failed");
                        continue;
                    }
                }
                return;
            }
        }

        // 3. Pong.
        for &seat in &seats_by_distance {
            if window.responses[seat as usize] == Some(WindowResponse::Pong) {
                if self.game.claim_pong(seat).is_err() {
                    continue;
                }
                self.stage = TurnStage::AwaitDiscard;
                self.broadcast_game_state();
                self.begin_turn();
                return;
            }
        }

        // 4. Chi (only the next seat ever has it).
        for &seat in &seats_by_distance {
            if let Some(WindowResponse::Chi(choice)) = window.responses[seat as usize] {
                if self.game.claim_chi(seat, choice).is_err() {
                    continue;
                }
                self.stage = TurnStage::AwaitDiscard;
                self.broadcast_game_state();
                self.begin_turn();
                return;
            }
        }

        // All passes.
        self.game.advance_turn();
        self.stage = TurnStage::AwaitDraw;
        self.broadcast_game_state();
        self.begin_turn();
    }

    /// Would `seat` clear the minimum-tai bar winning on `tile`? Evaluated
    /// on a scratch copy; the real applicator runs only after the gate.
    fn tai_gate_for_claim(&self, seat: u8, tile: Tile) -> Option<TaiResult> {
        let p = self.game.player(seat);
        if !merlion_engine::hand::check_win_with_tile(&p.hand, &p.melds, &tile) {
            return None;
        }
        let mut scratch = p.clone();
        scratch.take_tile(tile);
        let tai = calculate_tai(&scratch, self.game.round_wind, false);
        (tai.raw_total() >= self.cfg.min_tai).then_some(tai)
    }

    // ------------------------------------------------------------------
    // Round end
    // ------------------------------------------------------------------

    fn end_round(&mut self, winner: Option<u8>, shooter: Option<u8>, self_draw: bool) {
        // Cancel pending bot work and any window remnants.
        self.bot_generation += 1;
        self.window = None;
        self.window_counter += 1;

        let dealer = self.game.dealer_index();
        self.summary = RoundSummary {
            dealer_won: winner == Some(dealer),
        };

        let (tai_result, payment_result, message) = match winner {
            Some(seat) => {
                let tai = calculate_tai(self.game.player(seat), self.game.round_wind, self_draw);
                let payments =
                    calculate_payments(seat, shooter, self_draw, tai.base_points);
                for entry in &payments.payments {
                    self.game.player_mut(entry.player_index).score += entry.amount;
                }
                let message = format!(
                    "{} wins with {} tai",
                    self.game.player(seat).name,
                    tai.tai
                );
                (Some(tai), Some(payments), message)
            }
            None => (None, None, "Wall exhausted, nobody wins".to_string()),
        };

        info!(room = %self.name, ?winner, %message, "round over");
        self.broadcast_game_state();
        let msg = ServerMessage::RoundOver {
            winner_index: winner,
            tai_result,
            payment_result,
            message,
        };
        for seat in self.human_seats() {
            self.send_to(seat, msg.clone());
        }
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn start_grace_timer(&mut self, seat: u8) {
        self.grace_generations[seat as usize] += 1;
        let generation = self.grace_generations[seat as usize];
        let tx = self.self_tx.clone();
        let grace = self.cfg.disconnect_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = tx.send(RoomEvent::GraceExpired { seat, generation });
        });
    }

    fn allocate_token(&mut self, seat: u8) -> String {
        let token = format!("{:032x}", self.token_rng.random::<u128>());
        self.tokens.insert(token.clone(), seat);
        token
    }

    fn human_seats(&self) -> Vec<u8> {
        (0..NP as u8)
            .filter(|&s| self.outboxes[s as usize].is_some())
            .collect()
    }

    fn send_to(&self, seat: u8, msg: ServerMessage) {
        if let Some(tx) = &self.outboxes[seat as usize] {
            let _ = tx.send(msg);
        }
    }

    fn broadcast_game_state(&self) {
        for seat in self.human_seats() {
            self.send_to(
                seat,
                ServerMessage::GameState {
                    state: project_game(&self.game, seat),
                },
            );
        }
    }

    fn broadcast_room_state(&self) {
        for seat in self.human_seats() {
            self.send_to(
                seat,
                ServerMessage::RoomState {
                    room: self.client_room_for(seat),
                },
            );
        }
    }

    fn client_room_for(&self, you: u8) -> ClientRoom {
        let seats = if self.started {
            self.game
                .players
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    Some(ClientSeat {
                        name: p.name.clone(),
                        avatar: p.avatar.clone(),
                        is_ready: true,
                        is_bot: p.connection == ConnectionStatus::Bot,
                        connected: self.outboxes[i].is_some(),
                    })
                })
                .collect()
        } else {
            self.lobby
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    entry.as_ref().map(|seat| ClientSeat {
                        name: seat.name.clone(),
                        avatar: seat.avatar.clone(),
                        is_ready: seat.ready,
                        is_bot: false,
                        connected: self.outboxes[i].is_some(),
                    })
                })
                .collect()
        };
        ClientRoom {
            seats,
            host_index: self.host,
            you,
            reconnect_token: self.token_by_seat[you as usize].clone(),
            started: self.started,
        }
    }
}
