//! Room-actor scenarios driven end to end through the event channel, with
//! in-memory outboxes standing in for sockets. Deterministic hands come from
//! preset walls; pacing timers are shrunk so the scenarios run fast.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use merlion_engine::bot::BOT_NAMES;
use merlion_engine::state::ConnectionStatus;
use merlion_engine::tile::{standard_set, Suit, Tile, TileDef, WindDir};
use merlion_engine::types::{ActionType, GamePhase, MeldKind};
use merlion_server::protocol::{ClientMessage, ConnectParams, ServerMessage, TurnPhase};
use merlion_server::room::{Room, RoomConfig, RoomEvent};
use merlion_server::view::ClientGameState;

use merlion_engine::seeding::SessionRng;

type EventTx = mpsc::UnboundedSender<RoomEvent>;
type MsgRx = mpsc::UnboundedReceiver<ServerMessage>;

fn test_config() -> RoomConfig {
    RoomConfig {
        bot_delay: Duration::from_millis(10),
        claim_timeout: Duration::from_millis(400),
        disconnect_grace: Duration::from_millis(300),
        min_tai: 1,
        preset_walls: Vec::new(),
    }
}

fn spawn_room(cfg: RoomConfig, seed: u64) -> EventTx {
    let (room, tx) = Room::new("test-room".to_string(), cfg, SessionRng::from_u64(seed));
    tokio::spawn(room.run());
    tx
}

fn connect(tx: &EventTx, conn: u64, name: &str, token: Option<String>) -> MsgRx {
    let (outbox, rx) = mpsc::unbounded_channel();
    tx.send(RoomEvent::Connect {
        conn,
        params: ConnectParams {
            name: name.to_string(),
            avatar: String::new(),
            reconnect_token: token,
        },
        outbox,
    })
    .expect("room gone");
    rx
}

fn send(tx: &EventTx, conn: u64, msg: ClientMessage) {
    tx.send(RoomEvent::Message { conn, msg }).expect("room gone");
}

fn act(tx: &EventTx, conn: u64, action: ActionType, tile_id: Option<u8>, chi_index: Option<usize>) {
    send(
        tx,
        conn,
        ClientMessage::Action {
            action,
            tile_id,
            chi_index,
        },
    );
}

async fn recv(rx: &mut MsgRx) -> ServerMessage {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for server message")
        .expect("outbox closed")
}

async fn recv_until<F>(rx: &mut MsgRx, mut pred: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    loop {
        let msg = recv(rx).await;
        if pred(&msg) {
            return msg;
        }
    }
}

/// Allocates physical tiles by definition, tracking copies so a scripted
/// wall never duplicates an id.
struct TilePicker {
    set: Vec<Tile>,
    used: Vec<bool>,
}

impl TilePicker {
    fn new() -> Self {
        let set = standard_set();
        let used = vec![false; set.len()];
        TilePicker { set, used }
    }

    fn take(&mut self, def: TileDef) -> Tile {
        let tile = self
            .set
            .iter()
            .find(|t| t.def == def && !self.used[t.id as usize])
            .copied()
            .unwrap_or_else(|| panic!("no free copy of {def:?}"));
        self.used[tile.id as usize] = true;
        tile
    }

    fn suit(&mut self, s: Suit, value: u8) -> Tile {
        self.take(TileDef::Suit { suit: s, value })
    }

    fn wind(&mut self, direction: WindDir) -> Tile {
        self.take(TileDef::Wind { direction })
    }

    /// Everything not yet taken, canonical order (bonus tiles land last, so
    /// they stay deep in the wall unless a script places them).
    fn rest(&self) -> Vec<Tile> {
        self.set
            .iter()
            .filter(|t| !self.used[t.id as usize])
            .copied()
            .collect()
    }
}

/// Deal layout: dealer's 13, then seats 1..3, then the dealer's 14th, then
/// head draws in order.
fn build_wall(
    seat_hands: [Vec<Tile>; 4],
    fourteenth: Tile,
    draws: Vec<Tile>,
    picker: &TilePicker,
) -> Vec<Tile> {
    let mut wall = Vec::new();
    for hand in seat_hands {
        assert_eq!(hand.len(), 13);
        wall.extend(hand);
    }
    wall.push(fourteenth);
    wall.extend(draws);
    wall.extend(picker.rest());
    assert_eq!(wall.len(), 144);
    wall
}

/// Wall where the dealer's initial 14 is already a winning hand:
/// 123 bamboo twice, 444 dot, 555 character, 99 dot.
fn heavenly_wall() -> Vec<Tile> {
    let mut picker = TilePicker::new();
    let mut dealer = Vec::new();
    for v in [1, 1, 2, 2, 3, 3] {
        dealer.push(picker.suit(Suit::Bamboo, v));
    }
    for _ in 0..3 {
        dealer.push(picker.suit(Suit::Dot, 4));
    }
    for _ in 0..3 {
        dealer.push(picker.suit(Suit::Character, 5));
    }
    dealer.push(picker.suit(Suit::Dot, 9));
    let fourteenth = picker.suit(Suit::Dot, 9);

    let fill = |picker: &mut TilePicker, kinds: &[(Suit, u8)]| -> Vec<Tile> {
        kinds.iter().map(|&(s, v)| picker.suit(s, v)).collect()
    };
    // The other three seats just need full hands with no bonus tiles.
    let seat1 = fill(
        &mut picker,
        &[
            (Suit::Character, 1),
            (Suit::Character, 1),
            (Suit::Character, 2),
            (Suit::Character, 2),
            (Suit::Character, 3),
            (Suit::Character, 3),
            (Suit::Character, 6),
            (Suit::Character, 6),
            (Suit::Character, 7),
            (Suit::Character, 7),
            (Suit::Character, 8),
            (Suit::Character, 8),
            (Suit::Character, 9),
        ],
    );
    let seat2 = fill(
        &mut picker,
        &[
            (Suit::Dot, 1),
            (Suit::Dot, 1),
            (Suit::Dot, 2),
            (Suit::Dot, 2),
            (Suit::Dot, 3),
            (Suit::Dot, 3),
            (Suit::Dot, 5),
            (Suit::Dot, 5),
            (Suit::Dot, 6),
            (Suit::Dot, 6),
            (Suit::Dot, 7),
            (Suit::Dot, 7),
            (Suit::Dot, 8),
        ],
    );
    let seat3 = fill(
        &mut picker,
        &[
            (Suit::Bamboo, 4),
            (Suit::Bamboo, 4),
            (Suit::Bamboo, 5),
            (Suit::Bamboo, 5),
            (Suit::Bamboo, 6),
            (Suit::Bamboo, 6),
            (Suit::Bamboo, 7),
            (Suit::Bamboo, 7),
            (Suit::Bamboo, 8),
            (Suit::Bamboo, 8),
            (Suit::Bamboo, 9),
            (Suit::Bamboo, 9),
            (Suit::Bamboo, 1),
        ],
    );

    build_wall([dealer, seat1, seat2, seat3], fourteenth, Vec::new(), &picker)
}

/// Script for the promoted-kong storyline:
/// - the human (seat 0, dealer) holds two 5-bamboo and harmless singles;
/// - seat 1 holds six pairs plus a lone 5-bamboo it will discard first
///   (the human pongs it);
/// - seat 3 starts one tile short of a 5-bamboo wait (an east wind stands
///   in for the 6-bamboo) so it cannot win on seat 1's discard; its own
///   draw swaps in the 6-bamboo and completes the wait;
/// - head draws then feed the human the fourth 5-bamboo for the promotion.
struct KongScript {
    wall: Vec<Tile>,
    west: Tile,
    north: Tile,
}

fn kong_script() -> KongScript {
    let mut picker = TilePicker::new();

    let west = picker.wind(WindDir::West);
    let north = picker.wind(WindDir::North);
    let mut human = vec![
        picker.suit(Suit::Bamboo, 5),
        picker.suit(Suit::Bamboo, 5),
        west,
    ];
    for v in [2, 4, 6, 8] {
        human.push(picker.suit(Suit::Character, v));
    }
    for v in [2, 4, 6, 8] {
        human.push(picker.suit(Suit::Dot, v));
    }
    human.push(picker.suit(Suit::Bamboo, 9));
    human.push(picker.suit(Suit::Bamboo, 1));
    assert_eq!(human.len(), 13);

    let mut seat1 = Vec::new();
    for v in [1, 3, 5, 7, 9] {
        seat1.push(picker.suit(Suit::Character, v));
        seat1.push(picker.suit(Suit::Character, v));
    }
    seat1.push(picker.suit(Suit::Dot, 3));
    seat1.push(picker.suit(Suit::Dot, 3));
    seat1.push(picker.suit(Suit::Bamboo, 5));

    let mut seat2 = Vec::new();
    for v in [2, 4, 6, 8] {
        seat2.push(picker.suit(Suit::Dot, v));
        seat2.push(picker.suit(Suit::Dot, v));
    }
    for v in [2, 8] {
        seat2.push(picker.suit(Suit::Bamboo, v));
        seat2.push(picker.suit(Suit::Bamboo, v));
    }
    seat2.push(picker.take(TileDef::Dragon {
        color: merlion_engine::tile::DragonColor::White,
    }));

    let mut seat3 = Vec::new();
    for v in 1..=3 {
        seat3.push(picker.suit(Suit::Character, v));
    }
    for v in 7..=9 {
        seat3.push(picker.suit(Suit::Character, v));
    }
    for _ in 0..3 {
        seat3.push(picker.suit(Suit::Dot, 1));
    }
    seat3.push(picker.suit(Suit::Dot, 9));
    seat3.push(picker.suit(Suit::Dot, 9));
    seat3.push(picker.suit(Suit::Bamboo, 4));
    seat3.push(picker.wind(WindDir::East));

    let draws = vec![
        picker.suit(Suit::Character, 1), // seat 1 turn 1: pairs up, 5b goes
        picker.wind(WindDir::South),     // seat 1 turn 2
        picker.wind(WindDir::East),      // seat 2: an isolated honor to shed
        picker.suit(Suit::Bamboo, 6),    // seat 3: completes the 5b wait
        picker.suit(Suit::Bamboo, 5),    // human: the promotion tile
    ];

    let wall = build_wall([human, seat1, seat2, seat3], north, draws, &picker);
    KongScript { wall, west, north }
}

fn state_of(msg: &ServerMessage) -> Option<&ClientGameState> {
    match msg {
        ServerMessage::GameStart { state } | ServerMessage::GameState { state } => Some(state),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lobby_fills_with_bots_on_start() {
    let tx = spawn_room(test_config(), 1);
    let mut alice = connect(&tx, 1, "Alice", None);
    let mut bob = connect(&tx, 2, "Bob", None);

    let msg = recv_until(&mut alice, |m| matches!(m, ServerMessage::RoomState { .. })).await;
    let ServerMessage::RoomState { room } = msg else { unreachable!() };
    assert_eq!(room.you, 0);
    assert!(room.reconnect_token.is_some());

    send(&tx, 2, ClientMessage::Ready { is_ready: true });
    let msg = recv_until(&mut bob, |m| {
        matches!(m, ServerMessage::RoomState { room } if room.seats[1].as_ref().is_some_and(|s| s.is_ready))
    })
    .await;
    let ServerMessage::RoomState { room } = msg else { unreachable!() };
    assert_eq!(room.host_index, Some(0));

    // Only the host can start; Bob's attempt must not begin the game.
    send(&tx, 2, ClientMessage::StartGame);
    send(&tx, 1, ClientMessage::StartGame);

    let msg = recv_until(&mut alice, |m| matches!(m, ServerMessage::GameStart { .. })).await;
    let state = state_of(&msg).unwrap();
    assert_eq!(state.players[0].name, "Alice");
    assert_eq!(state.players[1].name, "Bob");
    assert_eq!(state.players[2].name, BOT_NAMES[2]);
    assert_eq!(state.players[3].name, BOT_NAMES[3]);
    assert_eq!(state.players[2].connection, ConnectionStatus::Bot);
    // Dealer is seat 0 (east) with 14 tiles visible to themselves.
    assert_eq!(state.players[0].hand.as_ref().unwrap().len(), 14);
    assert_eq!(state.players[1].hand_count, 13);

    let _ = recv_until(&mut bob, |m| matches!(m, ServerMessage::GameStart { .. })).await;
}

#[tokio::test]
async fn joining_a_running_game_is_rejected() {
    let mut cfg = test_config();
    cfg.preset_walls = vec![heavenly_wall()];
    let tx = spawn_room(cfg, 2);
    let mut alice = connect(&tx, 1, "Alice", None);
    send(&tx, 1, ClientMessage::StartGame);
    recv_until(&mut alice, |m| matches!(m, ServerMessage::GameStart { .. })).await;

    let mut late = connect(&tx, 2, "Late", None);
    match recv(&mut late).await {
        ServerMessage::Error { message } => assert!(message.contains("in progress")),
        other => panic!("expected rejection, got {other:?}"),
    }
    // The room dropped the outbox: the connection is over.
    assert!(timeout(Duration::from_secs(5), late.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn dealer_self_draw_win_and_dealer_retention() {
    let mut cfg = test_config();
    cfg.preset_walls = vec![heavenly_wall(), heavenly_wall()];
    let tx = spawn_room(cfg, 3);
    let mut alice = connect(&tx, 1, "Alice", None);
    send(&tx, 1, ClientMessage::StartGame);

    let msg = recv_until(&mut alice, |m| matches!(m, ServerMessage::YourTurn { .. })).await;
    let ServerMessage::YourTurn {
        phase,
        available_actions,
    } = msg
    else {
        unreachable!()
    };
    assert_eq!(phase, TurnPhase::HumanNeedsDiscard);
    assert!(available_actions.contains(&ActionType::Win));

    act(&tx, 1, ActionType::Win, None, None);
    let msg = recv_until(&mut alice, |m| matches!(m, ServerMessage::RoundOver { .. })).await;
    let ServerMessage::RoundOver {
        winner_index,
        tai_result,
        payment_result,
        ..
    } = msg
    else {
        unreachable!()
    };
    assert_eq!(winner_index, Some(0));
    let tai = tai_result.unwrap();
    // No bonus tiles + self-draw + concealed hand.
    assert_eq!(tai.tai, 3);
    assert_eq!(tai.base_points, 8);
    let names: Vec<&str> = tai.entries.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"Self-draw"));
    assert!(names.contains(&"Concealed hand"));

    let payments = payment_result.unwrap();
    let sum: i32 = payments.payments.iter().map(|p| p.amount).sum();
    assert_eq!(sum, 0);
    assert_eq!(payments.winner_total, 24);

    // Winner was the dealer: next hand keeps seats and round number.
    send(&tx, 1, ClientMessage::NextRound);
    let msg = recv_until(&mut alice, |m| {
        state_of(m).is_some_and(|s| s.phase == GamePhase::Playing)
    })
    .await;
    let state = state_of(&msg).unwrap();
    assert_eq!(state.round_number, 1);
    assert_eq!(state.players[0].seat_wind, WindDir::East);
    assert_eq!(state.players[0].hand.as_ref().unwrap().len(), 14);
}

#[tokio::test]
async fn pong_claim_interrupts_turn_order() {
    let script = kong_script();
    let mut cfg = test_config();
    cfg.preset_walls = vec![script.wall.clone()];
    let tx = spawn_room(cfg, 4);
    let mut alice = connect(&tx, 1, "Alice", None);
    send(&tx, 1, ClientMessage::StartGame);

    recv_until(&mut alice, |m| {
        matches!(m, ServerMessage::YourTurn { phase, .. } if *phase == TurnPhase::HumanNeedsDiscard)
    })
    .await;
    act(&tx, 1, ActionType::Discard, Some(script.west.id), None);

    // Seat 1 draws and sheds its lone 5-bamboo; the human holds two.
    let msg = recv_until(&mut alice, |m| matches!(m, ServerMessage::ClaimWindow { .. })).await;
    let ServerMessage::ClaimWindow {
        available_actions, ..
    } = msg
    else {
        unreachable!()
    };
    assert!(available_actions.contains(&ActionType::Pong));
    assert!(!available_actions.contains(&ActionType::Chi));

    // A chi here is not on offer; the request is ignored, then the pong lands.
    act(&tx, 1, ActionType::Chi, None, None);
    act(&tx, 1, ActionType::Pong, None, None);

    // The meld broadcast lands before the discard prompt.
    let msg = recv_until(&mut alice, |m| {
        state_of(m).is_some_and(|s| !s.players[0].melds.is_empty())
    })
    .await;
    let state = state_of(&msg).unwrap();
    assert_eq!(state.current_player, 0);
    assert_eq!(state.players[0].melds[0].kind, MeldKind::Pong);

    let msg = recv_until(&mut alice, |m| matches!(m, ServerMessage::YourTurn { .. })).await;
    let ServerMessage::YourTurn { phase, .. } = msg else {
        unreachable!()
    };
    assert_eq!(phase, TurnPhase::HumanNeedsDiscard);
}

#[tokio::test]
async fn promoted_kong_is_robbed_by_waiting_player() {
    let script = kong_script();
    let mut cfg = test_config();
    cfg.preset_walls = vec![script.wall.clone()];
    let tx = spawn_room(cfg, 5);
    let mut alice = connect(&tx, 1, "Alice", None);
    send(&tx, 1, ClientMessage::StartGame);

    recv_until(&mut alice, |m| {
        matches!(m, ServerMessage::YourTurn { phase, .. } if *phase == TurnPhase::HumanNeedsDiscard)
    })
    .await;
    act(&tx, 1, ActionType::Discard, Some(script.west.id), None);

    recv_until(&mut alice, |m| matches!(m, ServerMessage::ClaimWindow { .. })).await;
    act(&tx, 1, ActionType::Pong, None, None);

    recv_until(&mut alice, |m| {
        matches!(m, ServerMessage::YourTurn { phase, .. } if *phase == TurnPhase::HumanNeedsDiscard)
    })
    .await;
    act(&tx, 1, ActionType::Discard, Some(script.north.id), None);

    // Three bot turns later it is the human's turn again.
    let msg = recv_until(&mut alice, |m| {
        matches!(m, ServerMessage::YourTurn { phase, .. } if *phase == TurnPhase::HumanNeedsDraw)
    })
    .await;
    drop(msg);
    act(&tx, 1, ActionType::Draw, None, None);

    let msg = recv_until(&mut alice, |m| matches!(m, ServerMessage::YourTurn { .. })).await;
    let ServerMessage::YourTurn {
        available_actions, ..
    } = msg
    else {
        unreachable!()
    };
    assert!(
        available_actions.contains(&ActionType::Kong),
        "drawn fourth 5-bamboo should enable the promotion"
    );

    // Seat 3 is waiting on exactly this tile: the kong is robbed. The final
    // state broadcast precedes round-over.
    act(&tx, 1, ActionType::Kong, None, None);
    let msg = recv_until(&mut alice, |m| {
        state_of(m).is_some_and(|s| s.phase == GamePhase::Finished)
    })
    .await;
    let state = state_of(&msg).unwrap();
    assert_eq!(state.players[0].melds[0].kind, MeldKind::Pong);
    assert_eq!(state.players[0].melds[0].tiles.len(), 3);
    assert_eq!(state.players[3].hand_count, 14);

    let msg = recv_until(&mut alice, |m| matches!(m, ServerMessage::RoundOver { .. })).await;
    let ServerMessage::RoundOver {
        winner_index,
        payment_result,
        ..
    } = msg
    else {
        unreachable!()
    };
    assert_eq!(winner_index, Some(3));
    let payments = payment_result.unwrap();
    // The kong player is the shooter and pays double.
    let base = payments
        .payments
        .iter()
        .find(|p| p.player_index == 1)
        .unwrap()
        .amount
        .abs();
    let shooter = payments
        .payments
        .iter()
        .find(|p| p.player_index == 0)
        .unwrap();
    assert_eq!(shooter.amount, -2 * base);
    let sum: i32 = payments.payments.iter().map(|p| p.amount).sum();
    assert_eq!(sum, 0);
}

#[tokio::test]
async fn unanswered_claim_window_times_out_as_pass() {
    let script = kong_script();
    let mut cfg = test_config();
    cfg.preset_walls = vec![script.wall.clone()];
    let tx = spawn_room(cfg, 6);
    let mut alice = connect(&tx, 1, "Alice", None);
    send(&tx, 1, ClientMessage::StartGame);

    recv_until(&mut alice, |m| {
        matches!(m, ServerMessage::YourTurn { phase, .. } if *phase == TurnPhase::HumanNeedsDiscard)
    })
    .await;
    act(&tx, 1, ActionType::Discard, Some(script.west.id), None);

    recv_until(&mut alice, |m| matches!(m, ServerMessage::ClaimWindow { .. })).await;
    // Say nothing: after the timeout the window resolves as all-pass and the
    // turn moves on to seat 2.
    let msg = recv_until(&mut alice, |m| {
        state_of(m).is_some_and(|s| s.current_player == 2)
    })
    .await;
    let state = state_of(&msg).unwrap();
    assert!(state.players[0].melds.is_empty(), "pong must not have happened");
    assert_eq!(state.players[0].hand_count, 13);
    // The unclaimed 5-bamboo stays in seat 1's discard pile.
    assert!(state.players[1]
        .discards
        .iter()
        .any(|t| t.def == TileDef::Suit { suit: Suit::Bamboo, value: 5 }));
}

#[tokio::test]
async fn disconnect_mid_window_passes_and_reconnect_restores_view() {
    let script = kong_script();
    let mut cfg = test_config();
    cfg.disconnect_grace = Duration::from_secs(30);
    cfg.preset_walls = vec![script.wall.clone()];
    let tx = spawn_room(cfg, 7);
    let mut alice = connect(&tx, 1, "Alice", None);

    let msg = recv_until(&mut alice, |m| matches!(m, ServerMessage::RoomState { .. })).await;
    let ServerMessage::RoomState { room } = msg else { unreachable!() };
    let token = room.reconnect_token.unwrap();

    send(&tx, 1, ClientMessage::StartGame);
    recv_until(&mut alice, |m| {
        matches!(m, ServerMessage::YourTurn { phase, .. } if *phase == TurnPhase::HumanNeedsDiscard)
    })
    .await;
    act(&tx, 1, ActionType::Discard, Some(script.west.id), None);
    recv_until(&mut alice, |m| matches!(m, ServerMessage::ClaimWindow { .. })).await;

    // Drop the connection with the window open: the seat auto-passes and the
    // game keeps moving with a stand-in bot.
    tx.send(RoomEvent::Disconnect { conn: 1 }).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rejoined = connect(&tx, 99, "Alice", Some(token));
    let msg = recv_until(&mut rejoined, |m| state_of(m).is_some()).await;
    let state = state_of(&msg).unwrap();
    assert_eq!(state.you, 0);
    assert!(state.players[0].hand.is_some(), "own hand restored on reconnect");
}

#[tokio::test]
async fn room_closes_after_grace_expires_with_no_humans() {
    let mut cfg = test_config();
    cfg.preset_walls = vec![heavenly_wall()];
    cfg.disconnect_grace = Duration::from_millis(100);
    let tx = spawn_room(cfg, 8);
    let mut alice = connect(&tx, 1, "Alice", None);
    send(&tx, 1, ClientMessage::StartGame);
    recv_until(&mut alice, |m| matches!(m, ServerMessage::GameStart { .. })).await;

    tx.send(RoomEvent::Disconnect { conn: 1 }).unwrap();

    // Grace expires, the seat goes bot-owned, and with no humans left the
    // room shuts down.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !tx.is_closed() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "room did not close after losing every human"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn full_hand_plays_to_completion_with_human_autoplay() {
    let result = timeout(Duration::from_secs(60), async {
        let tx = spawn_room(test_config(), 42);
        let mut alice = connect(&tx, 1, "Alice", None);
        send(&tx, 1, ClientMessage::StartGame);

        let mut hand: Vec<Tile> = Vec::new();
        loop {
            match recv(&mut alice).await {
                ServerMessage::GameStart { state } | ServerMessage::GameState { state } => {
                    if let Some(own) = &state.players[0].hand {
                        hand = own.clone();
                    }
                }
                ServerMessage::YourTurn {
                    phase: TurnPhase::HumanNeedsDraw,
                    ..
                } => act(&tx, 1, ActionType::Draw, None, None),
                ServerMessage::YourTurn {
                    phase: TurnPhase::HumanNeedsDiscard,
                    available_actions,
                } => {
                    if available_actions.contains(&ActionType::Win) {
                        act(&tx, 1, ActionType::Win, None, None);
                    } else {
                        let tile = hand.first().expect("hand view missing");
                        act(&tx, 1, ActionType::Discard, Some(tile.id), None);
                    }
                }
                ServerMessage::ClaimWindow { .. } => {
                    act(&tx, 1, ActionType::Pass, None, None);
                }
                ServerMessage::RoundOver {
                    winner_index,
                    payment_result,
                    ..
                } => {
                    if winner_index.is_some() {
                        let payments = payment_result.expect("winner implies payments");
                        let sum: i32 = payments.payments.iter().map(|p| p.amount).sum();
                        assert_eq!(sum, 0);
                    } else {
                        assert!(payment_result.is_none());
                    }
                    break;
                }
                _ => {}
            }
        }
    })
    .await;
    result.expect("hand did not complete in time");
}
