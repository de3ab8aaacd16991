//! WebSocket plumbing: upgrades, the room registry, and the pump that
//! shuttles frames between a socket and its room's event channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use merlion_engine::seeding::SessionRng;

use crate::protocol::{decode_client, encode_server, ConnectParams};
use crate::room::{ConnId, Room, RoomConfig, RoomEvent, RoomHandle};

/// Thin per-process map from room name to its live actor. Room identity and
/// cross-node routing belong to the outer layer; this only gets a local
/// connection to the right task, creating it on first use and replacing it
/// once a room has shut down.
pub struct Registry {
    rooms: Mutex<HashMap<String, RoomHandle>>,
    cfg: RoomConfig,
    seed: Option<u64>,
    next_conn: AtomicU64,
}

impl Registry {
    pub fn new(cfg: RoomConfig, seed: Option<u64>) -> Arc<Self> {
        Arc::new(Registry {
            rooms: Mutex::new(HashMap::new()),
            cfg,
            seed,
            next_conn: AtomicU64::new(1),
        })
    }

    pub fn next_conn_id(&self) -> ConnId {
        self.next_conn.fetch_add(1, Ordering::Relaxed)
    }

    pub fn handle_for(&self, name: &str) -> RoomHandle {
        let mut rooms = self.rooms.lock().expect("registry lock poisoned");
        if let Some(handle) = rooms.get(name) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }
        let session = match self.seed {
            Some(seed) => SessionRng::from_u64(seed),
            None => SessionRng::from_entropy(),
        };
        let (room, tx) = Room::new(name.to_string(), self.cfg.clone(), session);
        tokio::spawn(room.run());
        let handle = RoomHandle { events: tx };
        rooms.insert(name.to_string(), handle.clone());
        handle
    }
}

pub async fn ws_handler(
    Path(room): Path<String>,
    Query(params): Query<ConnectParams>,
    State(registry): State<Arc<Registry>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        let handle = registry.handle_for(&room);
        let conn = registry.next_conn_id();
        client_connection(socket, handle, params, conn)
    })
}

/// Pump frames both ways until either side goes away. The room owns the
/// outbox sender; when it drops the sender (rejection or room shutdown) the
/// socket closes.
async fn client_connection(
    socket: WebSocket,
    handle: RoomHandle,
    params: ConnectParams,
    conn: ConnId,
) {
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel();
    if handle
        .events
        .send(RoomEvent::Connect {
            conn,
            params,
            outbox: outbox_tx,
        })
        .is_err()
    {
        return;
    }

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            outbound = outbox_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        let text = encode_server(&msg);
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        // Garbage frames are dropped without a reply.
                        if let Some(msg) = decode_client(&text) {
                            if handle.events.send(RoomEvent::Message { conn, msg }).is_err() {
                                break;
                            }
                        } else {
                            debug!(conn, "undecodable frame dropped");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let _ = handle.events.send(RoomEvent::Disconnect { conn });
}
