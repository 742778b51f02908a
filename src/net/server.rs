//! TCP front end for the game session.
//!
//! Clients speak line-delimited JSON over a persistent connection. Each
//! connection gets a reader loop and a dedicated writer task; everything
//! else happens on a single game task that owns the session, the roster
//! and all simulation state. Connection tasks never touch game state
//! directly, they only exchange events with the game task over a
//! channel, so no locks are involved anywhere.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::game::{Game, Target};
use crate::net::protocol::{ClientPacket, ServerPacket};
use crate::types::{PlayerId, PlayerInfo, DEFAULT_TIMEOUT_MS};

/// Network-facing configuration, separate from simulation tuning.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Connections with no inbound traffic for this long are closed.
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3010,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(key: &str, default: T) -> T {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        }

        let defaults = Self::default();
        Self {
            host: std::env::var("GRIDLOCK_HOST").unwrap_or(defaults.host),
            port: var("GRIDLOCK_PORT", defaults.port),
            timeout_ms: var("GRIDLOCK_TIMEOUT_MS", defaults.timeout_ms),
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Events flowing from connection tasks to the game task.
enum GameEvent {
    Connected {
        conn: u64,
        tx: mpsc::UnboundedSender<String>,
    },
    Inbound {
        conn: u64,
        packet: ClientPacket,
    },
    Closed {
        conn: u64,
        reason: String,
    },
}

/// One accepted connection as the game task sees it. `player` stays
/// `None` until a join request is accepted.
struct Session {
    conn: u64,
    player: Option<PlayerInfo>,
    tx: mpsc::UnboundedSender<String>,
}

/// Bind and serve forever.
///
/// `ready_tx` fires once with the bound address, which lets tests bind
/// port 0 and learn the real port.
pub async fn run_server(
    config: ServerConfig,
    game_config: GameConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> Result<()> {
    let listener = TcpListener::bind(config.socket_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.socket_addr()))?;
    let addr = listener.local_addr().context("listener has no local address")?;
    info!(%addr, mode = game_config.mode.as_str(), "server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(addr);
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(game_task(game_config, event_rx));

    let mut next_conn: u64 = 0;
    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        next_conn += 1;
        let conn = next_conn;
        debug!(%peer, conn, "connection accepted");
        let events = event_tx.clone();
        let timeout_ms = config.timeout_ms;
        tokio::spawn(handle_client(stream, conn, timeout_ms, events));
    }
}

/// Per-connection reader loop plus a spawned writer task.
async fn handle_client(
    stream: TcpStream,
    conn: u64,
    timeout_ms: u64,
    events: mpsc::UnboundedSender<GameEvent>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err()
                || write_half.write_all(b"\n").await.is_err()
                || write_half.flush().await.is_err()
            {
                break;
            }
        }
    });

    if events.send(GameEvent::Connected { conn, tx }).is_err() {
        return;
    }

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    let reason = loop {
        line.clear();
        let read = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            reader.read_line(&mut line),
        )
        .await;
        match read {
            Err(_) => break "inactivity timeout".to_string(),
            Ok(Err(err)) => break err.to_string(),
            Ok(Ok(0)) => break "connection closed".to_string(),
            Ok(Ok(_)) => {}
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match ClientPacket::decode(trimmed) {
            // A disconnect announcement ends the read loop; the game
            // task learns about it through the closed event.
            Ok(ClientPacket::Disconnect { reason }) => break reason,
            Ok(packet) => {
                if events.send(GameEvent::Inbound { conn, packet }).is_err() {
                    return;
                }
            }
            Err(err) => warn!(conn, %err, "dropping malformed packet"),
        }
    };
    debug!(conn, %reason, "connection closing");
    let _ = events.send(GameEvent::Closed { conn, reason });
}

/// The single task owning all game state.
async fn game_task(config: GameConfig, mut events: mpsc::UnboundedReceiver<GameEvent>) {
    let mut game = Game::new(config.clone());
    let mut sessions: Vec<Session> = Vec::new();
    let mut next_player: u64 = 0;

    let mut ticker = tokio::time::interval(Duration::from_millis(config.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let roster = roster_of(&sessions);
                game.update(&roster);
                flush(&mut game, &sessions);
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    GameEvent::Connected { conn, tx } => {
                        sessions.push(Session { conn, player: None, tx });
                    }
                    GameEvent::Inbound { conn, packet } => {
                        handle_packet(&mut game, &mut sessions, &mut next_player, conn, packet);
                    }
                    GameEvent::Closed { conn, reason } => {
                        handle_closed(&mut game, &mut sessions, conn, &reason);
                    }
                }
            }
        }
    }
}

fn handle_packet(
    game: &mut Game,
    sessions: &mut Vec<Session>,
    next_player: &mut u64,
    conn: u64,
    packet: ClientPacket,
) {
    match packet {
        ClientPacket::KeepAlive => {
            send_line(sessions, conn, &ServerPacket::KeepAlive);
        }
        ClientPacket::JoinRequest { name } => {
            handle_join(game, sessions, next_player, conn, name);
        }
        ClientPacket::Input { key } => {
            let player = sessions
                .iter()
                .find(|s| s.conn == conn)
                .and_then(|s| s.player.as_ref())
                .map(|p| p.id);
            if let Some(id) = player {
                let roster = roster_of(sessions);
                game.input(&roster, id, key);
            }
        }
        // Intercepted by the read loop before it gets here.
        ClientPacket::Disconnect { .. } => {}
    }
}

fn handle_join(
    game: &mut Game,
    sessions: &mut [Session],
    next_player: &mut u64,
    conn: u64,
    name: String,
) {
    let name = name.trim().to_string();
    let Some(index) = sessions.iter().position(|s| s.conn == conn) else {
        return;
    };

    let rejection = if sessions[index].player.is_some() {
        Some("already joined")
    } else if name.is_empty() {
        Some("name must not be empty")
    } else if sessions
        .iter()
        .any(|s| s.player.as_ref().is_some_and(|p| p.name == name))
    {
        Some("name already in use")
    } else {
        None
    };
    if let Some(reason) = rejection {
        warn!(conn, %name, reason, "join rejected");
        send_line(sessions, conn, &ServerPacket::JoinFailure {
            reason: reason.to_string(),
        });
        return;
    }

    *next_player += 1;
    let player = PlayerInfo {
        id: PlayerId(*next_player),
        name,
    };
    sessions[index].player = Some(player.clone());
    info!(conn, id = %player.id, name = %player.name, "player joined");

    send_line(sessions, conn, &ServerPacket::JoinResponse { uuid: player.id });
    send_packet(
        sessions,
        Target::Except(player.id),
        &ServerPacket::PlayerJoin {
            name: player.name.clone(),
            uuid: player.id,
        },
    );
    let roster = roster_of(sessions);
    game.player_joined(&roster, &player);
    flush(game, sessions);
}

fn handle_closed(game: &mut Game, sessions: &mut Vec<Session>, conn: u64, reason: &str) {
    let Some(index) = sessions.iter().position(|s| s.conn == conn) else {
        return;
    };
    let session = sessions.remove(index);
    let Some(player) = session.player else {
        return;
    };
    info!(conn, id = %player.id, name = %player.name, reason, "player left");
    send_packet(
        sessions,
        Target::All,
        &ServerPacket::PlayerLeave {
            name: player.name.clone(),
            reason: reason.to_string(),
        },
    );
    let roster = roster_of(sessions);
    game.player_left(&roster, player.id);
    flush(game, sessions);
}

/// Joined participants in connection order.
fn roster_of(sessions: &[Session]) -> Vec<PlayerInfo> {
    sessions.iter().filter_map(|s| s.player.clone()).collect()
}

/// Send one packet to a single connection, joined or not.
fn send_line(sessions: &[Session], conn: u64, packet: &ServerPacket) {
    if let Some(session) = sessions.iter().find(|s| s.conn == conn) {
        let _ = session.tx.send(packet.encode());
    }
}

/// Route one addressed packet to the joined sessions it targets. Send
/// errors mean the writer task is gone; the reader loop will surface
/// the close, so they are ignored here.
fn send_packet(sessions: &[Session], target: Target, packet: &ServerPacket) {
    let line = packet.encode();
    for session in sessions {
        let Some(player) = &session.player else {
            continue;
        };
        let deliver = match target {
            Target::All => true,
            Target::One(id) => player.id == id,
            Target::Except(id) => player.id != id,
        };
        if deliver {
            let _ = session.tx.send(line.clone());
        }
    }
}

fn flush(game: &mut Game, sessions: &[Session]) {
    for (target, packet) in game.drain_outbox() {
        send_packet(sessions, target, &packet);
    }
}
