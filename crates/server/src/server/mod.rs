//! Game server implementation.

use crate::config::Config;
use futures_util::{SinkExt, StreamExt};
use protocol::ClientCommand;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};

pub mod client;
pub mod game;

pub use client::{ConnectionId, Mailboxes, Transport};
pub use game::{run_game_loop, GameState, Inbound};

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);
    serve(listener, config).await
}

/// Accept connections on `listener` and feed them to a fresh game loop.
pub async fn serve(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    let max_connections = config.server.max_connections;
    let outbound_queue = config.server.outbound_queue.max(1);
    let (inbound_tx, inbound_rx) = mpsc::channel(config.server.inbound_queue.max(1));

    let state = GameState::new(config, Mailboxes::new());
    tokio::spawn(run_game_loop(state, inbound_rx));

    let connections = Arc::new(AtomicUsize::new(0));
    let mut next_id: ConnectionId = 1;

    loop {
        let (stream, addr) = listener.accept().await?;

        if connections.load(Ordering::Relaxed) >= max_connections {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        }
        connections.fetch_add(1, Ordering::Relaxed);

        let id = next_id;
        next_id = next_id.wrapping_add(1).max(1);

        let inbound = inbound_tx.clone();
        let connections = Arc::clone(&connections);
        tokio::spawn(async move {
            let result = handle_connection(stream, addr, id, inbound, outbound_queue).await;
            connections.fetch_sub(1, Ordering::Relaxed);
            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: ConnectionId,
    inbound: mpsc::Sender<Inbound>,
    outbound_queue: usize,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {} (client {})", addr, id);

    let (mut write, mut read) = ws_stream.split();
    let (mailbox, mut frames) = mpsc::channel::<Utf8Bytes>(outbound_queue);
    inbound
        .send(Inbound::Connected { id, mailbox })
        .await
        .map_err(|_| anyhow::anyhow!("game loop is not running"))?;

    // Ends once the game drops the mailbox and everything queued is flushed.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if write.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
        let _ = write.send(Message::Close(None)).await;
    });

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match ClientCommand::decode(text.as_str()) {
                        Ok(command) => {
                            if inbound.send(Inbound::Command { id, command }).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Malformed message from {}: {}", addr, e),
                    },
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            _ = &mut writer => {
                debug!("Client {} closed by server", addr);
                break;
            }
        }
    }

    let _ = inbound.send(Inbound::Closed { id }).await;
    writer.abort();
    Ok(())
}
