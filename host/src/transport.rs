//! WebSocket front door.
//!
//! Every accepted connection gets a [`Session`] and a writer task. The writer
//! drains the session's outbound queue as JSON text frames; the reader parses
//! inbound text frames into [`ClientMessage`]s and hands them to the session.

use futures_util::{SinkExt, StreamExt};
use pong_core::ClientMessage;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::gateway::Session;
use crate::matchmaker::Matchmaker;
use crate::OUTBOUND_CAPACITY;

/// Accept WebSocket clients on `listener` until it fails.
pub async fn serve(listener: TcpListener, matchmaker: Matchmaker) -> std::io::Result<()> {
    tracing::info!("Game socket listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        let matchmaker = matchmaker.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, matchmaker).await {
                tracing::debug!("Connection from {} ended with error: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    matchmaker: Matchmaker,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let socket = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut source) = socket.split();

    let (outbound, mut queue) = mpsc::channel(OUTBOUND_CAPACITY);
    let mut session = Session::new(matchmaker, outbound);
    let id = session.id();
    tracing::info!("Client connected: {}", id);

    let writer = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Could not encode frame for {}: {}", id, e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut result = Ok(());
    while let Some(frame) = source.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                result = Err(e);
                break;
            }
        };

        match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(message) => {
                if let Err(e) = session.handle(message).await {
                    tracing::debug!("{}: intent rejected: {}", id, e);
                }
            }
            Err(e) => tracing::warn!("{}: malformed frame ignored: {}", id, e),
        }
    }

    session.disconnect().await;
    writer.abort();
    tracing::info!("Client disconnected: {}", id);
    result
}
