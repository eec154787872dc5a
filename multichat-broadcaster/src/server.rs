//! WebSocket transport for viewer connections

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use crate::broadcaster::Hub;
use crate::error::Result;
use crate::registry::Connection;

pub(crate) async fn accept_loop(listener: TcpListener, hub: Arc<Hub>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let hub = Arc::clone(&hub);
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, peer, hub).await {
                        tracing::debug!("Viewer {} handshake failed: {}", peer, e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to accept viewer: {}", e);
            }
        }
    }
}

/// Drive one viewer: write queued frames, watch for close, evict on failure.
async fn serve_connection(stream: TcpStream, peer: SocketAddr, hub: Arc<Hub>) -> Result<()> {
    let (connection, mut outbound) = Connection::new(peer.to_string(), hub.queue_capacity);

    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut incoming) = ws.split();

    if !hub.attach(Arc::clone(&connection)).await {
        let _ = sink.close().await;
        return Ok(());
    }
    tracing::info!(
        "Viewer connected: {}. Total: {}",
        connection,
        hub.registry.len().await
    );

    let reason = loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
                        break format!("send failed: {}", e);
                    }
                }
                None => break "outbound queue dropped".to_string(),
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | None => break "closed by viewer".to_string(),
                Some(Ok(_)) => {
                    // Server-to-client only; pings are answered by the codec
                }
                Some(Err(e)) => break format!("transport error: {}", e),
            },
            _ = connection.closed() => break "evicted".to_string(),
        }
    };

    if hub.evict(&connection).await {
        tracing::info!(
            "Viewer {} disconnected ({}). Remaining: {}",
            connection,
            reason,
            hub.registry.len().await
        );
    } else {
        tracing::info!("Viewer {} removed ({})", connection, reason);
    }

    let _ = sink.close().await;
    Ok(())
}
