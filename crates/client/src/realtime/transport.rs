// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Channel transport.
//!
//! The manager speaks text frames through the [`Transport`] trait; the
//! production implementation is a WebSocket. Tests substitute a mock.

use std::future::Future;
use std::pin::Pin;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the channel failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No channel is open.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Future returned by every [`Transport`] operation.
pub type ChannelFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// Bidirectional text-frame channel.
pub trait Transport: Send + Sync {
    /// Open a channel to `url`.
    fn connect(&mut self, url: &str) -> ChannelFuture<'_, ()>;

    /// Close the channel if open.
    fn disconnect(&mut self) -> ChannelFuture<'_, ()>;

    /// Send one text frame.
    fn send(&mut self, text: String) -> ChannelFuture<'_, ()>;

    /// Receive the next text frame.
    ///
    /// Returns `None` when the peer closed the channel.
    fn recv(&mut self) -> ChannelFuture<'_, Option<String>>;

    fn is_connected(&self) -> bool;
}

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// [`Transport`] over a tokio-tungstenite client socket.
#[derive(Default)]
pub struct WebSocketTransport {
    socket: Option<Socket>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> ChannelFuture<'_, ()> {
        let url = url.to_owned();
        Box::pin(async move {
            let (socket, response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            tracing::trace!(status = %response.status(), "websocket handshake complete");
            self.socket = Some(socket);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut socket) = self.socket.take() {
                // Peer may already be gone.
                let _ = socket.close(None).await;
            }
            Ok(())
        })
    }

    fn send(&mut self, text: String) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            let socket = self.socket.as_mut().ok_or(TransportError::ConnectionClosed)?;
            // `send` flushes after feeding the frame.
            let sent = socket.send(Message::Text(text.into())).await;
            sent.map_err(|e| {
                self.socket = None;
                TransportError::SendFailed(e.to_string())
            })
        })
    }

    fn recv(&mut self) -> ChannelFuture<'_, Option<String>> {
        Box::pin(async move {
            let socket = self.socket.as_mut().ok_or(TransportError::ConnectionClosed)?;
            let outcome = loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => return Ok(Some(text)),
                        Err(_) => tracing::debug!("dropping non-utf8 binary frame"),
                    },
                    // Ping/pong control frames are answered by tungstenite itself.
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break Ok(None),
                    Some(Err(e)) => break Err(TransportError::ReceiveFailed(e.to_string())),
                }
            };
            self.socket = None;
            outcome
        })
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}
