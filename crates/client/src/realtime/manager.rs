// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background management of the realtime channel.
//!
//! [`RealtimeManager`] is a handle to a driver task. The driver owns the
//! transport and processes one command or channel event at a time, so a
//! heartbeat reply is always written before the next frame is read.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tend_core::OutboundMessage;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

use super::machine::{ChannelEvent, ChannelMachine, Directive, ReconnectPolicy};
use super::state::{ConnectionState, SharedConnectionState};
use super::transport::{Transport, TransportResult};
use super::{ChannelHooks, TokenSource};

/// Default limit on a single open attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Configuration for the realtime manager.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Channel endpoint, without the token.
    pub url: String,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
}

impl RealtimeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        RealtimeConfig {
            url: url.into(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// The channel URL with the auth token as a query parameter.
pub fn channel_url(base: &str, token: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", base, separator, urlencoding::encode(token))
}

enum Command {
    Connect,
    Reconnect,
    Disconnect,
    Send(String),
    Shutdown,
}

/// Handle to a running realtime channel.
///
/// Commands are processed in the order they are issued. State is readable
/// at any time without waiting for the driver.
pub struct RealtimeManager {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<SharedConnectionState>,
    task: JoinHandle<()>,
}

impl RealtimeManager {
    /// Start the driver task. The channel stays closed until [`connect`].
    ///
    /// [`connect`]: Self::connect
    pub fn spawn<T>(config: RealtimeConfig, transport: T, hooks: ChannelHooks) -> Self
    where
        T: Transport + 'static,
    {
        let shared = Arc::new(SharedConnectionState::new());
        let (commands, rx) = mpsc::unbounded_channel();

        let driver = Driver {
            machine: ChannelMachine::new(
                config.reconnect,
                Arc::clone(&shared),
                hooks.subscriber,
                hooks.alerts,
            ),
            config,
            transport,
            token: hooks.token,
            commands: rx,
            pending_reconnect: None,
        };
        let task = tokio::spawn(driver.run());

        RealtimeManager {
            commands,
            shared,
            task,
        }
    }

    /// Open the channel if it is not open or opening.
    ///
    /// Does nothing when no auth token is available.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Reset the attempt counter, drop any open channel and connect again.
    pub fn reconnect(&self) {
        self.command(Command::Reconnect);
    }

    /// Cancel any pending reconnect and close the channel.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Send a JSON message if the channel is connected; dropped otherwise.
    pub fn send_message(&self, payload: &Value) {
        match serde_json::to_string(payload) {
            Ok(text) => self.command(Command::Send(text)),
            Err(e) => tracing::warn!(error = %e, "dropping unserializable message"),
        }
    }

    /// Ask the server to mark a notification as read.
    pub fn mark_read(&self, notification_id: &str) {
        match OutboundMessage::mark_read(notification_id).to_json() {
            Ok(text) => self.command(Command::Send(text)),
            Err(e) => tracing::warn!(error = %e, "dropping mark_read"),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.get()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect_attempts()
    }

    pub fn status_string(&self) -> String {
        self.shared.status_string()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.subscribe()
    }

    /// Disconnect and wait for the driver task to exit.
    pub async fn shutdown(self) {
        self.command(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "realtime driver task failed");
        }
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("realtime driver has stopped; command ignored");
        }
    }
}

enum Step {
    Command(Command),
    Received(TransportResult<Option<String>>),
    ReconnectDue,
}

struct Driver<T> {
    config: RealtimeConfig,
    transport: T,
    machine: ChannelMachine,
    token: Arc<dyn TokenSource>,
    commands: mpsc::UnboundedReceiver<Command>,
    pending_reconnect: Option<Pin<Box<Sleep>>>,
}

impl<T: Transport> Driver<T> {
    async fn run(mut self) {
        loop {
            let open = self.transport.is_connected();
            let step = tokio::select! {
                command = self.commands.recv() => Step::Command(command.unwrap_or(Command::Shutdown)),
                received = self.transport.recv(), if open => Step::Received(received),
                _ = reconnect_due(&mut self.pending_reconnect) => Step::ReconnectDue,
            };

            match step {
                Step::Command(Command::Shutdown) => {
                    self.close().await;
                    break;
                }
                Step::Command(command) => self.on_command(command).await,
                Step::Received(Ok(Some(text))) => self.dispatch(ChannelEvent::Frame(text)).await,
                Step::Received(Ok(None)) => self.lost(None).await,
                Step::Received(Err(e)) => self.lost(Some(e.to_string())).await,
                Step::ReconnectDue => {
                    self.pending_reconnect = None;
                    self.open().await;
                }
            }
        }
        tracing::debug!("realtime driver stopped");
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect => match self.machine.state() {
                ConnectionState::Disconnected => self.open().await,
                state => tracing::debug!(%state, "connect ignored"),
            },
            Command::Reconnect => {
                self.machine.reset_attempts();
                self.open().await;
            }
            Command::Disconnect => self.close().await,
            Command::Send(text) => {
                if self.machine.state() == ConnectionState::Connected {
                    self.write(text).await;
                } else {
                    tracing::warn!("realtime channel not connected; message dropped");
                }
            }
            Command::Shutdown => self.close().await,
        }
    }

    async fn open(&mut self) {
        self.pending_reconnect = None;

        let Some(token) = self.token.token().filter(|t| !t.is_empty()) else {
            tracing::info!("no auth token; realtime channel not opened");
            return;
        };

        if self.transport.is_connected() {
            let _ = self.transport.disconnect().await;
            self.machine.stop();
        }

        self.machine.begin_connect();
        tracing::debug!(url = %self.config.url, "opening realtime channel");

        let url = channel_url(&self.config.url, &token);
        let limit = self.config.connect_timeout;
        match tokio::time::timeout(limit, self.transport.connect(&url)).await {
            Ok(Ok(())) => self.dispatch(ChannelEvent::Opened).await,
            Ok(Err(e)) => self.lost(Some(e.to_string())).await,
            Err(_) => {
                let _ = self.transport.disconnect().await;
                self.lost(Some(format!("connect timed out after {:?}", limit)))
                    .await;
            }
        }
    }

    async fn close(&mut self) {
        self.pending_reconnect = None;
        if self.transport.is_connected() {
            if let Err(e) = self.transport.disconnect().await {
                tracing::debug!(error = %e, "error closing realtime channel");
            }
        }
        self.machine.stop();
    }

    async fn dispatch(&mut self, event: ChannelEvent) {
        match self.machine.handle(event) {
            Directive::Reply(message) => match message.to_json() {
                Ok(text) => self.write(text).await,
                Err(e) => tracing::warn!(error = %e, "failed to encode reply"),
            },
            directive => self.schedule(directive),
        }
    }

    async fn write(&mut self, text: String) {
        if let Err(e) = self.transport.send(text).await {
            self.lost(Some(e.to_string())).await;
        }
    }

    /// The channel failed or closed; an error precedes the close.
    async fn lost(&mut self, error: Option<String>) {
        if self.transport.is_connected() {
            let _ = self.transport.disconnect().await;
        }
        if let Some(reason) = error {
            let directive = self.machine.handle(ChannelEvent::Errored(reason));
            self.schedule(directive);
        }
        let directive = self.machine.handle(ChannelEvent::Closed);
        self.schedule(directive);
    }

    fn schedule(&mut self, directive: Directive) {
        match directive {
            Directive::Reconnect(delay) => {
                self.pending_reconnect = Some(Box::pin(tokio::time::sleep(delay)));
            }
            Directive::GiveUp => self.pending_reconnect = None,
            Directive::None => {}
            Directive::Reply(message) => {
                tracing::debug!(?message, "reply without an open channel dropped");
            }
        }
    }
}

async fn reconnect_due(pending: &mut Option<Pin<Box<Sleep>>>) {
    match pending {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
