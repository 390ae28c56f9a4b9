// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `tend listen`: run the realtime channel in the foreground.

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use serde_json::Value;
use tend_core::{Method, Notification, PendingRequest};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::connectivity::ConnectivitySignal;
use crate::drain::ResilientClient;
use crate::env::{self, EnvToken};
use crate::error::Result;
use crate::http::HttpTransport;
use crate::queue::OfflineQueue;
use crate::realtime::{
    ChannelHooks, ConnectionState, NotificationSubscriber, RealtimeManager, SystemAlerts,
    WebSocketTransport,
};

use super::http_transport;

/// Prints channel events to stdout.
pub struct PrintSubscriber {
    http: Arc<dyn HttpTransport>,
    endpoint: String,
}

impl PrintSubscriber {
    pub fn new(http: Arc<dyn HttpTransport>, endpoint: String) -> Self {
        PrintSubscriber { http, endpoint }
    }
}

impl NotificationSubscriber for PrintSubscriber {
    fn add_notification(&self, notification: Notification) {
        println!("{}", format_notification(&notification));
    }

    fn update_unread_count(&self, count: u64) {
        println!("Unread: {}", count);
    }

    fn set_connected(&self, connected: bool) {
        if connected {
            eprintln!("Connected to notification channel");
        } else {
            eprintln!("Disconnected from notification channel");
        }
    }

    fn fetch_initial(&self) {
        let http = Arc::clone(&self.http);
        let request = PendingRequest::new(Method::Get, self.endpoint.clone());
        tokio::spawn(async move {
            match http.send(&request).await {
                Ok(body) => match summarize(&body) {
                    Some((total, unread)) => println!("{} notifications, {} unread", total, unread),
                    None => tracing::debug!("unexpected notification list shape"),
                },
                Err(e) => tracing::warn!(error = %e, "failed to fetch notifications"),
            }
        });
    }
}

/// Rings the terminal bell when stdout is a terminal.
pub struct TerminalBell;

impl SystemAlerts for TerminalBell {
    fn is_permitted(&self) -> bool {
        std::io::stdout().is_terminal()
    }

    fn alert(&self, _notification: &Notification) {
        let mut out = std::io::stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }
}

pub(crate) fn format_notification(notification: &Notification) -> String {
    let time = notification
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M");
    let mut line = format!("{} [{}] {}", time, notification.kind, notification.title);
    if !notification.body.is_empty() {
        line.push_str(": ");
        line.push_str(&notification.body);
    }
    if let Some(link) = &notification.link {
        line.push_str(&format!(" <{}>", link));
    }
    line
}

/// Count total and unread entries of a notification list, either a bare
/// array or a paginated `{"results": [...]}` object.
pub(crate) fn summarize(body: &Value) -> Option<(usize, usize)> {
    let items = body
        .as_array()
        .or_else(|| body.get("results").and_then(Value::as_array))?;
    let unread = items
        .iter()
        .filter(|item| !item.get("read").and_then(Value::as_bool).unwrap_or(false))
        .count();
    Some((items.len(), unread))
}

pub async fn run(config: &Config, bell: bool, no_drain: bool) -> Result<()> {
    let http = http_transport(config)?;
    let queue: OfflineQueue = super::open_queue(config)?;
    let client = ResilientClient::new(http.clone(), queue, config.retry.to_options())
        .with_discard_after(config.retry.discard_after);

    let signal = Arc::new(ConnectivitySignal::default());
    let cancel = CancellationToken::new();
    let probe = config.connectivity.probe(&config.api.base_url)?;
    let probe_task = probe.spawn(Arc::clone(&signal), cancel.clone());
    let auto_drain = (!no_drain).then(|| client.auto_drain(signal.monitor()));

    let subscriber = Arc::new(PrintSubscriber::new(
        http,
        config.api.notifications_endpoint.clone(),
    ));
    let mut hooks = ChannelHooks::new(subscriber, Arc::new(EnvToken));
    if bell {
        hooks = hooks.with_alerts(Arc::new(TerminalBell));
    }
    if env::token().is_none() {
        tracing::warn!("TEND_TOKEN is not set; the realtime channel will not open");
    }

    let manager = RealtimeManager::spawn(
        config.realtime.to_realtime_config(),
        WebSocketTransport::new(),
        hooks,
    );
    manager.connect();

    let mut monitor = signal.monitor();
    loop {
        let change = tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            change = monitor.wait_for_change() => change,
        };
        match change {
            // The channel may have given up while offline.
            Ok(true) if manager.state() == ConnectionState::Disconnected => manager.reconnect(),
            Ok(_) => {}
            Err(_) => break,
        }
    }

    tracing::info!("shutting down");
    manager.shutdown().await;
    if let Some(auto_drain) = auto_drain {
        auto_drain.stop().await;
    }
    cancel.cancel();
    let _ = probe_task.await;
    Ok(())
}

#[cfg(test)]
#[path = "listen_tests.rs"]
mod tests;
