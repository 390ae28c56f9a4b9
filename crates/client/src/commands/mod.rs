// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod listen;
pub mod queue;
pub mod send;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use crate::config::{default_config_path, Config};
use crate::drain::ResilientClient;
use crate::env;
use crate::error::Result;
use crate::http::ReqwestTransport;
use crate::queue::OfflineQueue;

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
}

/// HTTP transport for the configured API, authenticated with `TEND_TOKEN`.
pub fn http_transport(config: &Config) -> Result<Arc<ReqwestTransport>> {
    let transport =
        ReqwestTransport::new(&config.api.base_url, config.api.timeout())?.with_token(env::token());
    Ok(Arc::new(transport))
}

/// The offline queue on the configured storage.
pub fn open_queue(config: &Config) -> Result<OfflineQueue> {
    Ok(OfflineQueue::new(config.storage.open_store()?))
}

/// Send-or-queue client wired from config.
pub fn resilient_client(config: &Config) -> Result<ResilientClient> {
    let client = ResilientClient::new(
        http_transport(config)?,
        open_queue(config)?,
        config.retry.to_options(),
    )
    .with_discard_after(config.retry.discard_after);
    Ok(client)
}

/// Print the effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    if let Some(path) = default_config_path() {
        println!("# default location: {}", path.display());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
