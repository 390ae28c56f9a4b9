// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `tend status`: one reachability probe plus local state.

use crate::config::Config;
use crate::env;
use crate::error::Result;

use super::open_queue;

pub async fn run(config: &Config) -> Result<()> {
    let probe = config.connectivity.probe(&config.api.base_url)?;
    let reachable = probe.check().await;

    println!(
        "API:      {} ({})",
        if reachable { "reachable" } else { "unreachable" },
        probe.addr
    );
    println!("Realtime: {}", config.realtime.url);
    println!(
        "Token:    {}",
        if env::token().is_some() {
            "set"
        } else {
            "not set (export TEND_TOKEN)"
        }
    );
    match open_queue(config) {
        Ok(queue) => println!("Queued:   {}", queue.size()),
        Err(e) => println!("Queued:   unavailable ({})", e),
    }
    Ok(())
}
