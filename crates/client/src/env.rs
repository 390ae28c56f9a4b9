// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables read by tend are named in [`vars`]
//! and read through the typed accessors below.

use std::path::PathBuf;

use crate::realtime::TokenSource;

/// Environment variable names.
pub mod vars {
    pub const TEND_CONFIG: &str = "TEND_CONFIG";
    pub const TEND_TOKEN: &str = "TEND_TOKEN";
    pub const TEND_LOG: &str = "TEND_LOG";
}

/// Returns the value of `TEND_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    std::env::var(vars::TEND_CONFIG)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Returns the auth token from `TEND_TOKEN`, if set and non-empty.
pub fn token() -> Option<String> {
    std::env::var(vars::TEND_TOKEN)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Returns the log filter directive from `TEND_LOG` if set.
pub fn log_filter() -> Option<String> {
    std::env::var(vars::TEND_LOG).ok().filter(|v| !v.is_empty())
}

/// Token source reading `TEND_TOKEN` on every connection attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvToken;

impl TokenSource for EnvToken {
    fn token(&self) -> Option<String> {
        token()
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
