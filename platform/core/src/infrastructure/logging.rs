// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tracing subscriber bootstrap.
//!
//! `RUST_LOG` wins over the configured level so an operator can raise verbosity
//! on one process without editing the manifest.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::domain::platform_config::LoggingConfig;

/// Install the global subscriber described by `config`.
///
/// Fails if the level is not a valid filter directive or a global subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match config.format.as_str() {
        "json" => builder
            .json()
            .with_current_span(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to install JSON log subscriber")?,
        _ => builder
            .with_target(false)
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to install log subscriber")?,
    }

    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to create log filter")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(build_filter("info").is_ok());
        assert!(build_filter("atrium_core=debug,warn").is_ok());
    }

    #[test]
    fn test_init_logging_twice_fails() {
        let config = LoggingConfig::default();
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
