// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostic logging to stderr.

use tracing_subscriber::EnvFilter;

use crate::env;
use crate::error::{Error, Result};

const DEFAULT_DIRECTIVE: &str = "warn";
const VERBOSE_DIRECTIVE: &str = "outbox=debug,outbox_core=debug,info";

/// Filter directive: `$OUTBOX_LOG` wins, then `--verbose`, then warnings only.
pub fn filter_directive(verbose: bool, from_env: Option<String>) -> String {
    match from_env {
        Some(directive) => directive,
        None if verbose => VERBOSE_DIRECTIVE.to_string(),
        None => DEFAULT_DIRECTIVE.to_string(),
    }
}

/// Installs the global subscriber. Stdout is left to command output.
pub fn init(verbose: bool) -> Result<()> {
    let directive = filter_directive(verbose, env::log_filter());
    let filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new(DEFAULT_DIRECTIVE))
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
