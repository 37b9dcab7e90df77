// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  outbox keygen --write                 Create the queue encryption key
  outbox queue add POST /api/items      Queue or send a mutation
  outbox drain                          Replay queued mutations
  outbox listen -e item.created         Stream realtime events";

#[derive(Parser)]
#[command(name = "outbox")]
#[command(about = "Offline mutation queue and realtime event client")]
#[command(
    long_about = "Offline mutation queue and realtime event client.\n\n\
    Mutations made while offline are stored encrypted and replayed in order \
    once connectivity returns."
)]
#[command(version)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Config file (default: $OUTBOX_CONFIG or <config dir>/outbox/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show connectivity, queue length and key fingerprint
    Status {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Manage the offline queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Replay queued mutations once
    Drain,

    /// Stream realtime events as JSON lines while keeping the queue in sync
    #[command(after_help = "Examples:\n  \
        outbox listen                       Print every event\n  \
        outbox listen -e a -e b             Print events 'a' and 'b'\n  \
        outbox listen -e a --count 1        Exit after the first event")]
    Listen {
        /// Event name to subscribe to (repeatable, default: every event)
        #[arg(long = "event", short = 'e', value_name = "EVENT")]
        events: Vec<String>,

        /// Exit after printing this many events
        #[arg(long, short = 'n')]
        count: Option<usize>,
    },

    /// Generate a 256-bit queue encryption key
    Keygen {
        /// Write the key to the configured key file instead of printing it
        #[arg(long)]
        write: bool,
    },
}

/// Queue management commands.
#[derive(Subcommand)]
pub enum QueueCommand {
    /// Send a mutation, or queue it when offline
    #[command(
        arg_required_else_help = true,
        after_help = "Examples:\n  \
        outbox queue add POST /api/items --body '{\"title\":\"x\"}'\n  \
        outbox queue add DELETE /api/items/1 --force"
    )]
    Add {
        /// HTTP method (POST, PUT, PATCH or DELETE)
        method: String,

        /// Absolute URL, or a path joined onto [http] base_url
        url: String,

        /// JSON request body
        #[arg(long, short)]
        body: Option<String>,

        /// Queue without checking connectivity
        #[arg(long, short)]
        force: bool,
    },

    /// List queued mutations in replay order
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// List mutations that exhausted their attempts
    DeadLetters {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Remove one queued mutation
    #[command(arg_required_else_help = true)]
    Remove {
        /// Mutation ID
        id: String,
    },

    /// Remove every queued mutation and dead letter
    Clear {
        /// Only clear the dead-letter list
        #[arg(long)]
        dead_letters: bool,
    },
}

#[cfg(test)]
#[path = "cli_tests/mod.rs"]
mod tests;
