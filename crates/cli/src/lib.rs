// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox - offline mutation queue and realtime event client.
//!
//! # Main Components
//!
//! - [`ConnectivityMonitor`] - tri-state reachability with change notifications
//! - [`MutationQueue`] - encrypted, persistent queue of pending mutations
//! - [`OfflineSync`] - queues while offline and replays once back online
//! - [`RealtimeChannel`] - reconnecting socket with per-event subscriptions
//!
//! Each component talks to the outside world through a trait in
//! [`services`], so storage, encryption, HTTP and reachability can be swapped.
//!
//! ```rust,ignore
//! use outbox::{ConnectivityMonitor, MutationQueue, OfflineSync};
//!
//! let sync = OfflineSync::new(monitor, queue, http, reporter, DrainConfig::default());
//! sync.start().await;
//! if !sync.queue_request_if_offline(request.clone()).await {
//!     http.execute(&request).await?;
//! }
//! ```

mod cli;
mod commands;
mod env;
mod logging;

pub mod config;
pub mod connectivity;
pub mod error;
pub mod queue;
pub mod realtime;
pub mod services;
pub mod subscription;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use cli::{Cli, Command, OutputFormat, QueueCommand};
pub use config::Config;
pub use connectivity::{ConnectivityMonitor, ConnectivityProvider, TcpProbe};
pub use error::{Error, Result};
pub use queue::{MutationQueue, QueueError};
pub use realtime::{RealtimeChannel, RealtimeConfig};
pub use subscription::Subscription;
pub use sync::{DrainConfig, DrainOutcome, DrainReport, OfflineSync, SyncDrainer};

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use commands::Context;

/// Locks a std mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Runs a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    logging::init(cli.verbose)?;
    let config = Config::discover(cli.config.as_deref())?;
    let mut out = io::stdout();

    if let Command::Keygen { write } = cli.command {
        return commands::keygen::run(&config.key_path(), write, &mut out);
    }

    let ctx = Context::open(config)?;
    let result = dispatch(&ctx, cli.command, &mut out).await;
    out.flush()?;
    result
}

async fn dispatch(ctx: &Context, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Status { output } => commands::status::run(ctx, output, out).await,
        Command::Queue(cmd) => match cmd {
            QueueCommand::Add {
                method,
                url,
                body,
                force,
            } => commands::queue::add(ctx, &method, &url, body.as_deref(), force, out).await,
            QueueCommand::List { output } => commands::queue::list(ctx, output, out).await,
            QueueCommand::DeadLetters { output } => {
                commands::queue::dead_letters(ctx, output, out).await
            }
            QueueCommand::Remove { id } => commands::queue::remove(ctx, &id, out).await,
            QueueCommand::Clear { dead_letters } => {
                commands::queue::clear(ctx, dead_letters, out).await
            }
        },
        Command::Drain => commands::drain::run(ctx, out).await,
        Command::Listen { events, count } => {
            commands::listen::run(ctx, &events, count, out).await
        }
        Command::Keygen { write } => commands::keygen::run(&ctx.config.key_path(), write, out),
    }
}
