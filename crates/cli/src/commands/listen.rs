// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;
use std::io::Write;

use outbox_core::protocol::WILDCARD;
use outbox_core::Envelope;
use tokio::sync::mpsc;

use super::drain::describe;
use super::Context;
use crate::error::{Error, Result};
use crate::realtime::{RealtimeChannel, Transport};
use crate::subscription::Subscription;

/// Runs the offline sync and a realtime channel until Ctrl-C.
pub async fn run(
    ctx: &Context,
    events: &[String],
    count: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let config = ctx
        .config
        .realtime_config()
        .ok_or(Error::RealtimeNotConfigured)?;
    let channel = RealtimeChannel::new(ctx.tokens.clone(), config);
    stream(ctx, &channel, events, count, tokio::signal::ctrl_c(), out).await
}

/// Prints every received event as one JSON line until `shutdown` resolves or
/// `count` events were printed.
pub async fn stream<T: Transport, S: Future>(
    ctx: &Context,
    channel: &RealtimeChannel<T>,
    events: &[String],
    count: Option<usize>,
    shutdown: S,
    out: &mut impl Write,
) -> Result<()> {
    let outcome = ctx.sync.start().await;
    tracing::info!(
        "initial drain: {}",
        describe(outcome, ctx.queue().len().await)
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    let names: Vec<String> = if events.is_empty() {
        vec![WILDCARD.to_string()]
    } else {
        events.to_vec()
    };
    let subscriptions: Vec<Subscription> = names
        .iter()
        .map(|event| {
            let tx = tx.clone();
            channel.subscribe(event, move |envelope| {
                // A closed receiver means we are shutting down.
                let _ = tx.send(envelope.clone());
            })
        })
        .collect();
    drop(tx);

    let result = pump(&mut rx, count, shutdown, out).await;

    for subscription in &subscriptions {
        subscription.unsubscribe();
    }
    channel.dispose();
    ctx.sync.stop();
    result
}

async fn pump<S: Future>(
    rx: &mut mpsc::UnboundedReceiver<Envelope>,
    count: Option<usize>,
    shutdown: S,
    out: &mut impl Write,
) -> Result<()> {
    tokio::pin!(shutdown);
    let mut printed = 0usize;
    while count.map_or(true, |limit| printed < limit) {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!("shutdown requested");
                break;
            }
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                writeln!(out, "{}", envelope.to_json()?)?;
                out.flush()?;
                printed += 1;
            }
        }
    }
    Ok(())
}
