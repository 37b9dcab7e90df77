// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use chrono::{DateTime, Utc};
use outbox_core::{DeadLetter, MutationRequest, QueuedMutation};
use serde_json::Value;

use super::Context;
use crate::cli::OutputFormat;
use crate::error::{Error, Result};

/// Sends a mutation when online, otherwise queues it.
///
/// A live send that fails with a retryable error is queued as well, so it is
/// replayed on the next drain.
pub async fn add(
    ctx: &Context,
    method: &str,
    url: &str,
    body: Option<&str>,
    force: bool,
    out: &mut impl Write,
) -> Result<()> {
    let body = body
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|e| Error::InvalidBody(e.to_string()))?;
    let request = MutationRequest::new(method, url, body)?;

    if force {
        let queued = ctx.queue().add_to_queue(request).await?;
        writeln!(out, "queued {}", queued.id)?;
        return Ok(());
    }

    let online = ctx.sync.monitor().check_connectivity().await;
    if ctx.sync.queue_request_if_offline(request.clone()).await {
        writeln!(out, "offline: queued {} {}", request.method, request.url)?;
        return Ok(());
    }
    if !online {
        return Err(Error::QueueUnavailable);
    }

    match ctx.http.execute(&request).await {
        Ok(()) => writeln!(out, "sent {} {}", request.method, request.url)?,
        Err(e) if e.is_retryable() => {
            let queued = ctx.queue().add_to_queue(request).await?;
            writeln!(out, "send failed ({e}); queued {}", queued.id)?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub async fn list(ctx: &Context, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let queue = ctx.queue().get_queue().await;
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&queue)?)?,
        OutputFormat::Text if queue.is_empty() => writeln!(out, "queue is empty")?,
        OutputFormat::Text => {
            for mutation in &queue {
                writeln!(out, "{}", format_mutation(mutation))?;
            }
        }
    }
    Ok(())
}

pub async fn dead_letters(ctx: &Context, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let letters = ctx.queue().dead_letters().await;
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&letters)?)?,
        OutputFormat::Text if letters.is_empty() => writeln!(out, "no dead letters")?,
        OutputFormat::Text => {
            for letter in &letters {
                writeln!(out, "{}", format_dead_letter(letter))?;
            }
        }
    }
    Ok(())
}

pub async fn remove(ctx: &Context, id: &str, out: &mut impl Write) -> Result<()> {
    ctx.queue().remove_from_queue(id).await?;
    writeln!(out, "removed {id}")?;
    Ok(())
}

pub async fn clear(ctx: &Context, dead_letters_only: bool, out: &mut impl Write) -> Result<()> {
    if dead_letters_only {
        ctx.queue().clear_dead_letters().await?;
        writeln!(out, "cleared dead letters")?;
    } else {
        ctx.queue().clear_queue().await?;
        writeln!(out, "cleared queue")?;
    }
    Ok(())
}

fn format_time(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_mutation(mutation: &QueuedMutation) -> String {
    let mut line = format!(
        "{}  {} {}  queued {}",
        mutation.id,
        mutation.method,
        mutation.url,
        format_time(mutation.timestamp)
    );
    if mutation.attempts > 0 {
        line.push_str(&format!("  attempts {}", mutation.attempts));
    }
    line
}

fn format_dead_letter(letter: &DeadLetter) -> String {
    format!(
        "{}  {} {}  failed {}: {}",
        letter.mutation.id,
        letter.mutation.method,
        letter.mutation.url,
        format_time(letter.failed_at),
        letter.reason
    )
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
