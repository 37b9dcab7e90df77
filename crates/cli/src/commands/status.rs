// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use serde::Serialize;

use super::Context;
use crate::cli::OutputFormat;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct StatusJson<'a> {
    online: bool,
    queued: usize,
    dead_letters: usize,
    storage_key: &'a str,
    key_fingerprint: Option<&'a str>,
}

pub async fn run(ctx: &Context, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let online = ctx.sync.monitor().check_connectivity().await;
    let queued = ctx.queue().len().await;
    let dead_letters = ctx.queue().dead_letters().await.len();

    match format {
        OutputFormat::Text => {
            writeln!(out, "connectivity: {}", if online { "online" } else { "offline" })?;
            writeln!(out, "queued:       {queued}")?;
            writeln!(out, "dead letters: {dead_letters}")?;
            match &ctx.fingerprint {
                Some(fp) => writeln!(out, "queue key:    {fp}")?,
                None => writeln!(out, "queue key:    none (queueing disabled)")?,
            }
        }
        OutputFormat::Json => {
            let status = StatusJson {
                online,
                queued,
                dead_letters,
                storage_key: ctx.queue().key(),
                key_fingerprint: ctx.fingerprint.as_deref(),
            };
            writeln!(out, "{}", serde_json::to_string(&status)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
