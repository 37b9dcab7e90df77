// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use super::Context;
use crate::error::Result;
use crate::sync::{DrainOutcome, DrainReport};

pub async fn run(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let outcome = ctx.sync.drainer().drain().await;
    let remaining = ctx.queue().len().await;
    writeln!(out, "{}", describe(outcome, remaining))?;
    Ok(())
}

pub(crate) fn describe(outcome: DrainOutcome, remaining: usize) -> String {
    match outcome {
        DrainOutcome::AlreadyDraining => "a drain is already running".to_string(),
        DrainOutcome::Offline => format!("offline: {remaining} mutation(s) left queued"),
        DrainOutcome::Drained(report) => describe_report(&report, remaining),
    }
}

fn describe_report(report: &DrainReport, remaining: usize) -> String {
    let mut line = format!("sent {}, rejected {}", report.sent, report.rejected);
    if report.dead_lettered > 0 {
        line.push_str(&format!(", dead-lettered {}", report.dead_lettered));
    }
    if report.halted {
        line.push_str(&format!("; stopped with {remaining} remaining"));
    }
    line
}
