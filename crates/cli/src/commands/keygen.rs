// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::services::ChaChaCipher;

/// Prints a fresh key, or writes it to `key_path` when `write` is set.
pub fn run(key_path: &Path, write: bool, out: &mut impl Write) -> Result<()> {
    let key = ChaChaCipher::generate_key_hex();
    if !write {
        writeln!(out, "{key}")?;
        return Ok(());
    }

    write_key(key_path, &key)?;
    let fingerprint = ChaChaCipher::from_hex(&key)?.fingerprint().to_string();
    tracing::info!(path = %key_path.display(), key = %fingerprint, "queue key written");
    writeln!(out, "wrote key {fingerprint} to {}", key_path.display())?;
    Ok(())
}

fn write_key(path: &Path, key: &str) -> Result<()> {
    if path.exists() {
        return Err(Error::KeyExists(path.display().to_string()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    writeln!(file, "{key}")?;
    Ok(())
}
