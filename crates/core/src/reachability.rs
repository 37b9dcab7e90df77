// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network reachability as reported by a connectivity provider.

use serde::{Deserialize, Serialize};

/// Tri-state reachability. Only [`Reachability::Online`] counts as online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    /// No answer yet, or the provider could not tell.
    #[default]
    Unknown,
    Online,
    Offline,
}

impl Reachability {
    /// Maps a provider status, where `None` means the provider could not tell.
    pub fn from_status(status: Option<bool>) -> Self {
        match status {
            Some(true) => Reachability::Online,
            Some(false) => Reachability::Offline,
            None => Reachability::Unknown,
        }
    }

    /// Resolves to a boolean, treating unknown as offline.
    pub fn is_online(self) -> bool {
        self == Reachability::Online
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Reachability::Unknown => "unknown",
            Reachability::Online => "online",
            Reachability::Offline => "offline",
        }
    }
}

impl std::fmt::Display for Reachability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
