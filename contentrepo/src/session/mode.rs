// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session resource policy selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which [`SessionFactory`](super::SessionFactory) the configuration builds
///
/// # Modes
///
/// - **Pooled**: Sessions are kept in a keyed pool and reused across calls.
///   Login cost is paid once per pooled session. Use this mode for services
///   issuing many short operations.
///
/// - **Simple**: Every call logs in and every release logs out. No session
///   outlives a single template call. Use this mode at very low concurrency
///   or when sessions must not be reused between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Keyed session pool (default)
    #[default]
    Pooled,

    /// Login per call
    Simple,
}

impl SessionMode {
    /// Returns true if this is Pooled mode
    pub fn is_pooled(&self) -> bool {
        matches!(self, SessionMode::Pooled)
    }

    /// Returns true if this is Simple mode
    pub fn is_simple(&self) -> bool {
        matches!(self, SessionMode::Simple)
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Pooled => write!(f, "pooled"),
            SessionMode::Simple => write!(f, "simple"),
        }
    }
}

impl FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pooled" => Ok(SessionMode::Pooled),
            "simple" => Ok(SessionMode::Simple),
            other => Err(format!("Unknown session mode: {}", other)),
        }
    }
}
