// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session pool configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What `borrow` does when a workspace has no session to hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedAction {
    /// Wait for a release, bounded by `borrow_timeout` when one is set
    #[default]
    Block,
    /// Fail immediately with `PoolExhausted`
    Fail,
}

/// Keyed session pool configuration
///
/// Durations are written as integer milliseconds in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum concurrently borrowed sessions per workspace
    pub max_sessions_per_workspace: usize,

    /// Maximum idle sessions kept per workspace; extra sessions are destroyed on release
    pub max_idle_per_workspace: usize,

    /// Idle sessions the evictor keeps and `init` prepares per workspace
    pub min_idle_per_workspace: usize,

    pub exhausted_action: ExhaustedAction,

    /// Bound on the wait when `exhausted_action` is `Block` (none waits indefinitely)
    #[serde(with = "millis")]
    pub borrow_timeout: Option<Duration>,

    /// Idle sessions older than this are destroyed instead of being handed out,
    /// and reaped by the evictor when one runs
    #[serde(with = "millis")]
    pub idle_timeout: Option<Duration>,

    /// Period of the background evictor (none disables the thread)
    #[serde(with = "millis")]
    pub eviction_interval: Option<Duration>,

    /// Validate idle sessions before handing them out
    pub test_on_borrow: bool,

    /// Validate sessions when they are returned
    pub test_on_return: bool,

    /// How long `shutdown` waits for borrowed sessions to come back
    #[serde(with = "millis")]
    pub shutdown_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_workspace: 8,
            max_idle_per_workspace: 8,
            min_idle_per_workspace: 0,
            exhausted_action: ExhaustedAction::Block,
            borrow_timeout: None,
            idle_timeout: Some(Duration::from_secs(30 * 60)), // 30 minutes
            eviction_interval: None,
            test_on_borrow: true,
            test_on_return: false,
            shutdown_timeout: None,
        }
    }
}

impl PoolConfig {
    /// Fail-fast configuration: never block a caller on an exhausted workspace
    pub fn fail_fast(max_sessions_per_workspace: usize) -> Self {
        Self {
            max_sessions_per_workspace,
            exhausted_action: ExhaustedAction::Fail,
            ..Self::default()
        }
    }

    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions_per_workspace = max;
        self
    }

    pub fn with_max_idle(mut self, max: usize) -> Self {
        self.max_idle_per_workspace = max;
        self
    }

    pub fn with_min_idle(mut self, min: usize) -> Self {
        self.min_idle_per_workspace = min;
        self
    }

    pub fn with_exhausted_action(mut self, action: ExhaustedAction) -> Self {
        self.exhausted_action = action;
        self
    }

    pub fn with_borrow_timeout(mut self, timeout: Duration) -> Self {
        self.borrow_timeout = Some(timeout);
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = Some(interval);
        self
    }

    pub fn with_test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = enabled;
        self
    }

    pub fn with_test_on_return(mut self, enabled: bool) -> Self {
        self.test_on_return = enabled;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Check the configuration for contradictions
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sessions_per_workspace == 0 {
            return Err("max_sessions_per_workspace must be greater than zero".to_string());
        }
        if self.min_idle_per_workspace > self.max_idle_per_workspace {
            return Err(format!(
                "min_idle_per_workspace ({}) exceeds max_idle_per_workspace ({})",
                self.min_idle_per_workspace, self.max_idle_per_workspace
            ));
        }
        if self.eviction_interval == Some(Duration::ZERO) {
            return Err("eviction_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_sessions_per_workspace, 8);
        assert_eq!(config.exhausted_action, ExhaustedAction::Block);
        assert!(config.borrow_timeout.is_none());
        assert!(config.test_on_borrow);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_contradictions() {
        assert!(PoolConfig::default().with_max_sessions(0).validate().is_err());
        assert!(PoolConfig::default()
            .with_max_idle(1)
            .with_min_idle(2)
            .validate()
            .is_err());
        assert!(PoolConfig::default()
            .with_eviction_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let config = PoolConfig::default().with_borrow_timeout(Duration::from_millis(250));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["borrow_timeout"], 250);
        assert_eq!(json["exhausted_action"], "block");
        assert!(json["eviction_interval"].is_null());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PoolConfig =
            serde_json::from_str(r#"{"max_sessions_per_workspace": 2, "exhausted_action": "fail"}"#)
                .unwrap();
        assert_eq!(config.max_sessions_per_workspace, 2);
        assert_eq!(config.exhausted_action, ExhaustedAction::Fail);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(1800)));
    }
}
