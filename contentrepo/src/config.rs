// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Access layer configuration and wiring
//!
//! [`RepositoryConfig`] is read from JSON and can be adjusted through
//! environment variables:
//!
//! | Variable                        | Field                               |
//! |---------------------------------|-------------------------------------|
//! | `CONTENTREPO_SESSION_MODE`      | `session_mode` (`pooled`/`simple`)  |
//! | `CONTENTREPO_MAX_SESSIONS`      | `pool.max_sessions_per_workspace`   |
//! | `CONTENTREPO_BORROW_TIMEOUT_MS` | `pool.borrow_timeout`               |
//! | `CONTENTREPO_IDLE_TIMEOUT_MS`   | `pool.idle_timeout`                 |
//!
//! [`create_session_factory`] and [`create_template`] turn a configuration
//! into ready-to-use objects.

use crate::error::AccessResult;
use crate::pool::{LoginSessionFactory, PoolConfig, SessionPool};
use crate::repository::{CredentialsProvider, Repository, RepositoryProvider};
use crate::session::{PooledSessionFactory, SessionFactory, SessionMode, SimpleSessionFactory};
use crate::template::RepositoryTemplate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const ENV_SESSION_MODE: &str = "CONTENTREPO_SESSION_MODE";
pub const ENV_MAX_SESSIONS: &str = "CONTENTREPO_MAX_SESSIONS";
pub const ENV_BORROW_TIMEOUT_MS: &str = "CONTENTREPO_BORROW_TIMEOUT_MS";
pub const ENV_IDLE_TIMEOUT_MS: &str = "CONTENTREPO_IDLE_TIMEOUT_MS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Session factory selection plus pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RepositoryConfig {
    pub session_mode: SessionMode,
    pub pool: PoolConfig,
    /// Workspaces whose idle sessions are created by `init`
    pub prewarm_workspaces: Vec<String>,
}

impl RepositoryConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Read a file and apply environment overrides on top
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(mode) = env_value(ENV_SESSION_MODE) {
            self.session_mode = mode.parse().map_err(|reason| ConfigError::InvalidValue {
                name: ENV_SESSION_MODE.to_string(),
                reason,
            })?;
        }
        if let Some(max) = env_value(ENV_MAX_SESSIONS) {
            self.pool.max_sessions_per_workspace = parse_number(ENV_MAX_SESSIONS, &max)? as usize;
        }
        if let Some(millis) = env_value(ENV_BORROW_TIMEOUT_MS) {
            self.pool.borrow_timeout =
                Some(Duration::from_millis(parse_number(ENV_BORROW_TIMEOUT_MS, &millis)?));
        }
        if let Some(millis) = env_value(ENV_IDLE_TIMEOUT_MS) {
            self.pool.idle_timeout =
                Some(Duration::from_millis(parse_number(ENV_IDLE_TIMEOUT_MS, &millis)?));
        }
        self.validate()?;
        log::debug!("Repository configuration: {:?}", self);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool.validate().map_err(|reason| ConfigError::InvalidValue {
            name: "pool".to_string(),
            reason,
        })?;
        if let Some(blank) = self.prewarm_workspaces.iter().find(|w| w.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                name: "prewarm_workspaces".to_string(),
                reason: format!("'{}' is not a workspace name", blank),
            });
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number(name: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("'{}': {}", value, e),
    })
}

/// Session type produced by the factories built over a repository provider
pub type ProvidedSession<P> = <<P as RepositoryProvider>::Repository as Repository>::Session;

/// Build the session factory selected by `config.session_mode`
pub fn create_session_factory<P>(
    config: &RepositoryConfig,
    repository_provider: P,
    credentials_provider: Arc<dyn CredentialsProvider>,
) -> AccessResult<Arc<dyn SessionFactory<Session = ProvidedSession<P>>>>
where
    P: RepositoryProvider + 'static,
{
    match config.session_mode {
        SessionMode::Pooled => {
            let login = LoginSessionFactory::new(repository_provider, credentials_provider);
            let pool = SessionPool::new(login, config.pool.clone())?;
            let factory = PooledSessionFactory::new(pool)
                .with_prewarm_workspaces(config.prewarm_workspaces.iter().cloned());
            Ok(Arc::new(factory) as Arc<dyn SessionFactory<Session = ProvidedSession<P>>>)
        }
        SessionMode::Simple => {
            let factory = SimpleSessionFactory::new(repository_provider, credentials_provider);
            Ok(Arc::new(factory) as Arc<dyn SessionFactory<Session = ProvidedSession<P>>>)
        }
    }
}

/// Build a template over the configured session factory
///
/// The credentials provider supplies the global identity for new sessions
/// and the user identity the template impersonates. Call `init` on the
/// result before first use.
pub fn create_template<P>(
    config: &RepositoryConfig,
    repository_provider: P,
    credentials_provider: Arc<dyn CredentialsProvider>,
) -> AccessResult<RepositoryTemplate<ProvidedSession<P>>>
where
    P: RepositoryProvider + 'static,
{
    let factory = create_session_factory(config, repository_provider, Arc::clone(&credentials_provider))?;
    Ok(RepositoryTemplate::new(factory).with_credentials_provider(credentials_provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ExhaustedAction;
    use crate::repository::{Credentials, MemoryRepository, StaticCredentialsProvider};

    #[test]
    fn test_default_config() {
        let config = RepositoryConfig::default();
        assert_eq!(config.session_mode, SessionMode::Pooled);
        assert_eq!(config.pool, PoolConfig::default());
        assert!(config.prewarm_workspaces.is_empty());
    }

    #[test]
    fn test_from_json_str() {
        let config = RepositoryConfig::from_json_str(
            r#"{
                "session_mode": "simple",
                "pool": {"max_sessions_per_workspace": 3, "borrow_timeout": 1500},
                "prewarm_workspaces": ["default"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.session_mode, SessionMode::Simple);
        assert_eq!(config.pool.max_sessions_per_workspace, 3);
        assert_eq!(config.pool.borrow_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.pool.exhausted_action, ExhaustedAction::Block);
        assert_eq!(config.prewarm_workspaces, vec!["default".to_string()]);
    }

    #[test]
    fn test_invalid_json_values_are_rejected() {
        assert!(matches!(
            RepositoryConfig::from_json_str(r#"{"session_mode": "global"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RepositoryConfig::from_json_str(r#"{"pool": {"max_sessions_per_workspace": 0}}"#),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            RepositoryConfig::from_json_str(r#"{"prewarm_workspaces": [" "]}"#),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_create_session_factory_honours_mode() {
        let repository = MemoryRepository::new()
            .with_workspace("default")
            .with_account("system", "system");
        let credentials: Arc<dyn CredentialsProvider> = Arc::new(StaticCredentialsProvider::new(
            Credentials::new("system", "system"),
        ));

        let simple = RepositoryConfig {
            session_mode: SessionMode::Simple,
            ..RepositoryConfig::default()
        };
        let factory =
            create_session_factory(&simple, Arc::new(repository.clone()), credentials.clone()).unwrap();
        let session = factory.get_session("default").unwrap();
        factory.release_session("default", session).unwrap();
        assert_eq!(repository.stats().logouts, 1);

        let pooled = RepositoryConfig::default();
        let factory =
            create_session_factory(&pooled, Arc::new(repository.clone()), credentials).unwrap();
        let session = factory.get_session("default").unwrap();
        factory.release_session("default", session).unwrap();
        assert_eq!(repository.stats().logouts, 1);
        assert_eq!(repository.stats().live_sessions, 1);
        factory.shutdown().unwrap();
        assert_eq!(repository.stats().logouts, 2);
    }
}
