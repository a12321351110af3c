// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Non-pooled session factory

use super::factory::SessionFactory;
use crate::error::{AccessResult, RepositoryAccessError};
use crate::repository::{CredentialsProvider, Repository, RepositoryProvider, Session};
use std::sync::Arc;

/// Logs in with the global credentials on every request and logs out on release
pub struct SimpleSessionFactory<P: RepositoryProvider> {
    repository_provider: P,
    credentials_provider: Arc<dyn CredentialsProvider>,
}

impl<P: RepositoryProvider> SimpleSessionFactory<P> {
    pub fn new(repository_provider: P, credentials_provider: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            repository_provider,
            credentials_provider,
        }
    }
}

impl<P: RepositoryProvider> SessionFactory for SimpleSessionFactory<P> {
    type Session = <P::Repository as Repository>::Session;

    fn get_session(&self, workspace: &str) -> AccessResult<Self::Session> {
        let credentials = self.credentials_provider.global_credentials();
        self.repository_provider
            .repository()
            .login(&credentials, workspace)
            .map_err(|source| RepositoryAccessError::SessionCreation {
                workspace: workspace.to_string(),
                source,
            })
    }

    fn release_session(&self, workspace: &str, mut session: Self::Session) -> AccessResult<()> {
        session.logout().map_err(|e| {
            RepositoryAccessError::with_cause(
                format!("Failed to log out session in workspace '{}': {}", workspace, e),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Credentials, MemoryRepository, StaticCredentialsProvider};

    fn factory(password: &str) -> (MemoryRepository, SimpleSessionFactory<Arc<MemoryRepository>>) {
        let repository = MemoryRepository::new()
            .with_workspace("default")
            .with_account("system", "system");
        let credentials = Arc::new(StaticCredentialsProvider::new(Credentials::new(
            "system", password,
        )));
        (
            repository.clone(),
            SimpleSessionFactory::new(Arc::new(repository), credentials),
        )
    }

    #[test]
    fn test_every_request_logs_in_and_out() {
        let (repository, factory) = factory("system");
        for _ in 0..3 {
            let session = factory.get_session("default").unwrap();
            assert!(session.is_live());
            factory.release_session("default", session).unwrap();
        }
        let stats = repository.stats();
        assert_eq!(stats.logins, 3);
        assert_eq!(stats.logouts, 3);
        assert_eq!(stats.live_sessions, 0);
    }

    #[test]
    fn test_bad_credentials_fail_session_creation() {
        let (_, factory) = factory("nope");
        assert!(factory.get_session("default").unwrap_err().is_session_creation());
    }

    #[test]
    fn test_unknown_workspace_fails_session_creation() {
        let (_, factory) = factory("system");
        assert!(factory.get_session("missing").unwrap_err().is_session_creation());
    }

    #[test]
    fn test_logout_failure_is_reported() {
        let (repository, factory) = factory("system");
        let session = factory.get_session("default").unwrap();
        repository.set_fail_logouts(true);
        assert!(factory.release_session("default", session).is_err());
    }
}
