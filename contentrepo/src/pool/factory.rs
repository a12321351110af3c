// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Poolable session factory
//!
//! Creates, validates and destroys the sessions held by a
//! [`SessionPool`](super::SessionPool), keyed by workspace name.

use crate::error::{AccessResult, RepositoryAccessError};
use crate::repository::{CredentialsProvider, Repository, RepositoryProvider, Session};
use std::sync::Arc;

/// Lifecycle hooks the pool drives for every session it holds
pub trait KeyedSessionFactory: Send + Sync {
    type Session: Session + 'static;

    /// Create a session for the workspace
    fn create(&self, workspace: &str) -> AccessResult<Self::Session>;

    /// Liveness probe; `false` makes the pool destroy the session instead of reusing it
    fn validate(&self, workspace: &str, session: &Self::Session) -> bool;

    /// Called before an idle session is handed to a borrower
    fn activate(&self, _workspace: &str, _session: &Self::Session) -> AccessResult<()> {
        Ok(())
    }

    /// Called when a session goes back to the idle set
    fn passivate(&self, _workspace: &str, _session: &Self::Session) -> AccessResult<()> {
        Ok(())
    }

    /// Destroy a session. Failures are logged, never reported.
    fn destroy(&self, workspace: &str, session: Self::Session);
}

/// Creates sessions by logging in with the global credentials
pub struct LoginSessionFactory<P: RepositoryProvider> {
    repository_provider: P,
    credentials_provider: Arc<dyn CredentialsProvider>,
}

impl<P: RepositoryProvider> LoginSessionFactory<P> {
    pub fn new(repository_provider: P, credentials_provider: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            repository_provider,
            credentials_provider,
        }
    }
}

impl<P: RepositoryProvider> KeyedSessionFactory for LoginSessionFactory<P> {
    type Session = <P::Repository as Repository>::Session;

    fn create(&self, workspace: &str) -> AccessResult<Self::Session> {
        let repository = self.repository_provider.repository();
        let credentials = self.credentials_provider.global_credentials();
        let session = repository
            .login(&credentials, workspace)
            .map_err(|source| RepositoryAccessError::SessionCreation {
                workspace: workspace.to_string(),
                source,
            })?;
        log::debug!(
            "Created session for '{}' in workspace '{}'",
            credentials.user_id(),
            workspace
        );
        Ok(session)
    }

    fn validate(&self, _workspace: &str, session: &Self::Session) -> bool {
        session.is_live()
    }

    fn passivate(&self, _workspace: &str, session: &Self::Session) -> AccessResult<()> {
        // Unsaved changes must not leak to the next borrower.
        session.refresh(false)?;
        Ok(())
    }

    fn destroy(&self, workspace: &str, mut session: Self::Session) {
        if let Err(e) = session.logout() {
            log::warn!(
                "Failed to log out pooled session in workspace '{}': {}",
                workspace,
                e
            );
        } else {
            log::debug!("Destroyed session in workspace '{}'", workspace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Credentials, MemoryRepository, StaticCredentialsProvider};

    fn factory(password: &str) -> (MemoryRepository, LoginSessionFactory<Arc<MemoryRepository>>) {
        let repository = MemoryRepository::new()
            .with_workspace("default")
            .with_account("system", "system");
        let credentials = Arc::new(StaticCredentialsProvider::new(Credentials::new(
            "system", password,
        )));
        let factory = LoginSessionFactory::new(Arc::new(repository.clone()), credentials);
        (repository, factory)
    }

    #[test]
    fn test_create_logs_in_with_global_credentials() {
        let (repository, factory) = factory("system");
        let session = factory.create("default").unwrap();
        assert_eq!(session.user_id(), "system");
        assert_eq!(session.workspace_name(), "default");
        assert!(factory.validate("default", &session));
        assert_eq!(repository.stats().logins, 1);
    }

    #[test]
    fn test_create_reports_session_creation_error() {
        let (_, factory) = factory("wrong");
        let error = factory.create("default").unwrap_err();
        assert!(error.is_session_creation());
    }

    #[test]
    fn test_destroy_swallows_logout_failure() {
        let (repository, factory) = factory("system");
        let session = factory.create("default").unwrap();
        repository.set_fail_logouts(true);
        factory.destroy("default", session);
        assert_eq!(repository.stats().logouts, 1);
        assert_eq!(repository.stats().live_sessions, 0);
    }

    #[test]
    fn test_validate_detects_dead_session() {
        let (repository, factory) = factory("system");
        let session = factory.create("default").unwrap();
        repository.kill_sessions("default");
        assert!(!factory.validate("default", &session));
    }
}
