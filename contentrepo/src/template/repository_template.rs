// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Callback-based repository access
//!
//! Every operation runs inside [`RepositoryTemplate::with_session`]:
//!
//! 1. obtain a session for the workspace from the session factory
//! 2. if the credentials provider has a user identity, impersonate it and run
//!    the operation on the impersonated session, logging that session out
//!    afterwards
//! 3. release the session to the factory
//!
//! Steps 2 and 3 run whether the operation succeeds, fails or panics. A
//! cleanup failure after a successful operation is returned; after a failed
//! operation it is logged and the operation's error is returned.

use super::handlers::NodeHandlers;
use super::validation;
use crate::error::{AccessResult, NodeLocation, RepositoryAccessError};
use crate::repository::{CredentialsProvider, Node, QueryDescriptor, RepositoryError, Session};
use crate::session::SessionFactory;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Message of the error returned when a workspace has no root node
pub const ROOT_NODE_UNAVAILABLE: &str = "root node unavailable";

/// Upper bound on the capacity reserved for collected query results
const MAX_PREALLOCATED_RESULTS: u64 = 256;

/// Facade for running callbacks against repository sessions
pub struct RepositoryTemplate<S: Session + 'static> {
    session_factory: Arc<dyn SessionFactory<Session = S>>,
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
}

impl<S: Session + 'static> Clone for RepositoryTemplate<S> {
    fn clone(&self) -> Self {
        Self {
            session_factory: Arc::clone(&self.session_factory),
            credentials_provider: self.credentials_provider.clone(),
        }
    }
}

impl<S: Session + 'static> RepositoryTemplate<S> {
    pub fn new(session_factory: Arc<dyn SessionFactory<Session = S>>) -> Self {
        Self {
            session_factory,
            credentials_provider: None,
        }
    }

    /// Impersonate the provider's user identity, when it has one, on every call
    pub fn with_credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    pub fn session_factory(&self) -> &Arc<dyn SessionFactory<Session = S>> {
        &self.session_factory
    }

    pub fn init(&self) -> AccessResult<()> {
        self.session_factory.init()
    }

    /// Shut the session factory down; call once at teardown
    pub fn shutdown(&self) -> AccessResult<()> {
        self.session_factory.shutdown()
    }

    /// Run an operation against a session for the workspace
    pub fn with_session<T, F>(&self, workspace: &str, operation: F) -> AccessResult<T>
    where
        F: FnOnce(&S) -> AccessResult<T>,
    {
        validation::workspace(workspace)?;
        let result = self.execute(workspace, operation);
        if let Err(error) = &result {
            log_failure(workspace, error);
        }
        result
    }

    /// Run a callback against the root node of the workspace
    pub fn with_root<T, F>(&self, workspace: &str, callback: F) -> AccessResult<T>
    where
        F: FnOnce(&S, &S::Node) -> AccessResult<T>,
    {
        self.with_session(workspace, |session| {
            let root = session
                .root_node()?
                .ok_or_else(|| RepositoryAccessError::access(ROOT_NODE_UNAVAILABLE))?;
            callback(session, &root)
        })
    }

    /// Run `found` against the node at `path`
    ///
    /// A missing node fails with `NodeNotFound`.
    pub fn with_node_path<T, F>(&self, workspace: &str, path: &str, found: F) -> AccessResult<T>
    where
        F: FnOnce(&S, &S::Node) -> AccessResult<T>,
    {
        self.with_node_path_handlers(workspace, path, NodeHandlers::new(found))
    }

    /// Resolve the node at `path` and run the handler matching the outcome
    pub fn with_node_path_handlers<T>(
        &self,
        workspace: &str,
        path: &str,
        handlers: NodeHandlers<'_, S, T>,
    ) -> AccessResult<T> {
        validation::path(path)?;
        self.with_session(workspace, |session| {
            let lookup = session.node(path);
            handlers.dispatch(session, lookup, workspace, NodeLocation::Path(path.to_string()))
        })
    }

    /// Run `found` against the node with identifier `id`
    ///
    /// A missing node fails with `NodeNotFound`.
    pub fn with_node_id<T, F>(&self, workspace: &str, id: &str, found: F) -> AccessResult<T>
    where
        F: FnOnce(&S, &S::Node) -> AccessResult<T>,
    {
        self.with_node_id_handlers(workspace, id, NodeHandlers::new(found))
    }

    /// Resolve the node with identifier `id` and run the handler matching the outcome
    pub fn with_node_id_handlers<T>(
        &self,
        workspace: &str,
        id: &str,
        handlers: NodeHandlers<'_, S, T>,
    ) -> AccessResult<T> {
        validation::identifier(id)?;
        self.with_session(workspace, |session| {
            let lookup = session.node_by_identifier(id);
            handlers.dispatch(
                session,
                lookup,
                workspace,
                NodeLocation::Identifier(id.to_string()),
            )
        })
    }

    /// Run a windowed query and invoke `callback` once per result node, in result order
    pub fn for_each_query_result<F>(
        &self,
        workspace: &str,
        query: &QueryDescriptor,
        mut callback: F,
    ) -> AccessResult<()>
    where
        F: FnMut(&S, &S::Node) -> AccessResult<()>,
    {
        validation::query(query)?;
        self.with_session(workspace, |session| {
            for node in session.execute_query(query)? {
                callback(session, &node?)?;
            }
            Ok(())
        })
    }

    /// Run a windowed query and collect the callback's value for each result node
    pub fn with_query_results<T, F>(
        &self,
        workspace: &str,
        query: &QueryDescriptor,
        mut callback: F,
    ) -> AccessResult<Vec<T>>
    where
        F: FnMut(&S, &S::Node) -> AccessResult<T>,
    {
        validation::query(query)?;
        self.with_session(workspace, |session| {
            let capacity = query.limit.min(MAX_PREALLOCATED_RESULTS) as usize;
            let mut results = Vec::with_capacity(capacity);
            for node in session.execute_query(query)? {
                results.push(callback(session, &node?)?);
            }
            Ok(results)
        })
    }

    /// Return the child `name` of `parent`, adding it with `node_type` if it is missing
    ///
    /// The repository's unique-child constraint settles concurrent creation:
    /// when another caller adds the child first, that child is returned. The
    /// new node is not saved.
    pub fn get_or_create_node(
        &self,
        parent: &S::Node,
        name: &str,
        node_type: &str,
    ) -> AccessResult<S::Node> {
        match parent.child(name) {
            Ok(child) => return Ok(child),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(node_failure("look up", name, e)),
        }

        match parent.add_node(name, node_type) {
            Ok(child) => {
                log::debug!("Created node '{}' of type '{}'", name, node_type);
                Ok(child)
            }
            Err(RepositoryError::ItemExists(_)) => {
                log::debug!("Node '{}' was created concurrently, using it", name);
                parent.child(name).map_err(|e| node_failure("look up", name, e))
            }
            Err(e) => Err(node_failure("create", name, e)),
        }
    }

    fn execute<T, F>(&self, workspace: &str, operation: F) -> AccessResult<T>
    where
        F: FnOnce(&S) -> AccessResult<T>,
    {
        let session = self.session_factory.get_session(workspace)?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_as_user(&session, operation)));
        let released = self.session_factory.release_session(workspace, session);
        settle(outcome, released, "release session")
    }

    fn run_as_user<T, F>(&self, session: &S, operation: F) -> AccessResult<T>
    where
        F: FnOnce(&S) -> AccessResult<T>,
    {
        let credentials = self
            .credentials_provider
            .as_ref()
            .and_then(|provider| provider.user_credentials());
        let Some(credentials) = credentials else {
            return operation(session);
        };

        let mut impersonated = session.impersonate(&credentials).map_err(|e| {
            RepositoryAccessError::with_cause(
                format!("Failed to impersonate '{}': {}", credentials.user_id(), e),
                e,
            )
        })?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| operation(&impersonated)));
        let logged_out = impersonated.logout().map_err(|e| {
            RepositoryAccessError::with_cause(
                format!(
                    "Failed to log out impersonated session of '{}': {}",
                    credentials.user_id(),
                    e
                ),
                e,
            )
        });
        settle(outcome, logged_out, "log out impersonated session")
    }
}

/// Combine an operation outcome with the result of its cleanup step
fn settle<T>(
    outcome: std::thread::Result<AccessResult<T>>,
    cleanup: AccessResult<()>,
    action: &str,
) -> AccessResult<T> {
    match outcome {
        Ok(Ok(value)) => cleanup.map(|()| value),
        Ok(Err(error)) => {
            if let Err(cleanup_error) = cleanup {
                log::warn!("Failed to {} after error: {}", action, cleanup_error);
            }
            Err(error)
        }
        Err(payload) => {
            if let Err(cleanup_error) = cleanup {
                log::warn!("Failed to {} after panic: {}", action, cleanup_error);
            }
            panic::resume_unwind(payload)
        }
    }
}

fn node_failure(action: &str, name: &str, error: RepositoryError) -> RepositoryAccessError {
    RepositoryAccessError::with_cause(
        format!("Failed to {} node '{}': {}", action, name, error),
        error,
    )
}

fn log_failure(workspace: &str, error: &RepositoryAccessError) {
    match std::error::Error::source(error) {
        Some(cause) => log::debug!(
            "Repository access in workspace '{}' failed: {} (cause: {})",
            workspace,
            error,
            cause
        ),
        None => log::debug!(
            "Repository access in workspace '{}' failed: {}",
            workspace,
            error
        ),
    }
}
