// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error type returned by the access layer
//!
//! Pools, session factories and the template all report failures as
//! [`RepositoryAccessError`]. Repository client errors never cross this
//! boundary unwrapped; they stay reachable through `Error::source()`.

use crate::repository::RepositoryError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed cause carried by [`RepositoryAccessError::Access`]
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// How a node was addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeLocation {
    Path(String),
    Identifier(String),
}

impl fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLocation::Path(path) => write!(f, "at path {}", path),
            NodeLocation::Identifier(id) => write!(f, "with identifier {}", id),
        }
    }
}

#[derive(Error, Debug)]
pub enum RepositoryAccessError {
    /// No session became available within the configured bound
    #[error("No session available for workspace '{workspace}' (waited {waited:?})")]
    PoolExhausted { workspace: String, waited: Duration },

    /// The pool was shut down
    #[error("Session pool has been shut down")]
    PoolClosed,

    /// Logging in to the repository failed
    #[error("Failed to create session for workspace '{workspace}': {source}")]
    SessionCreation {
        workspace: String,
        #[source]
        source: RepositoryError,
    },

    /// Raised by the default not-found handler of the node resolution operations
    #[error("Node not found {location} in workspace '{workspace}'")]
    NodeNotFound {
        workspace: String,
        location: NodeLocation,
        #[source]
        source: Option<RepositoryError>,
    },

    /// Every other failure
    #[error("{message}")]
    Access {
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },
}

impl RepositoryAccessError {
    /// Create an access error without a cause
    pub fn access<S: Into<String>>(message: S) -> Self {
        Self::Access {
            message: message.into(),
            source: None,
        }
    }

    /// Create an access error wrapping a cause
    pub fn with_cause<S, E>(message: S, cause: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Access {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, Self::PoolExhausted { .. })
    }

    pub fn is_session_creation(&self) -> bool {
        matches!(self, Self::SessionCreation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound { .. })
    }

    /// The repository error underneath this one, if there is one
    pub fn repository_error(&self) -> Option<&RepositoryError> {
        match self {
            Self::SessionCreation { source, .. } => Some(source),
            Self::NodeNotFound { source, .. } => source.as_ref(),
            Self::Access {
                source: Some(cause),
                ..
            } => cause.downcast_ref::<RepositoryError>(),
            _ => None,
        }
    }
}

impl From<RepositoryError> for RepositoryAccessError {
    fn from(error: RepositoryError) -> Self {
        let message = error.to_string();
        Self::with_cause(message, error)
    }
}

/// Result type for access layer operations
pub type AccessResult<T> = Result<T, RepositoryAccessError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_repository_error_keeps_message_and_cause() {
        let error: RepositoryAccessError = RepositoryError::InvalidQuery("bad".into()).into();
        assert_eq!(error.to_string(), "Invalid query: bad");
        assert_eq!(
            error.repository_error(),
            Some(&RepositoryError::InvalidQuery("bad".into()))
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn test_not_found_message_names_location() {
        let error = RepositoryAccessError::NodeNotFound {
            workspace: "default".into(),
            location: NodeLocation::Path("/a/b".into()),
            source: None,
        };
        assert!(error.is_not_found());
        assert_eq!(
            error.to_string(),
            "Node not found at path /a/b in workspace 'default'"
        );
    }

    #[test]
    fn test_session_creation_exposes_source() {
        let error = RepositoryAccessError::SessionCreation {
            workspace: "default".into(),
            source: RepositoryError::NoSuchWorkspace("default".into()),
        };
        assert!(error.is_session_creation());
        assert!(!error.is_pool_exhausted());
        assert_eq!(
            error.source().map(|s| s.to_string()),
            Some("No such workspace: default".to_string())
        );
    }
}
