// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Three-way outcome handling for node resolution
//!
//! A lookup ends in one of three outcomes and exactly one handler runs:
//!
//! | Outcome   | Handler      | Default                                   |
//! |-----------|--------------|-------------------------------------------|
//! | found     | `found`      | (required)                                |
//! | not found | `not_found`  | `RepositoryAccessError::NodeNotFound`     |
//! | error     | `error`      | the error, converted to an access error   |
//!
//! Only the lookup is classified. Errors returned by the `found` handler
//! itself go straight back to the caller.

use crate::error::{AccessResult, NodeLocation, RepositoryAccessError};
use crate::repository::{RepositoryError, RepositoryResult, Session};

type FoundHandler<'a, S, T> = Box<dyn FnOnce(&S, &<S as Session>::Node) -> AccessResult<T> + 'a>;
type NotFoundHandler<'a, S, T> = Box<dyn FnOnce(&S) -> AccessResult<T> + 'a>;
type ErrorHandler<'a, S, T> = Box<dyn FnOnce(&S, RepositoryError) -> AccessResult<T> + 'a>;

/// Handlers for the outcomes of a node lookup
pub struct NodeHandlers<'a, S: Session, T> {
    found: FoundHandler<'a, S, T>,
    not_found: Option<NotFoundHandler<'a, S, T>>,
    error: Option<ErrorHandler<'a, S, T>>,
}

impl<'a, S: Session, T> NodeHandlers<'a, S, T> {
    pub fn new<F>(found: F) -> Self
    where
        F: FnOnce(&S, &S::Node) -> AccessResult<T> + 'a,
    {
        Self {
            found: Box::new(found),
            not_found: None,
            error: None,
        }
    }

    /// Handle a missing node instead of failing with `NodeNotFound`
    pub fn on_not_found<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(&S) -> AccessResult<T> + 'a,
    {
        self.not_found = Some(Box::new(handler));
        self
    }

    /// Handle any other lookup failure
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(&S, RepositoryError) -> AccessResult<T> + 'a,
    {
        self.error = Some(Box::new(handler));
        self
    }

    pub(crate) fn dispatch(
        self,
        session: &S,
        lookup: RepositoryResult<S::Node>,
        workspace: &str,
        location: NodeLocation,
    ) -> AccessResult<T> {
        match lookup {
            Ok(node) => (self.found)(session, &node),
            Err(e) if e.is_not_found() => match self.not_found {
                Some(handler) => handler(session),
                None => Err(RepositoryAccessError::NodeNotFound {
                    workspace: workspace.to_string(),
                    location,
                    source: Some(e),
                }),
            },
            Err(e) => match self.error {
                Some(handler) => handler(session, e),
                None => Err(e.into()),
            },
        }
    }
}
