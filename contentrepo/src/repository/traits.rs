// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Repository client traits
//!
//! The access layer consumes a content repository through these traits only.
//! A repository hands out sessions, a session addresses nodes inside one
//! workspace, and nodes carry properties and children.

use super::credentials::Credentials;
use super::types::{PropertyValue, QueryDescriptor, RepositoryResult};
use std::sync::Arc;

/// Iterator over the nodes of a query result
pub type NodeIter<'a, N> = Box<dyn Iterator<Item = RepositoryResult<N>> + 'a>;

/// An addressable entity inside a workspace
///
/// Implementations are cheap handles; cloning a node does not copy its data.
pub trait Node: Clone + Send {
    /// Name of the node within its parent (empty for the root)
    fn name(&self) -> RepositoryResult<String>;

    /// Absolute path of the node
    fn path(&self) -> RepositoryResult<String>;

    /// Repository-unique identifier
    fn identifier(&self) -> RepositoryResult<String>;

    /// Primary node type
    fn node_type(&self) -> RepositoryResult<String>;

    fn has_property(&self, name: &str) -> RepositoryResult<bool>;

    /// Read a property
    ///
    /// Fails with `PathNotFound` when the node has no such property.
    fn property(&self, name: &str) -> RepositoryResult<PropertyValue>;

    fn set_property(&self, name: &str, value: PropertyValue) -> RepositoryResult<()>;

    fn has_node(&self, name: &str) -> RepositoryResult<bool>;

    /// Get a direct child
    ///
    /// Fails with `PathNotFound` when there is no child with that name.
    fn child(&self, name: &str) -> RepositoryResult<Self>;

    /// Children in document order
    fn children(&self) -> RepositoryResult<Vec<Self>>;

    /// Add a child node
    ///
    /// Fails with `ItemExists` when the repository forbids a second child with
    /// the same name.
    fn add_node(&self, name: &str, node_type: &str) -> RepositoryResult<Self>;

    /// Remove this node and its subtree
    fn remove(&self) -> RepositoryResult<()>;
}

/// A live, authenticated connection to one workspace
///
/// Sessions are not thread safe: a session is used by one caller at a time,
/// but may be moved between threads while idle.
pub trait Session: Send + Sized {
    type Node: Node;

    fn user_id(&self) -> &str;

    fn workspace_name(&self) -> &str;

    /// Liveness probe
    fn is_live(&self) -> bool;

    /// End the session and release its server-side resources
    fn logout(&mut self) -> RepositoryResult<()>;

    /// Derive a session for another user from this one
    fn impersonate(&self, credentials: &Credentials) -> RepositoryResult<Self>;

    /// Root node of the workspace, if the repository exposes one
    fn root_node(&self) -> RepositoryResult<Option<Self::Node>>;

    /// Resolve a node by absolute path
    fn node(&self, path: &str) -> RepositoryResult<Self::Node>;

    /// Resolve a node by its repository-unique identifier
    fn node_by_identifier(&self, id: &str) -> RepositoryResult<Self::Node>;

    /// Execute a windowed query
    ///
    /// The engine applies `offset` and `limit` itself.
    fn execute_query(&self, query: &QueryDescriptor) -> RepositoryResult<NodeIter<'_, Self::Node>>;

    /// Persist pending changes
    fn save(&self) -> RepositoryResult<()>;

    /// Reload state from the repository, optionally keeping pending changes
    fn refresh(&self, keep_changes: bool) -> RepositoryResult<()>;
}

/// Handle to a content repository
pub trait Repository: Send + Sync {
    type Session: Session + 'static;

    /// Log in to the named workspace
    fn login(&self, credentials: &Credentials, workspace: &str) -> RepositoryResult<Self::Session>;
}

/// Supplies the repository handle used by the session factories
pub trait RepositoryProvider: Send + Sync {
    type Repository: Repository;

    fn repository(&self) -> Arc<Self::Repository>;
}

impl<R: Repository> RepositoryProvider for Arc<R> {
    type Repository = R;

    fn repository(&self) -> Arc<R> {
        self.clone()
    }
}
