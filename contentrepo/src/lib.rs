// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! contentrepo - Pooled access to hierarchical content repositories
//!
//! contentrepo sits between application code and a session-oriented content
//! repository. It keeps a bounded pool of sessions per workspace, substitutes
//! the current user's identity onto pooled sessions, and runs callbacks with
//! guaranteed session release.
//!
//! # Features
//!
//! - **Keyed Session Pool**: Per-workspace bounds, block-with-timeout or
//!   fail-fast on exhaustion, validate-before-reuse, idle eviction
//! - **Impersonation**: Per-call user identity layered on a pooled session
//! - **Three-way Node Resolution**: Separate found / not-found / error handlers
//! - **Windowed Queries**: Offset and limit handed to the query engine
//! - **One Error Type**: Every failure is a [`RepositoryAccessError`]
//!
//! # Usage
//!
//! ```rust,no_run
//! use contentrepo::{create_template, Credentials, MemoryRepository, RepositoryConfig};
//! use contentrepo::repository::{Node, StaticCredentialsProvider};
//! use std::sync::Arc;
//!
//! let repository = MemoryRepository::new()
//!     .with_workspace("default")
//!     .with_account("system", "system");
//! let credentials = Arc::new(StaticCredentialsProvider::new(Credentials::new("system", "system")));
//!
//! let template = create_template(&RepositoryConfig::default(), Arc::new(repository), credentials)?;
//! template.init()?;
//! let path = template.with_root("default", |_, root| Ok(root.path()?))?;
//! template.shutdown()?;
//! # Ok::<(), contentrepo::RepositoryAccessError>(())
//! ```

pub mod config;
pub mod error;
pub mod pool;
pub mod repository;
pub mod session;
pub mod template;

pub use config::{create_session_factory, create_template, ConfigError, RepositoryConfig};
pub use error::{AccessResult, NodeLocation, RepositoryAccessError};
pub use pool::{ExhaustedAction, KeyedSessionFactory, LoginSessionFactory, PoolConfig, PoolStats, SessionPool};
pub use repository::{
    Credentials, CredentialsProvider, MemoryNode, MemoryRepository, MemorySession,
    QueryDescriptor, QueryLanguage, RepositoryError,
};
pub use session::{PooledSessionFactory, SessionFactory, SessionMode, SimpleSessionFactory};
pub use template::{NodeHandlers, RepositoryTemplate};

/// contentrepo version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// contentrepo crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
