// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Content repository client abstraction
//!
//! The access layer talks to a hierarchical, session-oriented content
//! repository through the traits in this module. Any backend that can log in
//! to a named workspace, resolve nodes and run windowed queries can sit
//! underneath it.
//!
//! # Architecture
//!
//! ```text
//! RepositoryTemplate (callbacks, error translation)
//!     ↓
//! SessionFactory (pooled | simple)
//!     ↓
//! Repository / Session / Node traits
//!     ↓
//! Concrete backends (MemoryRepository, ...)
//! ```

pub mod credentials;
pub mod memory;
pub mod traits;
pub mod types;

pub use credentials::{Credentials, CredentialsProvider, StaticCredentialsProvider};
pub use memory::{MemoryNode, MemoryRepository, MemorySession, MemoryStats};
pub use traits::{Node, NodeIter, Repository, RepositoryProvider, Session};
pub use types::{
    PropertyType, PropertyValue, QueryDescriptor, QueryLanguage, RepositoryError,
    RepositoryResult,
};
