// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Repository template
//!
//! [`RepositoryTemplate`] is the entry point callers use. It pairs every
//! session it obtains with a release, impersonates the current user when one
//! is known, and returns [`RepositoryAccessError`](crate::RepositoryAccessError)
//! for every failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use contentrepo::{RepositoryTemplate, MemorySession};
//! use contentrepo::repository::Node;
//!
//! fn titles(template: &RepositoryTemplate<MemorySession>) -> contentrepo::AccessResult<Vec<String>> {
//!     template.with_node_path("default", "/content", |_, content| {
//!         let mut titles = Vec::new();
//!         for child in content.children()? {
//!             titles.push(template.get_string_property_or(&child, "title", "untitled")?);
//!         }
//!         Ok(titles)
//!     })
//! }
//! ```

pub mod handlers;
pub mod properties;
pub mod repository_template;
pub mod validation;

pub use handlers::NodeHandlers;
pub use repository_template::{RepositoryTemplate, ROOT_NODE_UNAVAILABLE};
