// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Argument checks applied before a session is borrowed

use crate::error::{AccessResult, RepositoryAccessError};
use crate::repository::QueryDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;

static WORKSPACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S(?:.*\S)?$").expect("workspace pattern is valid"));

static PATH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:/|(?:/[^/]+)+)$").expect("path pattern is valid"));

static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("identifier pattern is valid")
});

fn reject(message: String) -> RepositoryAccessError {
    log::debug!("Rejected argument: {}", message);
    RepositoryAccessError::access(message)
}

/// Workspace names are non-empty and carry no surrounding whitespace
///
/// Stricter than a bare non-empty check: `" default"` is rejected rather
/// than passed to the repository as a distinct name.
pub fn workspace(name: &str) -> AccessResult<()> {
    if WORKSPACE_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(reject(format!("Invalid workspace name: '{}'", name)))
    }
}

/// Paths are absolute: `/` or `/segment[/segment...]`
pub fn path(path: &str) -> AccessResult<()> {
    if PATH_PATTERN.is_match(path) {
        Ok(())
    } else {
        Err(reject(format!("Invalid node path: '{}'", path)))
    }
}

/// Node identifiers are UUIDs in hyphenated form
pub fn identifier(id: &str) -> AccessResult<()> {
    if IDENTIFIER_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(reject(format!("Invalid node identifier: '{}'", id)))
    }
}

/// Statements are non-empty and the window holds at least one row
pub fn query(query: &QueryDescriptor) -> AccessResult<()> {
    if query.statement.trim().is_empty() {
        return Err(reject("Query statement is empty".to_string()));
    }
    if query.limit == 0 {
        return Err(reject("Query limit must be greater than zero".to_string()));
    }
    for name in query.parameters.keys() {
        if name.is_empty() {
            return Err(reject("Query parameter name is empty".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::QueryLanguage;

    #[test]
    fn test_workspace_names() {
        assert!(workspace("default").is_ok());
        assert!(workspace("my workspace").is_ok());
        assert!(workspace("").is_err());
        assert!(workspace(" default").is_err());
        assert!(workspace("default\n").is_err());
    }

    #[test]
    fn test_paths() {
        assert!(path("/").is_ok());
        assert!(path("/content/site").is_ok());
        assert!(path("content").is_err());
        assert!(path("/content/").is_err());
        assert!(path("/content//site").is_err());
        assert!(path("").is_err());
    }

    #[test]
    fn test_identifiers() {
        assert!(identifier("3f2b8c1e-0d4a-4b7e-9c2f-1a2b3c4d5e6f").is_ok());
        assert!(identifier("3F2B8C1E-0D4A-4B7E-9C2F-1A2B3C4D5E6F").is_ok());
        assert!(identifier("3f2b8c1e0d4a4b7e9c2f1a2b3c4d5e6f").is_err());
        assert!(identifier("not-an-id").is_err());
    }

    #[test]
    fn test_queries() {
        let ok = QueryDescriptor::new("SELECT * FROM [nt:base]", QueryLanguage::JcrSql2, 0, 1);
        assert!(query(&ok).is_ok());
        let empty = QueryDescriptor::new("  ", QueryLanguage::JcrSql2, 0, 1);
        assert!(query(&empty).is_err());
        let no_rows = QueryDescriptor::new("SELECT * FROM [nt:base]", QueryLanguage::JcrSql2, 0, 0);
        assert!(query(&no_rows).is_err());
    }
}
