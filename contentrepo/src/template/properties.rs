// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Typed property accessors
//!
//! Each getter comes in two forms. The plain form returns `None` when the
//! node has no such property; the `_or` form returns the caller's default.
//! Values convert between types the way the repository converts them, so a
//! string property holding `"42"` reads as long 42. Any other failure is a
//! [`RepositoryAccessError`].

use super::repository_template::RepositoryTemplate;
use crate::error::{AccessResult, RepositoryAccessError};
use crate::repository::{Node, PropertyValue, RepositoryResult, Session};
use chrono::{DateTime, Utc};

impl<S: Session + 'static> RepositoryTemplate<S> {
    pub fn has_property(&self, node: &S::Node, name: &str) -> AccessResult<bool> {
        node.has_property(name).map_err(|e| {
            RepositoryAccessError::with_cause(
                format!("Failed to check property '{}': {}", name, e),
                e,
            )
        })
    }

    pub fn get_string_property(&self, node: &S::Node, name: &str) -> AccessResult<Option<String>> {
        read_property(node, name, PropertyValue::as_string)
    }

    pub fn get_string_property_or(
        &self,
        node: &S::Node,
        name: &str,
        default: &str,
    ) -> AccessResult<String> {
        Ok(self
            .get_string_property(node, name)?
            .unwrap_or_else(|| default.to_string()))
    }

    pub fn get_long_property(&self, node: &S::Node, name: &str) -> AccessResult<Option<i64>> {
        read_property(node, name, PropertyValue::as_long)
    }

    pub fn get_long_property_or(&self, node: &S::Node, name: &str, default: i64) -> AccessResult<i64> {
        Ok(self.get_long_property(node, name)?.unwrap_or(default))
    }

    pub fn get_double_property(&self, node: &S::Node, name: &str) -> AccessResult<Option<f64>> {
        read_property(node, name, PropertyValue::as_double)
    }

    pub fn get_double_property_or(&self, node: &S::Node, name: &str, default: f64) -> AccessResult<f64> {
        Ok(self.get_double_property(node, name)?.unwrap_or(default))
    }

    pub fn get_boolean_property(&self, node: &S::Node, name: &str) -> AccessResult<Option<bool>> {
        read_property(node, name, PropertyValue::as_boolean)
    }

    pub fn get_boolean_property_or(
        &self,
        node: &S::Node,
        name: &str,
        default: bool,
    ) -> AccessResult<bool> {
        Ok(self.get_boolean_property(node, name)?.unwrap_or(default))
    }

    pub fn get_date_property(
        &self,
        node: &S::Node,
        name: &str,
    ) -> AccessResult<Option<DateTime<Utc>>> {
        read_property(node, name, PropertyValue::as_date)
    }

    pub fn get_date_property_or(
        &self,
        node: &S::Node,
        name: &str,
        default: DateTime<Utc>,
    ) -> AccessResult<DateTime<Utc>> {
        Ok(self.get_date_property(node, name)?.unwrap_or(default))
    }
}

fn read_property<N, T, F>(node: &N, name: &str, convert: F) -> AccessResult<Option<T>>
where
    N: Node,
    F: FnOnce(&PropertyValue) -> RepositoryResult<T>,
{
    let value = match node.property(name) {
        Ok(value) => value,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => {
            return Err(RepositoryAccessError::with_cause(
                format!("Failed to read property '{}': {}", name, e),
                e,
            ))
        }
    };
    convert(&value).map(Some).map_err(|e| {
        RepositoryAccessError::with_cause(
            format!("Failed to convert property '{}': {}", name, e),
            e,
        )
    })
}
