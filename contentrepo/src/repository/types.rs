// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Repository value types and error handling
//!
//! This module defines the values exchanged with a content repository (property
//! values, query descriptors) and the error type its client API reports.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Error reported by the repository client API
///
/// These failures are internal to the access layer: the template converts
/// every one of them into a [`crate::RepositoryAccessError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Login failed for user '{user_id}': {reason}")]
    LoginFailed { user_id: String, reason: String },

    #[error("No such workspace: {0}")]
    NoSuchWorkspace(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Item already exists: {0}")]
    ItemExists(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Value format error: {0}")]
    ValueFormat(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Session is no longer live")]
    SessionClosed,

    #[error("Repository error: {0}")]
    Backend(String),
}

impl RepositoryError {
    /// True when the failure means the addressed item does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepositoryError::PathNotFound(_) | RepositoryError::ItemNotFound(_)
        )
    }
}

/// Result type for repository client operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Type tag of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Long,
    Double,
    Boolean,
    Date,
    Binary,
    Name,
    Path,
    Reference,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::String => "String",
            PropertyType::Long => "Long",
            PropertyType::Double => "Double",
            PropertyType::Boolean => "Boolean",
            PropertyType::Date => "Date",
            PropertyType::Binary => "Binary",
            PropertyType::Name => "Name",
            PropertyType::Path => "Path",
            PropertyType::Reference => "Reference",
        };
        write!(f, "{}", name)
    }
}

/// A single-valued node property
///
/// Reads convert between types the way content repositories do, so a string
/// property holding `"42"` can be read as a long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Binary(Vec<u8>),
    Name(String),
    Path(String),
    Reference(Uuid),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Long(_) => PropertyType::Long,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Date(_) => PropertyType::Date,
            PropertyValue::Binary(_) => PropertyType::Binary,
            PropertyValue::Name(_) => PropertyType::Name,
            PropertyValue::Path(_) => PropertyType::Path,
            PropertyValue::Reference(_) => PropertyType::Reference,
        }
    }

    pub fn as_string(&self) -> RepositoryResult<String> {
        match self {
            PropertyValue::String(s) | PropertyValue::Name(s) | PropertyValue::Path(s) => {
                Ok(s.clone())
            }
            PropertyValue::Long(v) => Ok(v.to_string()),
            PropertyValue::Double(v) => Ok(v.to_string()),
            PropertyValue::Boolean(v) => Ok(v.to_string()),
            PropertyValue::Date(v) => Ok(v.to_rfc3339()),
            PropertyValue::Reference(v) => Ok(v.hyphenated().to_string()),
            PropertyValue::Binary(bytes) => String::from_utf8(bytes.clone())
                .map_err(|e| RepositoryError::ValueFormat(e.to_string())),
        }
    }

    pub fn as_long(&self) -> RepositoryResult<i64> {
        match self {
            PropertyValue::Long(v) => Ok(*v),
            PropertyValue::Double(v) => Ok(*v as i64),
            PropertyValue::Date(v) => Ok(v.timestamp_millis()),
            PropertyValue::String(s) => s.trim().parse::<i64>().map_err(|e| {
                RepositoryError::ValueFormat(format!("'{}' is not a long: {}", s, e))
            }),
            _ => Err(self.conversion_error(PropertyType::Long)),
        }
    }

    pub fn as_double(&self) -> RepositoryResult<f64> {
        match self {
            PropertyValue::Double(v) => Ok(*v),
            PropertyValue::Long(v) => Ok(*v as f64),
            PropertyValue::Date(v) => Ok(v.timestamp_millis() as f64),
            PropertyValue::String(s) => s.trim().parse::<f64>().map_err(|e| {
                RepositoryError::ValueFormat(format!("'{}' is not a double: {}", s, e))
            }),
            _ => Err(self.conversion_error(PropertyType::Double)),
        }
    }

    pub fn as_boolean(&self) -> RepositoryResult<bool> {
        match self {
            PropertyValue::Boolean(v) => Ok(*v),
            PropertyValue::String(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
            _ => Err(self.conversion_error(PropertyType::Boolean)),
        }
    }

    pub fn as_date(&self) -> RepositoryResult<DateTime<Utc>> {
        match self {
            PropertyValue::Date(v) => Ok(*v),
            PropertyValue::Long(v) => Utc
                .timestamp_millis_opt(*v)
                .single()
                .ok_or_else(|| RepositoryError::ValueFormat(format!("{} is out of range", v))),
            PropertyValue::Double(v) => Utc
                .timestamp_millis_opt(*v as i64)
                .single()
                .ok_or_else(|| RepositoryError::ValueFormat(format!("{} is out of range", v))),
            PropertyValue::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| RepositoryError::ValueFormat(format!("'{}' is not a date: {}", s, e))),
            _ => Err(self.conversion_error(PropertyType::Date)),
        }
    }

    fn conversion_error(&self, to: PropertyType) -> RepositoryError {
        RepositoryError::ValueFormat(format!(
            "cannot convert {} value to {}",
            self.property_type(),
            to
        ))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Long(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::Date(value)
    }
}

/// Query languages understood by the access layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryLanguage {
    /// JCR-SQL2 textual queries
    JcrSql2,
    /// JCR-JQOM abstract query model
    JcrJqom,
}

impl std::str::FromStr for QueryLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JCR-SQL2" => Ok(QueryLanguage::JcrSql2),
            "JCR-JQOM" => Ok(QueryLanguage::JcrJqom),
            _ => Err(format!(
                "Unknown query language: {}. Valid options: JCR-SQL2, JCR-JQOM",
                s
            )),
        }
    }
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryLanguage::JcrSql2 => "JCR-SQL2",
            QueryLanguage::JcrJqom => "JCR-JQOM",
        };
        write!(f, "{}", name)
    }
}

/// A windowed query against one workspace
///
/// The window is handed to the query engine as-is; results are never fetched
/// in full and sliced afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub statement: String,
    pub language: QueryLanguage,
    pub offset: u64,
    pub limit: u64,
    /// Named bind variables (string values only)
    pub parameters: BTreeMap<String, String>,
}

impl QueryDescriptor {
    pub fn new(
        statement: impl Into<String>,
        language: QueryLanguage,
        offset: u64,
        limit: u64,
    ) -> Self {
        Self {
            statement: statement.into(),
            language,
            offset,
            limit,
            parameters: BTreeMap::new(),
        }
    }

    /// Build a descriptor from a language name such as `JCR-SQL2`
    pub fn parse(
        statement: impl Into<String>,
        language: &str,
        offset: u64,
        limit: u64,
    ) -> RepositoryResult<Self> {
        let language = language.parse().map_err(RepositoryError::InvalidQuery)?;
        Ok(Self::new(statement, language, offset, limit))
    }

    /// Bind a named string parameter
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_reads_as_long() {
        assert_eq!(PropertyValue::from("42").as_long().unwrap(), 42);
        assert!(matches!(
            PropertyValue::from("forty-two").as_long(),
            Err(RepositoryError::ValueFormat(_))
        ));
    }

    #[test]
    fn test_boolean_conversions() {
        assert!(PropertyValue::from("TRUE").as_boolean().unwrap());
        assert!(!PropertyValue::from("yes").as_boolean().unwrap());
        assert!(PropertyValue::Long(1).as_boolean().is_err());
    }

    #[test]
    fn test_date_round_trips_through_long() {
        let date = Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap();
        let millis = PropertyValue::Date(date).as_long().unwrap();
        assert_eq!(PropertyValue::Long(millis).as_date().unwrap(), date);
    }

    #[test]
    fn test_query_language_from_str() {
        assert_eq!(
            "JCR-SQL2".parse::<QueryLanguage>().unwrap(),
            QueryLanguage::JcrSql2
        );
        assert!("XPATH".parse::<QueryLanguage>().is_err());
        assert_eq!(QueryLanguage::JcrJqom.to_string(), "JCR-JQOM");
    }

    #[test]
    fn test_parse_descriptor() {
        let query = QueryDescriptor::parse("SELECT * FROM [nt:base]", "JCR-JQOM", 5, 10)
            .unwrap()
            .bind("title", "x");
        assert_eq!(query.language, QueryLanguage::JcrJqom);
        assert_eq!((query.offset, query.limit), (5, 10));
        assert_eq!(query.parameters.get("title").map(String::as_str), Some("x"));
        assert!(matches!(
            QueryDescriptor::parse("SELECT", "XPATH", 0, 1),
            Err(RepositoryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(RepositoryError::PathNotFound("/a".into()).is_not_found());
        assert!(RepositoryError::ItemNotFound("x".into()).is_not_found());
        assert!(!RepositoryError::SessionClosed.is_not_found());
    }
}
