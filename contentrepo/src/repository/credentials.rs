// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Identities used to log in to the repository
//!
//! Two roles exist: the global identity used to create pooled sessions, and an
//! optional per-call user identity that is impersonated on top of a pooled
//! session for the duration of one template call.

use std::collections::BTreeMap;
use std::fmt;

/// User id / password credentials with optional attributes
#[derive(Clone)]
pub struct Credentials {
    user_id: String,
    password: String,
    attributes: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

// The password never reaches logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id
            && self.password == other.password
            && self.attributes == other.attributes
    }
}

impl Eq for Credentials {}

/// Supplies the identities used by the session factories and the template
pub trait CredentialsProvider: Send + Sync {
    /// Application wide credentials used to create sessions
    fn global_credentials(&self) -> Credentials;

    /// Credentials of the current end user, if there is one
    ///
    /// When present, the template impersonates this user on top of the
    /// session it borrowed with the global credentials.
    fn user_credentials(&self) -> Option<Credentials>;
}

/// Credentials provider with fixed identities
#[derive(Debug, Clone)]
pub struct StaticCredentialsProvider {
    global: Credentials,
    user: Option<Credentials>,
}

impl StaticCredentialsProvider {
    pub fn new(global: Credentials) -> Self {
        Self { global, user: None }
    }

    pub fn with_user(mut self, user: Credentials) -> Self {
        self.user = Some(user);
        self
    }
}

impl CredentialsProvider for StaticCredentialsProvider {
    fn global_credentials(&self) -> Credentials {
        self.global.clone()
    }

    fn user_credentials(&self) -> Option<Credentials> {
        self.user.clone()
    }
}
