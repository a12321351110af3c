// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session factory abstraction
//!
//! This trait is the seam between the template and the resource policy
//! behind it:
//! - PooledSessionFactory: borrows from a keyed pool and returns sessions to it
//! - SimpleSessionFactory: logs in on every request and out on every release

use crate::error::AccessResult;
use crate::repository::Session;

/// Hands out sessions keyed by workspace name and takes them back
///
/// Every session obtained from `get_session` must be passed to
/// `release_session` with the same workspace exactly once.
pub trait SessionFactory: Send + Sync {
    type Session: Session + 'static;

    /// Obtain a session for the workspace
    ///
    /// # Returns
    /// * `Ok(session)` - A live session the caller owns until release
    /// * `Err(PoolExhausted | PoolClosed | SessionCreation)` - No session could be obtained
    fn get_session(&self, workspace: &str) -> AccessResult<Self::Session>;

    /// Give a session back
    fn release_session(&self, workspace: &str, session: Self::Session) -> AccessResult<()>;

    /// Prepare the factory for use; called once by the owning process
    fn init(&self) -> AccessResult<()> {
        Ok(())
    }

    /// Release every resource held by the factory; called once at teardown
    fn shutdown(&self) -> AccessResult<()> {
        Ok(())
    }
}
