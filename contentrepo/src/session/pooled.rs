// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session factory backed by a keyed session pool

use super::factory::SessionFactory;
use crate::error::AccessResult;
use crate::pool::{KeyedSessionFactory, SessionPool};
use std::sync::Arc;

/// Borrows sessions from a [`SessionPool`] and returns them to it
pub struct PooledSessionFactory<F: KeyedSessionFactory> {
    pool: Arc<SessionPool<F>>,
    prewarm_workspaces: Vec<String>,
}

impl<F: KeyedSessionFactory> PooledSessionFactory<F> {
    pub fn new(pool: Arc<SessionPool<F>>) -> Self {
        Self {
            pool,
            prewarm_workspaces: Vec::new(),
        }
    }

    /// Workspaces whose idle sessions `init` creates ahead of the first request
    pub fn with_prewarm_workspaces<I, S>(mut self, workspaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prewarm_workspaces = workspaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn pool(&self) -> &Arc<SessionPool<F>> {
        &self.pool
    }
}

impl<F: KeyedSessionFactory> SessionFactory for PooledSessionFactory<F> {
    type Session = F::Session;

    fn get_session(&self, workspace: &str) -> AccessResult<Self::Session> {
        self.pool.borrow(workspace)
    }

    fn release_session(&self, workspace: &str, session: Self::Session) -> AccessResult<()> {
        self.pool.release(workspace, session)
    }

    fn init(&self) -> AccessResult<()> {
        for workspace in &self.prewarm_workspaces {
            let created = self.pool.prepare(workspace)?;
            log::info!(
                "Prewarmed {} sessions for workspace '{}'",
                created,
                workspace
            );
        }
        Ok(())
    }

    fn shutdown(&self) -> AccessResult<()> {
        self.pool.shutdown()
    }
}
