// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Keyed session pool
//!
//! Sessions are pooled per workspace. A borrowed session is owned by the
//! caller until it is released or invalidated; an idle session sits in the
//! pool. The per-workspace idle sets and active counts are the only shared
//! state and live behind one mutex, so two callers never receive the same
//! idle session.
//!
//! ```text
//! CREATED ──► ACTIVE ──release──► IDLE ──borrow──► ACTIVE
//!               │                  │
//!               └──invalidate──►  DESTROYED ◄──evict / failed validation / shutdown
//! ```

use super::config::{ExhaustedAction, PoolConfig};
use super::evictor::IdleEvictor;
use super::factory::KeyedSessionFactory;
use crate::error::{AccessResult, RepositoryAccessError};
use crate::repository::Session;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

/// Counters for one workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub workspace: String,
    pub active: usize,
    pub idle: usize,
}

struct IdleSession<S> {
    session: S,
    idle_since: Instant,
}

struct WorkspaceSessions<S> {
    /// Oldest at the front; borrowers take from the back
    idle: VecDeque<IdleSession<S>>,
    /// Borrowed sessions plus sessions being created
    active: usize,
}

impl<S> Default for WorkspaceSessions<S> {
    fn default() -> Self {
        Self {
            idle: VecDeque::new(),
            active: 0,
        }
    }
}

struct PoolState<S> {
    workspaces: HashMap<String, WorkspaceSessions<S>>,
    closed: bool,
}

impl<S> PoolState<S> {
    fn total_active(&self) -> usize {
        self.workspaces.values().map(|w| w.active).sum()
    }
}

/// Bounded pool of repository sessions keyed by workspace name
pub struct SessionPool<F: KeyedSessionFactory> {
    factory: F,
    config: PoolConfig,
    state: Mutex<PoolState<F::Session>>,
    /// Signalled whenever a slot frees up or the pool closes
    released: Condvar,
    evictor: Mutex<Option<IdleEvictor>>,
}

impl<F: KeyedSessionFactory + 'static> SessionPool<F> {
    /// Create a pool, starting the idle evictor if the configuration asks for one
    pub fn new(factory: F, config: PoolConfig) -> AccessResult<Arc<Self>> {
        config
            .validate()
            .map_err(|e| RepositoryAccessError::access(format!("Invalid pool configuration: {}", e)))?;

        let pool = Arc::new(Self {
            factory,
            config,
            state: Mutex::new(PoolState {
                workspaces: HashMap::new(),
                closed: false,
            }),
            released: Condvar::new(),
            evictor: Mutex::new(None),
        });

        if let Some(interval) = pool.config.eviction_interval {
            let evictor = IdleEvictor::start(Arc::downgrade(&pool), interval).map_err(|e| {
                RepositoryAccessError::with_cause("Failed to start the idle session evictor", e)
            })?;
            *pool.evictor.lock() = Some(evictor);
        }

        Ok(pool)
    }
}

impl<F: KeyedSessionFactory> SessionPool<F> {
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Borrow a session for the workspace
    ///
    /// Hands out an idle session that passes validation and has not outlived
    /// `idle_timeout`, otherwise creates one
    /// while the workspace is below `max_sessions_per_workspace`. At the bound
    /// the call blocks or fails according to `exhausted_action`.
    pub fn borrow(&self, workspace: &str) -> AccessResult<F::Session> {
        let started = Instant::now();
        let deadline = self.config.borrow_timeout.map(|timeout| started + timeout);
        let mut timed_out = false;

        loop {
            let mut state = self.state.lock();
            if state.closed {
                return Err(RepositoryAccessError::PoolClosed);
            }

            let sessions = state.workspaces.entry(workspace.to_string()).or_default();

            if let Some(idle) = sessions.idle.pop_back() {
                sessions.active += 1;
                drop(state);
                if self.is_expired(&idle) {
                    log::debug!(
                        "Idle session for workspace '{}' exceeded the idle timeout, destroying it",
                        workspace
                    );
                    self.factory.destroy(workspace, idle.session);
                    self.free_slot(workspace);
                    continue;
                }
                match self.prepare_idle(workspace, idle.session) {
                    Some(session) => return Ok(session),
                    None => {
                        self.free_slot(workspace);
                        continue;
                    }
                }
            }

            if sessions.active < self.config.max_sessions_per_workspace {
                sessions.active += 1;
                drop(state);
                return match self.factory.create(workspace) {
                    Ok(session) => Ok(session),
                    Err(e) => {
                        self.free_slot(workspace);
                        Err(e)
                    }
                };
            }

            if self.config.exhausted_action == ExhaustedAction::Fail || timed_out {
                return Err(RepositoryAccessError::PoolExhausted {
                    workspace: workspace.to_string(),
                    waited: started.elapsed(),
                });
            }

            log::debug!(
                "Workspace '{}' has {} active sessions, waiting for a release",
                workspace,
                self.config.max_sessions_per_workspace
            );
            match deadline {
                Some(deadline) => {
                    timed_out = self.released.wait_until(&mut state, deadline).timed_out();
                }
                None => self.released.wait(&mut state),
            }
        }
    }

    /// Return a borrowed session to the pool
    ///
    /// The session is passivated and kept idle, or destroyed when it fails
    /// validation, the idle set is full, or the pool has been shut down.
    ///
    /// A session bound to another workspace, or released to a workspace with
    /// nothing borrowed, is destroyed and reported as an error. Sessions are
    /// not tracked individually, so a session logged in outside the pool for
    /// the same workspace is accepted while that workspace has borrowed
    /// sessions; callers must only release what they borrowed.
    pub fn release(&self, workspace: &str, session: F::Session) -> AccessResult<()> {
        if session.workspace_name() != workspace {
            let actual = session.workspace_name().to_string();
            self.factory.destroy(workspace, session);
            return Err(RepositoryAccessError::access(format!(
                "Session for workspace '{}' cannot be released to workspace '{}'",
                actual, workspace
            )));
        }

        let mut reusable = true;
        if self.config.test_on_return && !self.factory.validate(workspace, &session) {
            log::debug!("Session returned to workspace '{}' failed validation", workspace);
            reusable = false;
        }
        if reusable {
            if let Err(e) = self.factory.passivate(workspace, &session) {
                log::warn!("Failed to passivate session for workspace '{}': {}", workspace, e);
                reusable = false;
            }
        }

        let mut state = self.state.lock();
        let closed = state.closed;
        let max_idle = self.config.max_idle_per_workspace;
        let sessions = match state.workspaces.get_mut(workspace) {
            Some(sessions) if sessions.active > 0 => sessions,
            _ => {
                drop(state);
                self.factory.destroy(workspace, session);
                return Err(RepositoryAccessError::access(format!(
                    "Session for workspace '{}' was not borrowed from this pool",
                    workspace
                )));
            }
        };
        sessions.active -= 1;

        let discard = if reusable && !closed && sessions.idle.len() < max_idle {
            sessions.idle.push_back(IdleSession {
                session,
                idle_since: Instant::now(),
            });
            None
        } else {
            Some(session)
        };
        drop(state);
        self.released.notify_all();

        if let Some(session) = discard {
            self.factory.destroy(workspace, session);
        }
        Ok(())
    }

    /// Destroy a borrowed session instead of returning it
    pub fn invalidate(&self, workspace: &str, session: F::Session) {
        self.factory.destroy(workspace, session);
        self.free_slot(workspace);
    }

    /// Create idle sessions until the workspace holds `min_idle_per_workspace`
    ///
    /// Returns the number of sessions created.
    pub fn prepare(&self, workspace: &str) -> AccessResult<usize> {
        let mut created = 0;
        loop {
            {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(RepositoryAccessError::PoolClosed);
                }
                let sessions = state.workspaces.entry(workspace.to_string()).or_default();
                if sessions.idle.len() >= self.config.min_idle_per_workspace
                    || sessions.idle.len() + sessions.active >= self.config.max_sessions_per_workspace
                {
                    break;
                }
                sessions.active += 1;
            }

            let session = match self.factory.create(workspace) {
                Ok(session) => session,
                Err(e) => {
                    self.free_slot(workspace);
                    return Err(e);
                }
            };

            let mut state = self.state.lock();
            let closed = state.closed;
            let sessions = state.workspaces.entry(workspace.to_string()).or_default();
            sessions.active = sessions.active.saturating_sub(1);
            if closed {
                drop(state);
                self.released.notify_all();
                self.factory.destroy(workspace, session);
                return Err(RepositoryAccessError::PoolClosed);
            }
            sessions.idle.push_back(IdleSession {
                session,
                idle_since: Instant::now(),
            });
            created += 1;
            drop(state);
            self.released.notify_all();
        }

        if created > 0 {
            log::debug!("Prepared {} idle sessions for workspace '{}'", created, workspace);
        }
        Ok(created)
    }

    /// Destroy idle sessions that have been idle longer than `idle_timeout`
    ///
    /// Keeps `min_idle_per_workspace` sessions per workspace. Returns the
    /// number of sessions destroyed.
    pub fn evict_idle(&self) -> usize {
        let Some(idle_timeout) = self.config.idle_timeout else {
            return 0;
        };
        let now = Instant::now();
        let mut expired = Vec::new();
        {
            let mut state = self.state.lock();
            for (workspace, sessions) in state.workspaces.iter_mut() {
                while sessions.idle.len() > self.config.min_idle_per_workspace {
                    let stale = sessions
                        .idle
                        .front()
                        .map(|oldest| now.duration_since(oldest.idle_since) >= idle_timeout)
                        .unwrap_or(false);
                    if !stale {
                        break;
                    }
                    if let Some(oldest) = sessions.idle.pop_front() {
                        expired.push((workspace.clone(), oldest.session));
                    }
                }
            }
        }

        let count = expired.len();
        for (workspace, session) in expired {
            self.factory.destroy(&workspace, session);
        }
        if count > 0 {
            log::debug!("Evicted {} idle sessions", count);
        }
        count
    }

    pub fn num_active(&self, workspace: &str) -> usize {
        self.state
            .lock()
            .workspaces
            .get(workspace)
            .map(|sessions| sessions.active)
            .unwrap_or(0)
    }

    pub fn num_idle(&self, workspace: &str) -> usize {
        self.state
            .lock()
            .workspaces
            .get(workspace)
            .map(|sessions| sessions.idle.len())
            .unwrap_or(0)
    }

    /// Per-workspace counters, ordered by workspace name
    pub fn stats(&self) -> Vec<PoolStats> {
        let state = self.state.lock();
        let mut stats: Vec<PoolStats> = state
            .workspaces
            .iter()
            .map(|(workspace, sessions)| PoolStats {
                workspace: workspace.clone(),
                active: sessions.active,
                idle: sessions.idle.len(),
            })
            .collect();
        stats.sort_by(|a, b| a.workspace.cmp(&b.workspace));
        stats
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Shut the pool down
    ///
    /// Destroys every idle session and makes later borrows fail. Sessions
    /// still borrowed are destroyed when they are released; with a
    /// `shutdown_timeout` the call waits that long for them. Calling it again
    /// does nothing.
    pub fn shutdown(&self) -> AccessResult<()> {
        if !self.close() {
            return Ok(());
        }

        if let Some(timeout) = self.config.shutdown_timeout {
            let deadline = Instant::now() + timeout;
            let mut state = self.state.lock();
            while state.total_active() > 0 {
                if self.released.wait_until(&mut state, deadline).timed_out() {
                    log::warn!(
                        "Session pool shut down with {} sessions still borrowed",
                        state.total_active()
                    );
                    break;
                }
            }
        }

        log::info!("Session pool shut down");
        Ok(())
    }

    /// Mark the pool closed and destroy idle sessions; false if it was already closed
    fn close(&self) -> bool {
        let idle = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
            Self::drain_idle(&mut state)
        };
        self.released.notify_all();

        if let Some(evictor) = self.evictor.lock().take() {
            evictor.stop();
        }

        let count = idle.len();
        for (workspace, session) in idle {
            self.factory.destroy(&workspace, session);
        }
        log::debug!("Destroyed {} idle sessions on close", count);
        true
    }

    fn drain_idle(state: &mut MutexGuard<'_, PoolState<F::Session>>) -> Vec<(String, F::Session)> {
        let mut drained = Vec::new();
        for (workspace, sessions) in state.workspaces.iter_mut() {
            drained.extend(
                sessions
                    .idle
                    .drain(..)
                    .map(|idle| (workspace.clone(), idle.session)),
            );
        }
        drained
    }

    fn is_expired(&self, idle: &IdleSession<F::Session>) -> bool {
        self.config
            .idle_timeout
            .map(|timeout| idle.idle_since.elapsed() >= timeout)
            .unwrap_or(false)
    }

    fn prepare_idle(&self, workspace: &str, session: F::Session) -> Option<F::Session> {
        if self.config.test_on_borrow && !self.factory.validate(workspace, &session) {
            log::debug!(
                "Idle session for workspace '{}' failed validation, destroying it",
                workspace
            );
            self.factory.destroy(workspace, session);
            return None;
        }
        if let Err(e) = self.factory.activate(workspace, &session) {
            log::warn!("Failed to activate session for workspace '{}': {}", workspace, e);
            self.factory.destroy(workspace, session);
            return None;
        }
        Some(session)
    }

    fn free_slot(&self, workspace: &str) {
        {
            let mut state = self.state.lock();
            if let Some(sessions) = state.workspaces.get_mut(workspace) {
                sessions.active = sessions.active.saturating_sub(1);
            }
        }
        self.released.notify_all();
    }
}

impl<F: KeyedSessionFactory> Drop for SessionPool<F> {
    fn drop(&mut self) {
        self.close();
    }
}
