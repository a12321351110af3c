//! Session factory and credentials doubles

use contentrepo::repository::{Credentials, CredentialsProvider};
use contentrepo::{AccessResult, MemorySession, SessionFactory};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Delegates to another factory and counts the calls that reach it
pub struct SpySessionFactory {
    inner: Arc<dyn SessionFactory<Session = MemorySession>>,
    gets: AtomicUsize,
    failed_gets: AtomicUsize,
    releases: AtomicUsize,
    workspaces: Mutex<Vec<String>>,
}

impl SpySessionFactory {
    pub fn new(inner: Arc<dyn SessionFactory<Session = MemorySession>>) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            failed_gets: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            workspaces: Mutex::new(Vec::new()),
        }
    }

    /// Sessions successfully handed out
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn failed_gets(&self) -> usize {
        self.failed_gets.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Workspaces of released sessions, in release order
    pub fn released_workspaces(&self) -> Vec<String> {
        self.workspaces.lock().clone()
    }
}

impl SessionFactory for SpySessionFactory {
    type Session = MemorySession;

    fn get_session(&self, workspace: &str) -> AccessResult<MemorySession> {
        match self.inner.get_session(workspace) {
            Ok(session) => {
                self.gets.fetch_add(1, Ordering::SeqCst);
                Ok(session)
            }
            Err(e) => {
                self.failed_gets.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn release_session(&self, workspace: &str, session: MemorySession) -> AccessResult<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.workspaces.lock().push(workspace.to_string());
        self.inner.release_session(workspace, session)
    }

    fn init(&self) -> AccessResult<()> {
        self.inner.init()
    }

    fn shutdown(&self) -> AccessResult<()> {
        self.inner.shutdown()
    }
}

/// Fixed global identity and a user identity that can be switched on and off
pub struct SwitchableCredentialsProvider {
    global: Credentials,
    user: Mutex<Option<Credentials>>,
}

impl SwitchableCredentialsProvider {
    pub fn new(global: Credentials) -> Self {
        Self {
            global,
            user: Mutex::new(None),
        }
    }

    pub fn set_user(&self, user: Option<Credentials>) {
        *self.user.lock() = user;
    }
}

impl CredentialsProvider for SwitchableCredentialsProvider {
    fn global_credentials(&self) -> Credentials {
        self.global.clone()
    }

    fn user_credentials(&self) -> Option<Credentials> {
        self.user.lock().clone()
    }
}
