// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Background reaper for idle pooled sessions

use super::factory::KeyedSessionFactory;
use super::keyed::SessionPool;
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Periodically calls [`SessionPool::evict_idle`] on a pool
///
/// Holds only a weak reference, so the thread ends on its own once the pool
/// is dropped.
pub(crate) struct IdleEvictor {
    stop: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl IdleEvictor {
    pub(crate) fn start<F>(pool: Weak<SessionPool<F>>, interval: Duration) -> std::io::Result<Self>
    where
        F: KeyedSessionFactory + 'static,
    {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("contentrepo-evictor".to_string())
            .spawn(move || {
                let (stopped, wakeup) = &*signal;
                loop {
                    {
                        let mut stopped = stopped.lock();
                        if !*stopped {
                            wakeup.wait_for(&mut stopped, interval);
                        }
                        if *stopped {
                            break;
                        }
                    }

                    let Some(pool) = pool.upgrade() else {
                        break;
                    };
                    pool.evict_idle();
                }
                log::debug!("Idle session evictor stopped");
            })?;

        log::debug!("Idle session evictor started, interval {:?}", interval);
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it, unless called from the thread itself
    pub(crate) fn stop(mut self) {
        let (stopped, wakeup) = &*self.stop;
        *stopped.lock() = true;
        wakeup.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                log::warn!("Idle session evictor panicked");
            }
        }
    }
}
