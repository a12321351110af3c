//! Test utilities for contentrepo integration tests
//!
//! - SpySessionFactory: counts get/release pairs around any session factory
//! - SwitchableCredentialsProvider: global identity plus a user identity tests can change
//! - TestFixture: memory repository, template and spy wired together

#![allow(dead_code)]

pub mod fixture;
pub mod spy_factory;

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
