// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Keyed session pooling
//!
//! [`SessionPool`] bounds the number of live sessions per workspace and
//! reuses idle ones. The lifecycle of every pooled session (create, validate,
//! passivate, destroy) is delegated to a [`KeyedSessionFactory`];
//! [`LoginSessionFactory`] is the implementation that logs in with the global
//! credentials.

pub mod config;
mod evictor;
pub mod factory;
pub mod keyed;

pub use config::{ExhaustedAction, PoolConfig};
pub use factory::{KeyedSessionFactory, LoginSessionFactory};
pub use keyed::{PoolStats, SessionPool};
