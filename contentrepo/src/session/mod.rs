// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session factories
//!
//! The template obtains sessions through the [`SessionFactory`] trait, which
//! has two implementations with the same contract and different resource
//! policies:
//!
//! - [`PooledSessionFactory`]: borrows from a keyed [`SessionPool`](crate::pool::SessionPool)
//! - [`SimpleSessionFactory`]: logs in and out for every call
//!
//! [`SessionMode`] selects between them when the factory is built from
//! configuration.

pub mod factory;
pub mod mode;
pub mod pooled;
pub mod simple;

pub use factory::SessionFactory;
pub use mode::SessionMode;
pub use pooled::PooledSessionFactory;
pub use simple::SimpleSessionFactory;
