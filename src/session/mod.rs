// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session layer implementing the get-modify-set protocol.
//!
//! This module provides the [`Session`] type, which owns a backend handle
//! and exposes the optimistic-concurrency get/set cycle over it.

pub mod store_session;

pub use store_session::Session;
