// SPDX-License-Identifier: MIT OR Apache-2.0

//! A hierarchical configuration data model with optimistic store
//! synchronization.
//!
//! This crate provides the client-side data model of a hierarchical
//! configuration store: applications read and write configuration keys —
//! namespaced names with string or binary values and attached metadata —
//! through an ordered in-memory [`KeySet`](domain::KeySet), and reconcile
//! that collection with a backing store through a get-modify-set
//! [`Session`](session::Session) that detects concurrent conflicting
//! writers.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: Core types and business logic (`Key`, `KeySet`, the
//!   name grammar, errors)
//! - **Ports**: Trait definitions that define interfaces (`Backend`)
//! - **Adapters**: Backend implementations (shared memory store, YAML file
//!   store)
//! - **Session**: The get/set protocol layered over a backend handle
//!
//! # Concurrency model
//!
//! Keys are atomically reference-counted shared handles: one key may live in
//! several key sets and application handles at once, and a mutation through
//! one handle is visible through all of them until
//! [`Key::duplicate`](domain::Key::duplicate) deep-copies it. Sessions are
//! synchronous and
//! exclusive (`&mut self`); two independent sessions racing on the same
//! store is the expected mode of operation, and the loser of a race gets
//! [`StoreError::ConflictingState`](domain::StoreError::ConflictingState)
//! and retries its get-modify-set cycle.
//!
//! # Feature Flags
//!
//! - `yaml`: Enable the YAML file backend (default)
//!
//! # Quick Start
//!
//! ```rust
//! use cascfg::prelude::*;
//!
//! # fn main() -> cascfg::domain::Result<()> {
//! let store = MemoryStore::new();
//! let root = Key::new("user/app")?;
//!
//! let mut session = Session::open(Box::new(store.backend()), &Key::placeholder())?;
//!
//! let mut ks = KeySet::new();
//! session.get(&mut ks, &root)?;
//! ks.append_key(Key::with_text("user/app/host", "localhost")?)?;
//! session.set(&mut ks, &root)?;
//!
//! session.close(&Key::placeholder())?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod session;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for
/// convenient access.
pub mod prelude {
    pub use crate::domain::{
        common_key_name, Key, KeyName, KeySet, KeyValue, Namespace, Result, StoreError,
    };
    pub use crate::ports::{Backend, BackendStatus};
    pub use crate::session::Session;

    pub use crate::adapters::MemoryStore;
    #[cfg(feature = "yaml")]
    pub use crate::adapters::YamlFileBackend;
}
