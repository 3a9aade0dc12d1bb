// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend trait definition.
//!
//! This module defines the `Backend` trait, the port a storage engine must
//! implement to back a [`Session`](crate::session::Session). The core only
//! needs three things from a backend: fetch the subtree under a root key into
//! a key set, persist a key set's subtree back, and report structured errors
//! as metadata attached to the parent key of the failing call.

use crate::domain::{Key, KeySet};

pub use crate::domain::errors::{ERROR_DESCRIPTION_META, ERROR_NUMBER_META};

/// Outcome of a backend call.
///
/// The tri-state mirrors the classic storage ABI: the call changed something,
/// changed nothing, or failed. On [`BackendStatus::Failed`] the backend must
/// have attached error metadata to the parent key (see [`report_error`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum BackendStatus {
    /// The call succeeded and changed the key set (get) or the store (set).
    Updated,
    /// The call succeeded without changing anything.
    Unchanged,
    /// The call failed; error metadata is on the parent key.
    Failed,
}

impl BackendStatus {
    /// Whether the call failed.
    pub fn failed(&self) -> bool {
        matches!(self, BackendStatus::Failed)
    }

    /// Whether the call succeeded and changed something.
    pub fn updated(&self) -> bool {
        matches!(self, BackendStatus::Updated)
    }
}

/// A trait for configuration store backends.
///
/// A backend is one session's handle onto a store. Independent handles onto
/// the same store race by design: each handle remembers the store state it
/// last observed in `get`, and `set` must fail with the conflict code
/// (`C02000`) when the store advanced past that observation.
///
/// # Error reporting
///
/// Backends never return Rust errors. A failing call attaches a six-character
/// code under [`ERROR_NUMBER_META`] and a description under
/// [`ERROR_DESCRIPTION_META`] to the parent key — [`report_error`] does both —
/// and returns [`BackendStatus::Failed`]. The session maps the metadata onto
/// the typed error taxonomy.
///
/// # Thread safety
///
/// Implementations must be `Send` so a session can move across threads. A
/// single handle is never called concurrently; the session takes `&mut self`.
///
/// # Examples
///
/// ```rust
/// use cascfg::domain::{Key, KeySet};
/// use cascfg::ports::{Backend, BackendStatus};
///
/// /// A backend for a store that is always empty and discards writes.
/// struct NullBackend;
///
/// impl Backend for NullBackend {
///     fn name(&self) -> &str {
///         "null"
///     }
///
///     fn open(&mut self, _parent: &Key) -> BackendStatus {
///         BackendStatus::Unchanged
///     }
///
///     fn get(&mut self, _key_set: &mut KeySet, _parent: &Key) -> BackendStatus {
///         BackendStatus::Unchanged
///     }
///
///     fn set(&mut self, _key_set: &mut KeySet, _parent: &Key) -> BackendStatus {
///         BackendStatus::Updated
///     }
///
///     fn close(&mut self, _parent: &Key) -> BackendStatus {
///         BackendStatus::Unchanged
///     }
/// }
/// ```
pub trait Backend: Send {
    /// Returns the name of this backend, used for logging and diagnostics.
    fn name(&self) -> &str;

    /// Connects the handle to the store.
    ///
    /// `parent` is usually the root placeholder; it carries error metadata on
    /// failure. Called exactly once, before any other call.
    fn open(&mut self, parent: &Key) -> BackendStatus;

    /// Merges the store's subtree under `parent` into `key_set`.
    ///
    /// Keys outside the subtree are left untouched; same-name local keys are
    /// overwritten. The handle records the observed store state for the
    /// conflict check of a later [`Backend::set`].
    fn get(&mut self, key_set: &mut KeySet, parent: &Key) -> BackendStatus;

    /// Persists `key_set`'s subtree under `parent` to the store.
    ///
    /// The stored subtree is replaced: keys absent from `key_set` are deleted
    /// from the store. Must fail with the conflict code when the store's
    /// state under `parent` advanced since this handle's last `get`.
    fn set(&mut self, key_set: &mut KeySet, parent: &Key) -> BackendStatus;

    /// Releases the handle. No other call may follow.
    fn close(&mut self, parent: &Key) -> BackendStatus;
}

/// Attaches error code and description metadata to `parent`.
///
/// This is the reporting half of the backend wire contract; the session reads
/// the metadata back through
/// [`StoreError::from_error_key`](crate::domain::StoreError::from_error_key).
pub fn report_error(parent: &Key, code: &str, description: &str) {
    let _ = parent.set_meta(ERROR_NUMBER_META, code);
    let _ = parent.set_meta(ERROR_DESCRIPTION_META, description);
}

/// Removes any error metadata left on `parent` by an earlier call.
pub fn clear_error(parent: &Key) {
    let _ = parent.remove_meta(ERROR_NUMBER_META);
    let _ = parent.remove_meta(ERROR_DESCRIPTION_META);
}
