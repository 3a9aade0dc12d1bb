// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session: one open connection to a backing store.
//!
//! A [`Session`] owns a backend handle and layers the typed error taxonomy
//! and the get-modify-set discipline on top of it. The lifecycle is enforced
//! by the type system: [`Session::open`] is the only constructor, and
//! [`Session::close`] consumes the session, so a closed session cannot be
//! called again.
//!
//! All calls are synchronous and may block on backend I/O. One session is
//! never usable from two threads at once (every call takes `&mut self`);
//! independent sessions onto the same store race by design and resolve their
//! races through [`StoreError::ConflictingState`] retries.

use crate::adapters::{VERSION_KEY, VERSION_ROOT};
use crate::domain::{Key, KeySet, Result, StoreError};
use crate::ports::{clear_error, Backend, BackendStatus};

/// One open connection to a backing configuration store.
///
/// A session caches no configuration state between calls: every [`Session::get`]
/// and [`Session::set`] goes to the backend, which is also where conflicting
/// concurrent writers are detected.
///
/// # Examples
///
/// ```rust
/// use cascfg::adapters::MemoryStore;
/// use cascfg::domain::{Key, KeySet};
/// use cascfg::session::Session;
///
/// # fn main() -> cascfg::domain::Result<()> {
/// let store = MemoryStore::new();
/// let root = Key::new("user/app")?;
///
/// let mut session = Session::open(Box::new(store.backend()), &Key::placeholder())?;
///
/// let mut ks = KeySet::new();
/// session.get(&mut ks, &root)?;
/// ks.append_key(Key::with_text("user/app/host", "localhost")?)?;
/// session.set(&mut ks, &root)?;
///
/// session.close(&Key::placeholder())?;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    /// `None` only transiently, while `close` or `Drop` takes the backend out.
    backend: Option<Box<dyn Backend>>,
}

impl Session {
    /// Opens a session on `backend`.
    ///
    /// `parent` may be the root placeholder; it carries error metadata if the
    /// open fails. Fails with [`StoreError::BackendUnavailable`] when the
    /// underlying store cannot be reached.
    pub fn open(mut backend: Box<dyn Backend>, parent: &Key) -> Result<Session> {
        clear_error(parent);
        match backend.open(parent) {
            BackendStatus::Failed => {
                let reported = StoreError::from_error_key(parent);
                Err(StoreError::BackendUnavailable {
                    description: reported.to_string(),
                })
            }
            _ => {
                tracing::debug!(backend = backend.name(), "session opened");
                Ok(Session {
                    backend: Some(backend),
                })
            }
        }
    }

    /// Merges the store's subtree under `parent` into `key_set`.
    ///
    /// Keys outside the subtree are left untouched; same-name local keys are
    /// overwritten with the stored state. Call `get` before mutating and
    /// before [`Session::set`] — that discipline is what makes the conflict
    /// check meaningful. Returns whether the key set changed.
    pub fn get(&mut self, key_set: &mut KeySet, parent: &Key) -> Result<bool> {
        clear_error(parent);
        let backend = self.backend_mut()?;
        match backend.get(key_set, parent) {
            BackendStatus::Failed => Err(StoreError::from_error_key(parent)),
            status => {
                key_set.mark_synced();
                tracing::debug!(
                    parent = %parent.name(),
                    changed = status.updated(),
                    "session get"
                );
                Ok(status.updated())
            }
        }
    }

    /// Persists `key_set`'s subtree under `parent` to the store.
    ///
    /// Fails with [`StoreError::ConflictingState`] when another session's
    /// write landed under `parent` since this session's last [`Session::get`];
    /// the caller is expected to re-get, reapply its change and set again (or
    /// abort). Returns whether the store changed.
    pub fn set(&mut self, key_set: &mut KeySet, parent: &Key) -> Result<bool> {
        clear_error(parent);
        let backend = self.backend_mut()?;
        match backend.set(key_set, parent) {
            BackendStatus::Failed => Err(StoreError::from_error_key(parent)),
            status => {
                key_set.mark_synced();
                tracing::debug!(
                    parent = %parent.name(),
                    changed = status.updated(),
                    "session set"
                );
                Ok(status.updated())
            }
        }
    }

    /// Reads the backend's version string.
    ///
    /// Store metadata travels through the same key/key-set interface as user
    /// configuration: this is an internal get of the well-known subtree
    /// `system/cascfg/version`.
    pub fn version(&mut self) -> Result<String> {
        let root = Key::new(VERSION_ROOT)?;
        let mut key_set = KeySet::new();
        self.get(&mut key_set, &root)?;

        match key_set.lookup_by_name(VERSION_KEY) {
            Some(key) => Ok(key.value()),
            None => Err(StoreError::Internal {
                description: "the backend did not report a version".to_string(),
            }),
        }
    }

    /// Closes the session.
    ///
    /// The session is consumed either way; a backend error on close is
    /// surfaced to the caller but cannot keep the session alive.
    pub fn close(mut self, parent: &Key) -> Result<()> {
        clear_error(parent);
        let Some(mut backend) = self.backend.take() else {
            return Ok(());
        };
        if backend.close(parent).failed() {
            let err = StoreError::from_error_key(parent);
            tracing::warn!(backend = backend.name(), "backend close failed: {}", err);
            return Err(err);
        }
        tracing::debug!(backend = backend.name(), "session closed");
        Ok(())
    }

    fn backend_mut(&mut self) -> Result<&mut Box<dyn Backend>> {
        self.backend.as_mut().ok_or_else(|| StoreError::Interface {
            description: "session is already closed".to_string(),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            if backend.close(&Key::placeholder()).failed() {
                tracing::warn!(
                    backend = backend.name(),
                    "backend close failed while dropping session"
                );
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.backend.as_deref().map_or("<closed>", |backend| backend.name());
        f.debug_struct("Session").field("backend", &name).finish()
    }
}
