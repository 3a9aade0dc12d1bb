// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process shared-memory backend.
//!
//! This module provides [`MemoryStore`], one shared in-process store, and
//! [`MemoryBackend`], the per-session handle it mints. Several sessions (on
//! any threads) may open handles onto the same store; the store detects
//! conflicting get-modify-set cycles through per-root generation counters and
//! reports them with the conflict code, exactly like a persistent backend
//! would.

use crate::adapters::{merge_keys, version_keys};
use crate::domain::errors::codes;
use crate::domain::{Key, KeyName, KeySet};
use crate::ports::{report_error, Backend, BackendStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A shared in-process configuration store.
///
/// Cloning a `MemoryStore` shares the underlying store. Each session gets its
/// own handle via [`MemoryStore::backend`].
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
/// let mut ks = KeySet::new();
/// session.get(&mut ks, &root)?;
/// ks.append_key(Key::with_text("user/app/host", "localhost")?)?;
/// session.set(&mut ks, &root)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug)]
struct StoreInner {
    /// Deep copies of everything persisted; never aliases client keys.
    keys: KeySet,
    /// Generation per root name a set has gone through, for conflict checks.
    generations: Vec<(KeyName, u64)>,
}

impl StoreInner {
    /// The newest generation any write overlapping `root` has reached.
    fn generation_for(&self, root: &KeyName) -> u64 {
        self.generations
            .iter()
            .filter(|(tracked, _)| overlaps(tracked, root))
            .map(|(_, generation)| *generation)
            .max()
            .unwrap_or(0)
    }

    /// Records that a write under `root` reached `generation`, touching every
    /// tracked root whose subtree overlaps it.
    fn bump_overlapping(&mut self, root: &KeyName, generation: u64) {
        let mut tracked_root = false;
        for (tracked, tracked_generation) in &mut self.generations {
            if overlaps(tracked, root) {
                *tracked_generation = generation;
            }
            if *tracked == *root {
                tracked_root = true;
            }
        }
        if !tracked_root {
            self.generations.push((root.clone(), generation));
        }
    }
}

fn overlaps(a: &KeyName, b: &KeyName) -> bool {
    a.is_below_or_same(b) || b.is_below_or_same(a)
}

impl MemoryStore {
    /// Creates an empty store, pre-populated with the well-known version
    /// constant keys.
    pub fn new() -> MemoryStore {
        let mut keys = KeySet::new();
        for key in version_keys() {
            if let Err(err) = keys.append_key(key) {
                tracing::warn!("could not seed version key: {}", err);
            }
        }
        keys.mark_synced();

        MemoryStore {
            inner: Arc::new(Mutex::new(StoreInner {
                keys,
                generations: Vec::new(),
            })),
        }
    }

    /// Mints a backend handle for one session.
    ///
    /// Each handle tracks its own conflict observations; give every session
    /// its own handle.
    pub fn backend(&self) -> MemoryBackend {
        MemoryBackend {
            store: self.clone(),
            last_seen: HashMap::new(),
            opened: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// One session's handle onto a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryBackend {
    store: MemoryStore,
    /// Store generation observed at the last get, per root name.
    last_seen: HashMap<String, u64>,
    opened: bool,
}

impl MemoryBackend {
    /// Checks the open/parent preconditions shared by get and set.
    fn usable_root(&self, parent: &Key, call: &str) -> Option<KeyName> {
        if !self.opened {
            report_error(
                parent,
                codes::INTERFACE,
                &format!("{call} called on an unopened backend handle"),
            );
            return None;
        }
        match parent.key_name() {
            Some(root) => Some(root),
            None => {
                report_error(
                    parent,
                    codes::INTERFACE,
                    "the session root placeholder cannot address a subtree",
                );
                None
            }
        }
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn open(&mut self, _parent: &Key) -> BackendStatus {
        self.opened = true;
        BackendStatus::Unchanged
    }

    fn get(&mut self, key_set: &mut KeySet, parent: &Key) -> BackendStatus {
        let Some(root) = self.usable_root(parent, "get") else {
            return BackendStatus::Failed;
        };

        let inner = self.store.lock();
        let incoming: Vec<Key> = inner
            .keys
            .iter()
            .filter(|key| key.is_below_or_same(parent))
            .map(Key::duplicate)
            .collect();
        let generation = inner.generation_for(&root);
        drop(inner);

        self.last_seen.insert(root.to_string(), generation);
        tracing::debug!(
            root = %root,
            keys = incoming.len(),
            generation,
            "memory backend get"
        );

        if merge_keys(key_set, incoming) {
            BackendStatus::Updated
        } else {
            BackendStatus::Unchanged
        }
    }

    fn set(&mut self, key_set: &mut KeySet, parent: &Key) -> BackendStatus {
        let Some(root) = self.usable_root(parent, "set") else {
            return BackendStatus::Failed;
        };

        let mut inner = self.store.lock();
        let current = inner.generation_for(&root);

        match self.last_seen.get(&root.to_string()) {
            None => {
                report_error(
                    parent,
                    codes::INTERFACE,
                    "set requires a preceding get for the same subtree",
                );
                return BackendStatus::Failed;
            }
            Some(seen) if *seen != current => {
                report_error(
                    parent,
                    codes::CONFLICTING_STATE,
                    &format!(
                        "the store's state under '{root}' advanced past this session's last get"
                    ),
                );
                return BackendStatus::Failed;
            }
            Some(_) => {}
        }

        let replacement: Vec<Key> = key_set
            .iter()
            .filter(|key| key.is_below_or_same(parent))
            .map(Key::duplicate)
            .collect();
        let stored: Vec<Key> = inner
            .keys
            .iter()
            .filter(|key| key.is_below_or_same(parent))
            .cloned()
            .collect();

        if subtrees_equal(&stored, &replacement) {
            tracing::debug!(root = %root, "memory backend set without changes");
            return BackendStatus::Unchanged;
        }

        drop(inner.keys.cut(parent));
        for key in replacement {
            if let Err(err) = inner.keys.append_key(key) {
                tracing::warn!("skipping unpersistable key: {}", err);
            }
        }
        inner.keys.mark_synced();

        let next = current + 1;
        inner.bump_overlapping(&root, next);
        drop(inner);

        self.last_seen.insert(root.to_string(), next);
        tracing::debug!(root = %root, generation = next, "memory backend set");
        BackendStatus::Updated
    }

    fn close(&mut self, _parent: &Key) -> BackendStatus {
        self.opened = false;
        BackendStatus::Unchanged
    }
}

/// Whether two sorted key slices hold the same names and content.
fn subtrees_equal(a: &[Key], b: &[Key]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(a, b)| a.compare(b) == std::cmp::Ordering::Equal && a.content_eq(b))
}
