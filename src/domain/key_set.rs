// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `KeySet` container: an ordered, name-deduplicated collection of keys.
//!
//! A key set keeps its keys sorted by the total order of
//! [`Key::compare`](crate::domain::Key::compare) and never holds two keys
//! with the same name: appending a key whose name is already present replaces
//! the stored entry. Keys are shared handles, so one key may live in several
//! key sets (and in application code) at once; removing it from one set never
//! invalidates the others.
//!
//! Iteration is external only: [`KeySet::iter`] hands the traversal state to
//! the caller, and the borrow checker rules out mutating the set while a
//! traversal is live.

use crate::domain::errors::{Result, StoreError};
use crate::domain::key::Key;
use crate::domain::key_name::{KeyName, Namespace};
use std::cmp::Ordering;

/// An ordered collection of [`Key`]s, deduplicated by name.
///
/// # Examples
///
/// ```
/// use cascfg::domain::{Key, KeySet};
///
/// # fn main() -> cascfg::domain::Result<()> {
/// let mut ks = KeySet::new();
/// ks.append_key(Key::with_text("user/app/b", "2")?)?;
/// ks.append_key(Key::with_text("user/app/a", "1")?)?;
///
/// assert_eq!(ks.key_names(), ["user/app/a", "user/app/b"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct KeySet {
    /// Sorted ascending by key name; no duplicate names.
    keys: Vec<Key>,
    need_sync: bool,
}

impl KeySet {
    /// Creates an empty key set.
    pub fn new() -> KeySet {
        KeySet {
            keys: Vec::new(),
            need_sync: false,
        }
    }

    /// Creates an empty key set pre-sized for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> KeySet {
        KeySet {
            keys: Vec::with_capacity(capacity),
            need_sync: false,
        }
    }

    /// Builds a key set from keys, later same-name keys replacing earlier
    /// ones.
    ///
    /// Fails with [`StoreError::InvalidArgument`] if any key is the root
    /// placeholder.
    pub fn from_keys(keys: impl IntoIterator<Item = Key>) -> Result<KeySet> {
        let iter = keys.into_iter();
        let mut set = KeySet::with_capacity(iter.size_hint().0);
        for key in iter {
            set.append_key(key)?;
        }
        Ok(set)
    }

    /// Returns the number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Inserts a key at its sorted position and returns the new size.
    ///
    /// A key with the same name as a stored entry replaces it; the replaced
    /// key's storage survives as long as any other holder references it.
    /// Fails with [`StoreError::InvalidArgument`] for the root placeholder.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::{Key, KeySet};
    ///
    /// # fn main() -> cascfg::domain::Result<()> {
    /// let mut ks = KeySet::new();
    /// ks.append_key(Key::with_text("user/app/host", "localhost")?)?;
    /// ks.append_key(Key::with_text("user/app/host", "example.org")?)?;
    ///
    /// assert_eq!(ks.len(), 1);
    /// assert_eq!(ks.lookup_by_name("user/app/host").unwrap().value(), "example.org");
    /// # Ok(())
    /// # }
    /// ```
    pub fn append_key(&mut self, key: Key) -> Result<usize> {
        let name = key.key_name().ok_or_else(|| StoreError::InvalidArgument {
            reason: "the root placeholder cannot be stored in a key set".to_string(),
        })?;

        match self.position(&name) {
            Ok(index) => self.keys[index] = key,
            Err(index) => self.keys.insert(index, key),
        }
        self.need_sync = true;

        Ok(self.len())
    }

    /// Merges all of `other`'s keys into this set, in ascending order of
    /// `other`, replacing same-name entries. Returns the new size.
    ///
    /// The merged keys are shared with `other`, not copied.
    pub fn append(&mut self, other: &KeySet) -> Result<usize> {
        for key in other.iter() {
            self.append_key(key.clone())?;
        }
        Ok(self.len())
    }

    /// Finds a key with the same name as `key`.
    ///
    /// The returned handle shares storage with the stored entry. A cascading
    /// name resolves through the concrete namespaces in priority order; see
    /// [`KeySet::lookup_by_name`].
    pub fn lookup(&self, key: &Key) -> Option<Key> {
        self.lookup_name(&key.key_name()?)
    }

    /// Finds a key by name.
    ///
    /// A cascading name tries `spec`, `proc`, `dir`, `user`, `system` in that
    /// order and returns the first match, falling back to a stored cascading
    /// entry. Unparseable names find nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::{Key, KeySet};
    ///
    /// # fn main() -> cascfg::domain::Result<()> {
    /// let mut ks = KeySet::new();
    /// ks.append_key(Key::with_text("system/app/host", "fallback")?)?;
    /// ks.append_key(Key::with_text("user/app/host", "localhost")?)?;
    ///
    /// let found = ks.lookup_by_name("/app/host").unwrap();
    /// assert_eq!(found.name(), "user/app/host");
    /// # Ok(())
    /// # }
    /// ```
    pub fn lookup_by_name(&self, name: &str) -> Option<Key> {
        self.lookup_name(&KeyName::parse(name).ok()?)
    }

    fn lookup_name(&self, name: &KeyName) -> Option<Key> {
        if name.namespace() == Namespace::Cascading && !name.segments().is_empty() {
            for namespace in Namespace::CASCADE_ORDER {
                if let Some(key) = self.exact(&name.with_namespace(namespace)) {
                    return Some(key);
                }
            }
        }
        self.exact(name)
    }

    fn exact(&self, name: &KeyName) -> Option<Key> {
        self.position(name).ok().map(|index| self.keys[index].clone())
    }

    /// Removes the key with exactly the same name as `key` and returns it.
    pub fn remove(&mut self, key: &Key) -> Option<Key> {
        let name = key.key_name()?;
        self.remove_name(&name)
    }

    /// Removes the key with exactly this name and returns it.
    ///
    /// Unlike lookup, removal does not resolve cascading names.
    pub fn remove_by_name(&mut self, name: &str) -> Option<Key> {
        self.remove_name(&KeyName::parse(name).ok()?)
    }

    fn remove_name(&mut self, name: &KeyName) -> Option<Key> {
        let index = self.position(name).ok()?;
        let removed = self.keys.remove(index);
        self.need_sync = true;
        Some(removed)
    }

    /// Extracts every key below-or-same `key` into a new key set.
    ///
    /// The ordering is prefix-consistent, so the extracted keys form one
    /// contiguous sorted run per namespace: a concrete cutpoint drains its
    /// namespace's run (plus matching cascading entries, which are below any
    /// namespace), a cascading cutpoint drains the matching run of every
    /// namespace. A placeholder cutpoint extracts nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::{Key, KeySet};
    ///
    /// # fn main() -> cascfg::domain::Result<()> {
    /// let mut ks = KeySet::from_keys([
    ///     Key::new("user/app/host")?,
    ///     Key::new("user/app/port")?,
    ///     Key::new("user/other")?,
    /// ])?;
    ///
    /// let app = ks.cut(&Key::new("user/app")?);
    /// assert_eq!(app.len(), 2);
    /// assert_eq!(ks.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn cut(&mut self, key: &Key) -> KeySet {
        let Some(name) = key.key_name() else {
            return KeySet::new();
        };

        let mut out = KeySet::new();
        if name.namespace() == Namespace::Cascading {
            for namespace in [
                Namespace::Spec,
                Namespace::Proc,
                Namespace::Dir,
                Namespace::User,
                Namespace::System,
                Namespace::Cascading,
            ] {
                self.drain_run(&name.with_namespace(namespace), &mut out);
            }
        } else {
            self.drain_run(&name, &mut out);
            self.drain_run(&name.with_namespace(Namespace::Cascading), &mut out);
        }

        if !out.is_empty() {
            self.need_sync = true;
            out.need_sync = true;
        }
        out
    }

    /// Drains the contiguous run of keys at or below `name` (exact namespace)
    /// into `out`, preserving order.
    fn drain_run(&mut self, name: &KeyName, out: &mut KeySet) {
        let below = |key: &Key| match key.key_name() {
            Some(stored) => {
                stored.namespace() == name.namespace()
                    && stored.segments().len() >= name.segments().len()
                    && stored.segments()[..name.segments().len()] == *name.segments()
            }
            None => false,
        };

        let lo = self
            .keys
            .partition_point(|key| key.name_cmp(name) == Ordering::Less);
        let hi = self
            .keys
            .partition_point(|key| key.name_cmp(name) == Ordering::Less || below(key));

        if lo < hi {
            out.keys.extend(self.keys.drain(lo..hi));
        }
    }

    /// Removes and returns the last key in sorted order.
    pub fn pop(&mut self) -> Option<Key> {
        let key = self.keys.pop()?;
        self.need_sync = true;
        Some(key)
    }

    /// Returns the first key in sorted order without removing it.
    pub fn head(&self) -> Option<Key> {
        self.keys.first().cloned()
    }

    /// Returns the last key in sorted order without removing it.
    pub fn tail(&self) -> Option<Key> {
        self.keys.last().cloned()
    }

    /// Removes all keys.
    ///
    /// Only this set's handles are dropped; keys shared with other sets or
    /// with application code stay alive.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.need_sync = true;
    }

    /// Whether local mutations are pending persistence.
    ///
    /// Every content mutation raises the flag; a successful session get or
    /// set clears it.
    pub fn need_sync(&self) -> bool {
        self.need_sync
    }

    /// Marks the set as in sync with the backing store.
    ///
    /// Called by sessions after a successful get or set; backends persisting
    /// by other means may call it too.
    pub fn mark_synced(&mut self) {
        self.need_sync = false;
    }

    /// Returns an iterator over the keys in ascending sorted order.
    ///
    /// The traversal state is caller-owned, so any number of iterations may
    /// run side by side; mutating the set while one is live is rejected at
    /// compile time.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.keys.iter(),
        }
    }

    /// Returns the names of all keys in ascending sorted order.
    pub fn key_names(&self) -> Vec<String> {
        self.keys.iter().map(Key::name).collect()
    }

    /// Returns the keys as a sorted slice.
    pub fn as_slice(&self) -> &[Key] {
        &self.keys
    }

    /// Deep-copies the set: every key is [`Key::duplicate`]d.
    pub fn duplicate(&self) -> KeySet {
        KeySet {
            keys: self.keys.iter().map(Key::duplicate).collect(),
            need_sync: self.need_sync,
        }
    }

    fn position(&self, name: &KeyName) -> std::result::Result<usize, usize> {
        self.keys.binary_search_by(|key| key.name_cmp(name))
    }
}

/// External iterator over a key set, ascending by name.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, Key>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Key;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<'a> ExactSizeIterator for Iter<'a> {}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a Key;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
