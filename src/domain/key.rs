// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `Key` type: one configuration entry with name, value and metadata.
//!
//! A `Key` is a cheap, cloneable handle to shared storage. Cloning a key
//! shares the underlying entry, so a mutation made through one handle is
//! visible through every other handle and through every
//! [`KeySet`](crate::domain::KeySet) holding the key. [`Key::duplicate`]
//! deep-copies instead, producing an independent identity. Reference counting
//! is atomic, so keys may cross thread boundaries.

use crate::domain::errors::{Result, StoreError};
use crate::domain::key_name::{KeyName, Namespace};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The value slot of a key.
///
/// There is exactly one slot per key: it is empty, holds UTF-8 text, or
/// holds an opaque byte buffer. Setting one representation replaces the
/// other.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyValue {
    /// No value has been set.
    #[default]
    Empty,
    /// A UTF-8 string value.
    Text(String),
    /// An opaque byte buffer, embedded zero bytes included.
    Binary(Vec<u8>),
}

#[derive(Debug)]
struct KeyData {
    /// `None` is the transient root placeholder used for session open/close.
    name: Option<KeyName>,
    value: KeyValue,
    meta: BTreeMap<String, String>,
}

/// One configuration entry: hierarchical name, value and metadata.
///
/// # Examples
///
/// ```
/// use cascfg::domain::Key;
///
/// let key = Key::with_text("user/app/host", "localhost").unwrap();
/// assert_eq!(key.name(), "user/app/host");
/// assert_eq!(key.value(), "localhost");
///
/// // Clones share storage:
/// let other = key.clone();
/// other.set_string("example.org");
/// assert_eq!(key.value(), "example.org");
/// ```
#[derive(Clone, Debug)]
pub struct Key {
    inner: Arc<RwLock<KeyData>>,
}

impl Key {
    /// Creates a key with the given name and no value.
    ///
    /// Fails with [`StoreError::InvalidName`] if the name does not parse as
    /// namespace plus path (see [`KeyName::parse`]).
    pub fn new(name: &str) -> Result<Key> {
        Ok(Self::from_data(Some(KeyName::parse(name)?), KeyValue::Empty))
    }

    /// Creates a key with the given name and value.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::{Key, KeyValue};
    ///
    /// let key = Key::with_value("user/app/icon", KeyValue::Binary(vec![0, 159, 146])).unwrap();
    /// assert!(key.is_binary());
    /// ```
    pub fn with_value(name: &str, value: KeyValue) -> Result<Key> {
        Ok(Self::from_data(Some(KeyName::parse(name)?), value))
    }

    /// Creates a key with the given name and string value.
    pub fn with_text(name: &str, text: &str) -> Result<Key> {
        Self::with_value(name, KeyValue::Text(text.to_string()))
    }

    /// Creates the transient root placeholder key.
    ///
    /// The placeholder has the empty name and exists only to be passed to
    /// session open/close calls (and to carry their error metadata). It can
    /// never be stored in a key set.
    pub fn placeholder() -> Key {
        Self::from_data(None, KeyValue::Empty)
    }

    fn from_data(name: Option<KeyName>, value: KeyValue) -> Key {
        Key {
            inner: Arc::new(RwLock::new(KeyData {
                name,
                value,
                meta: BTreeMap::new(),
            })),
        }
    }

    /// Returns the full name of this key, `""` for the placeholder.
    pub fn name(&self) -> String {
        self.read()
            .name
            .as_ref()
            .map_or_else(String::new, KeyName::to_string)
    }

    /// Returns the parsed name, `None` for the placeholder.
    pub fn key_name(&self) -> Option<KeyName> {
        self.read().name.clone()
    }

    /// Returns the unescaped last path segment of the name.
    pub fn base_name(&self) -> String {
        self.read()
            .name
            .as_ref()
            .map_or_else(String::new, |name| name.base_name().to_string())
    }

    /// Returns the namespace of this key, `None` for the placeholder.
    ///
    /// The cascading form reports [`Namespace::Cascading`], whose tag renders
    /// as the empty string.
    pub fn namespace(&self) -> Option<Namespace> {
        self.read().name.as_ref().map(KeyName::namespace)
    }

    /// Whether this key is the transient root placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.read().name.is_none()
    }

    /// Renames the key.
    ///
    /// Fails with [`StoreError::InvalidName`] if `name` fails the naming
    /// grammar. A key set already containing this key does NOT re-sort it;
    /// remove the key and append it again to restore the set's order.
    pub fn set_name(&self, name: &str) -> Result<()> {
        let parsed = KeyName::parse(name)?;
        self.write().name = Some(parsed);
        Ok(())
    }

    /// Returns the value as text.
    ///
    /// A binary value is rendered as lossy UTF-8; an empty slot is `""`.
    pub fn value(&self) -> String {
        match &self.read().value {
            KeyValue::Empty => String::new(),
            KeyValue::Text(text) => text.clone(),
            KeyValue::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Returns the value as raw bytes.
    ///
    /// A text value yields its UTF-8 encoding; an empty slot is empty.
    pub fn bytes(&self) -> Vec<u8> {
        match &self.read().value {
            KeyValue::Empty => Vec::new(),
            KeyValue::Text(text) => text.as_bytes().to_vec(),
            KeyValue::Binary(bytes) => bytes.clone(),
        }
    }

    /// Returns the boolean reading of the value: `true` exactly for `"1"`.
    pub fn boolean(&self) -> bool {
        self.value() == "1"
    }

    /// Returns a copy of the value slot.
    pub fn key_value(&self) -> KeyValue {
        self.read().value.clone()
    }

    /// Whether the value slot currently holds a byte buffer.
    pub fn is_binary(&self) -> bool {
        matches!(self.read().value, KeyValue::Binary(_))
    }

    /// Sets the value to a string.
    pub fn set_string(&self, value: &str) {
        self.write().value = KeyValue::Text(value.to_string());
    }

    /// Sets the value to a byte buffer.
    pub fn set_bytes(&self, value: &[u8]) {
        self.write().value = KeyValue::Binary(value.to_vec());
    }

    /// Sets the value to a boolean, stored canonically as `"1"` or `"0"`.
    pub fn set_boolean(&self, value: bool) {
        self.set_string(if value { "1" } else { "0" });
    }

    /// Replaces the value slot.
    pub fn set_value(&self, value: KeyValue) {
        self.write().value = value;
    }

    /// Returns the metadata value stored under `name`, `""` when absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::Key;
    ///
    /// let key = Key::new("user/app/host").unwrap();
    /// key.set_meta("comment", "primary host").unwrap();
    /// assert_eq!(key.meta("comment"), "primary host");
    /// assert_eq!(key.meta("missing"), "");
    /// ```
    pub fn meta(&self, name: &str) -> String {
        self.read().meta.get(name).cloned().unwrap_or_default()
    }

    /// Sets a metadata entry.
    ///
    /// Fails with [`StoreError::InvalidName`] for an empty metadata name.
    pub fn set_meta(&self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: "metadata names must not be empty".to_string(),
            });
        }
        self.write().meta.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Removes a metadata entry. Removing an absent entry is not an error.
    pub fn remove_meta(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: "metadata names must not be empty".to_string(),
            });
        }
        self.write().meta.remove(name);
        Ok(())
    }

    /// Returns all metadata entries in metadata-name order.
    pub fn meta_entries(&self) -> Vec<(String, String)> {
        self.read()
            .meta
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Whether this key is strictly below `other` in the hierarchy.
    ///
    /// Placeholders are below nothing and have nothing below them.
    pub fn is_below(&self, other: &Key) -> bool {
        match (self.key_name(), other.key_name()) {
            (Some(a), Some(b)) => a.is_below(&b),
            _ => false,
        }
    }

    /// Whether this key is below `other` or names the same entry.
    pub fn is_below_or_same(&self, other: &Key) -> bool {
        match (self.key_name(), other.key_name()) {
            (Some(a), Some(b)) => a.is_below_or_same(&b),
            _ => false,
        }
    }

    /// Whether this key is exactly one level below `other`.
    pub fn is_directly_below(&self, other: &Key) -> bool {
        match (self.key_name(), other.key_name()) {
            (Some(a), Some(b)) => a.is_directly_below(&b),
            _ => false,
        }
    }

    /// Compares two keys by name.
    ///
    /// This is the total order that keeps key sets sorted: namespace first
    /// (`spec < proc < dir < user < system < cascading`), then path segments.
    /// The placeholder sorts before every named key. `compare` returning
    /// [`Ordering::Equal`] is equivalent to the two names being equal.
    pub fn compare(&self, other: &Key) -> Ordering {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return Ordering::Equal;
        }
        let a = self.read();
        let b = other.read();
        match (&a.name, &b.name) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }

    /// Deep-copies this key into a new independent identity.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::Key;
    ///
    /// let key = Key::with_text("user/app/host", "localhost").unwrap();
    /// let copy = key.duplicate();
    /// copy.set_string("example.org");
    /// assert_eq!(key.value(), "localhost");
    /// ```
    pub fn duplicate(&self) -> Key {
        let data = self.read();
        Key {
            inner: Arc::new(RwLock::new(KeyData {
                name: data.name.clone(),
                value: data.value.clone(),
                meta: data.meta.clone(),
            })),
        }
    }

    /// Compares this key's name against a target name without cloning it.
    pub(crate) fn name_cmp(&self, target: &KeyName) -> Ordering {
        match &self.read().name {
            None => Ordering::Less,
            Some(name) => name.cmp(target),
        }
    }

    /// Whether two keys carry the same value and metadata.
    pub(crate) fn content_eq(&self, other: &Key) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        let a = self.read();
        let b = other.read();
        a.value == b.value && a.meta == b.meta
    }

    fn read(&self) -> RwLockReadGuard<'_, KeyData> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, KeyData> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value();
        if value.is_empty() {
            write!(f, "{}: (empty)", self.name())
        } else {
            write!(f, "{}: {}", self.name(), value)
        }
    }
}

/// Computes the common key name of two keys (see [`KeyName::common_name`]).
///
/// A placeholder has no name to share, so any pairing with one yields `""`.
///
/// # Examples
///
/// ```
/// use cascfg::domain::{common_key_name, Key};
///
/// let a = Key::new("user/foo/bar").unwrap();
/// let b = Key::new("user/bar/foo").unwrap();
/// assert_eq!(common_key_name(&a, &b), "user");
/// ```
pub fn common_key_name(a: &Key, b: &Key) -> String {
    match (a.key_name(), b.key_name()) {
        (Some(a), Some(b)) => a.common_name(&b),
        _ => String::new(),
    }
}
