// SPDX-License-Identifier: MIT OR Apache-2.0

//! YAML file backend.
//!
//! This module provides a backend that persists the store as a single YAML
//! document: a generation counter plus a flat map of key names to value and
//! metadata records. The generation counter is the conflict contract between
//! uncoordinated writers — possibly in different processes — sharing one
//! file: `set` re-reads the document and fails with the conflict code when
//! the on-disk generation moved past this handle's last `get`.

use crate::adapters::{merge_keys, version_keys};
use crate::domain::errors::codes;
use crate::domain::{Key, KeyName, KeySet, KeyValue, Result, StoreError};
use crate::ports::{report_error, Backend, BackendStatus};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum allowed size for a store file (10MB)
/// This prevents denial of service attacks via extremely large files
const MAX_STORE_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// File name used by [`YamlFileBackend::from_default_location`].
const DEFAULT_STORE_FILE: &str = "store.yaml";

/// The on-disk document: a conflict generation plus all persisted keys.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    /// Bumped on every successful set; the optimistic-concurrency watermark.
    generation: u64,
    #[serde(default)]
    keys: BTreeMap<String, KeyRecord>,
}

/// One persisted key: its value slot and metadata.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct KeyRecord {
    #[serde(default)]
    value: KeyValue,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    meta: BTreeMap<String, String>,
}

/// Backend persisting the store as one YAML file.
///
/// Several handles — including handles in different processes — may point at
/// the same path; the on-disk generation counter makes their get-modify-set
/// cycles conflict-safe. A missing file reads as an empty store and is
/// created on the first set.
///
/// # Examples
///
/// ```rust,no_run
/// use cascfg::adapters::YamlFileBackend;
///
/// // A specific file:
/// let backend = YamlFileBackend::new("/var/lib/myapp/store.yaml");
///
/// // Or the OS-appropriate default location:
/// let backend = YamlFileBackend::from_default_location("myapp", "com.example").unwrap();
/// ```
#[derive(Debug)]
pub struct YamlFileBackend {
    /// Path to the store file
    path: PathBuf,
    /// On-disk generation observed at the last get
    last_seen: Option<u64>,
    opened: bool,
}

impl YamlFileBackend {
    /// Creates a backend for the store file at `path`.
    ///
    /// No I/O happens until [`Backend::open`].
    pub fn new<P: AsRef<Path>>(path: P) -> YamlFileBackend {
        YamlFileBackend {
            path: path.as_ref().to_path_buf(),
            last_seen: None,
            opened: false,
        }
    }

    /// Creates a backend for the OS-appropriate default store location.
    ///
    /// The file lives in the per-user configuration directory derived from
    /// `qualifier` and `app_name` (e.g. `~/.config/myapp/store.yaml` on
    /// Linux).
    pub fn from_default_location(app_name: &str, qualifier: &str) -> Result<YamlFileBackend> {
        let dirs = ProjectDirs::from(qualifier, "", app_name).ok_or_else(|| {
            StoreError::BackendUnavailable {
                description: "no home directory available for the default store location"
                    .to_string(),
            }
        })?;

        Ok(Self::new(dirs.config_dir().join(DEFAULT_STORE_FILE)))
    }

    /// Returns the path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreDocument> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }

        let metadata = fs::metadata(&self.path)?;
        if metadata.len() > MAX_STORE_FILE_SIZE {
            return Err(StoreError::PluginMisbehavior {
                description: format!(
                    "store file too large: {} bytes (max {} bytes)",
                    metadata.len(),
                    MAX_STORE_FILE_SIZE
                ),
            });
        }

        let content = fs::read_to_string(&self.path)?;
        serde_yaml::from_str(&content).map_err(|err| StoreError::PluginMisbehavior {
            description: format!(
                "could not parse store file {}: {}",
                self.path.display(),
                err
            ),
        })
    }

    fn store(&self, document: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content =
            serde_yaml::to_string(document).map_err(|err| StoreError::Internal {
                description: format!("could not serialize store document: {err}"),
            })?;
        fs::write(&self.path, content)?;
        Ok(())
    }

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

/// Builds a key from a persisted record.
fn record_key(name: &str, record: &KeyRecord) -> Result<Key> {
    let key = Key::with_value(name, record.value.clone())?;
    for (meta_name, meta_value) in &record.meta {
        key.set_meta(meta_name, meta_value)?;
    }
    Ok(key)
}

/// The names of all persisted keys at or below `root`, in document order.
fn names_below(document: &StoreDocument, root: &KeyName) -> Vec<String> {
    document
        .keys
        .keys()
        .filter(|name| match KeyName::parse(name) {
            Ok(parsed) => parsed.is_below_or_same(root),
            Err(err) => {
                tracing::warn!("ignoring persisted key with invalid name: {}", err);
                false
            }
        })
        .cloned()
        .collect()
}

impl Backend for YamlFileBackend {
    fn name(&self) -> &str {
        "yaml-file"
    }

    fn open(&mut self, parent: &Key) -> BackendStatus {
        match self.load() {
            Ok(_) => {
                self.opened = true;
                tracing::debug!(path = %self.path.display(), "yaml backend opened");
                BackendStatus::Unchanged
            }
            Err(err) => {
                report_error(parent, err.code().unwrap_or(codes::INTERNAL), &err.to_string());
                BackendStatus::Failed
            }
        }
    }

    fn get(&mut self, key_set: &mut KeySet, parent: &Key) -> BackendStatus {
        let Some(root) = self.usable_root(parent, "get") else {
            return BackendStatus::Failed;
        };

        let document = match self.load() {
            Ok(document) => document,
            Err(err) => {
                report_error(parent, err.code().unwrap_or(codes::INTERNAL), &err.to_string());
                return BackendStatus::Failed;
            }
        };

        let mut incoming = Vec::new();
        for name in names_below(&document, &root) {
            let Some(record) = document.keys.get(&name) else {
                continue;
            };
            match record_key(&name, record) {
                Ok(key) => incoming.push(key),
                Err(err) => tracing::warn!("ignoring unreadable persisted key: {}", err),
            }
        }
        for key in version_keys() {
            if key.is_below_or_same(parent) {
                incoming.push(key);
            }
        }

        self.last_seen = Some(document.generation);
        tracing::debug!(
            root = %root,
            keys = incoming.len(),
            generation = document.generation,
            "yaml backend get"
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

        let mut document = match self.load() {
            Ok(document) => document,
            Err(err) => {
                report_error(parent, err.code().unwrap_or(codes::INTERNAL), &err.to_string());
                return BackendStatus::Failed;
            }
        };

        match self.last_seen {
            None => {
                report_error(
                    parent,
                    codes::INTERFACE,
                    "set requires a preceding get for the same store",
                );
                return BackendStatus::Failed;
            }
            Some(seen) if seen != document.generation => {
                report_error(
                    parent,
                    codes::CONFLICTING_STATE,
                    &format!(
                        "the store file advanced to generation {} past this session's last get ({})",
                        document.generation, seen
                    ),
                );
                return BackendStatus::Failed;
            }
            Some(_) => {}
        }

        let mut previous = BTreeMap::new();
        for name in names_below(&document, &root) {
            if let Some(record) = document.keys.remove(&name) {
                previous.insert(name, record);
            }
        }

        let mut replacement = BTreeMap::new();
        for key in key_set.iter().filter(|key| key.is_below_or_same(parent)) {
            replacement.insert(
                key.name(),
                KeyRecord {
                    value: key.key_value(),
                    meta: key.meta_entries().into_iter().collect(),
                },
            );
        }

        if previous == replacement {
            document.keys.extend(previous);
            tracing::debug!(root = %root, "yaml backend set without changes");
            return BackendStatus::Unchanged;
        }

        document.keys.extend(replacement);
        document.generation += 1;

        if let Err(err) = self.store(&document) {
            report_error(parent, err.code().unwrap_or(codes::INTERNAL), &err.to_string());
            return BackendStatus::Failed;
        }

        self.last_seen = Some(document.generation);
        tracing::debug!(
            root = %root,
            generation = document.generation,
            "yaml backend set"
        );
        BackendStatus::Updated
    }

    fn close(&mut self, _parent: &Key) -> BackendStatus {
        self.opened = false;
        BackendStatus::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.yaml");
        (dir, path)
    }

    fn opened_backend(path: &Path) -> YamlFileBackend {
        let mut backend = YamlFileBackend::new(path);
        let _ = backend.open(&Key::placeholder());
        backend
    }

    #[test]
    fn test_missing_file_reads_as_empty_store() {
        let (_dir, path) = temp_store();
        let mut backend = opened_backend(&path);
        let root = Key::new("user/tests").unwrap();
        let mut ks = KeySet::new();

        assert_eq!(backend.get(&mut ks, &root), BackendStatus::Unchanged);
        assert!(ks.is_empty());
    }

    #[test]
    fn test_set_creates_file_and_roundtrips() {
        let (_dir, path) = temp_store();
        let root = Key::new("user/tests").unwrap();

        let mut writer = opened_backend(&path);
        let mut ks = KeySet::new();
        let _ = writer.get(&mut ks, &root);

        let key = Key::with_text("user/tests/host", "localhost").unwrap();
        key.set_meta("comment", "primary").unwrap();
        ks.append_key(key).unwrap();
        ks.append_key(Key::with_value("user/tests/blob", KeyValue::Binary(vec![0, 1, 2])).unwrap())
            .unwrap();
        assert_eq!(writer.set(&mut ks, &root), BackendStatus::Updated);
        assert!(path.exists());

        let mut reader = opened_backend(&path);
        let mut read = KeySet::new();
        assert_eq!(reader.get(&mut read, &root), BackendStatus::Updated);

        let host = read.lookup_by_name("user/tests/host").unwrap();
        assert_eq!(host.value(), "localhost");
        assert_eq!(host.meta("comment"), "primary");

        let blob = read.lookup_by_name("user/tests/blob").unwrap();
        assert!(blob.is_binary());
        assert_eq!(blob.bytes(), vec![0, 1, 2]);
    }

    #[test]
    fn test_conflicting_writers_on_one_file() {
        let (_dir, path) = temp_store();
        let root = Key::new("user/tests/conflict").unwrap();

        let mut first = opened_backend(&path);
        let mut second = opened_backend(&path);

        let mut ks1 = KeySet::new();
        let _ = first.get(&mut ks1, &root);
        ks1.append_key(Key::with_text("user/tests/conflict/a", "1").unwrap())
            .unwrap();
        assert_eq!(first.set(&mut ks1, &root), BackendStatus::Updated);

        let mut ks2 = KeySet::new();
        let _ = second.get(&mut ks2, &root);

        ks1.append_key(Key::with_text("user/tests/conflict/b", "2").unwrap())
            .unwrap();
        assert_eq!(first.set(&mut ks1, &root), BackendStatus::Updated);

        ks2.append_key(Key::with_text("user/tests/conflict/a", "3").unwrap())
            .unwrap();
        assert_eq!(second.set(&mut ks2, &root), BackendStatus::Failed);
        assert_eq!(
            root.meta(crate::domain::ERROR_NUMBER_META),
            codes::CONFLICTING_STATE
        );
    }

    #[test]
    fn test_set_without_get_is_interface_error() {
        let (_dir, path) = temp_store();
        let mut backend = opened_backend(&path);
        let root = Key::new("user/tests").unwrap();
        let mut ks = KeySet::new();

        assert_eq!(backend.set(&mut ks, &root), BackendStatus::Failed);
        assert_eq!(root.meta(crate::domain::ERROR_NUMBER_META), codes::INTERFACE);
    }

    #[test]
    fn test_corrupt_file_fails_open() {
        let (_dir, path) = temp_store();
        fs::write(&path, ":[ not yaml ][").unwrap();

        let mut backend = YamlFileBackend::new(&path);
        let parent = Key::placeholder();
        assert_eq!(backend.open(&parent), BackendStatus::Failed);
        assert_eq!(
            parent.meta(crate::domain::ERROR_NUMBER_META),
            codes::PLUGIN_MISBEHAVIOR
        );
    }

    #[test]
    fn test_unchanged_set_does_not_bump_generation() {
        let (_dir, path) = temp_store();
        let root = Key::new("user/tests").unwrap();

        let mut backend = opened_backend(&path);
        let mut ks = KeySet::new();
        let _ = backend.get(&mut ks, &root);
        ks.append_key(Key::with_text("user/tests/host", "localhost").unwrap())
            .unwrap();
        assert_eq!(backend.set(&mut ks, &root), BackendStatus::Updated);
        assert_eq!(backend.set(&mut ks, &root), BackendStatus::Unchanged);

        // A second handle that got the state in between must not conflict.
        let mut other = opened_backend(&path);
        let mut other_ks = KeySet::new();
        let _ = other.get(&mut other_ks, &root);
        other_ks
            .append_key(Key::with_text("user/tests/port", "80").unwrap())
            .unwrap();
        assert_eq!(other.set(&mut other_ks, &root), BackendStatus::Updated);
    }

    #[test]
    fn test_keys_outside_root_survive_set() {
        let (_dir, path) = temp_store();
        let app = Key::new("user/app").unwrap();
        let other = Key::new("user/other").unwrap();

        let mut backend = opened_backend(&path);
        let mut ks = KeySet::new();
        let _ = backend.get(&mut ks, &other);
        ks.append_key(Key::with_text("user/other/kept", "yes").unwrap())
            .unwrap();
        let _ = backend.set(&mut ks, &other);

        let mut app_backend = opened_backend(&path);
        let mut app_ks = KeySet::new();
        let _ = app_backend.get(&mut app_ks, &app);
        app_ks
            .append_key(Key::with_text("user/app/host", "localhost").unwrap())
            .unwrap();
        assert_eq!(app_backend.set(&mut app_ks, &app), BackendStatus::Updated);

        let mut reader = opened_backend(&path);
        let mut read = KeySet::new();
        let _ = reader.get(&mut read, &Key::new("user").unwrap());
        assert!(read.lookup_by_name("user/other/kept").is_some());
        assert!(read.lookup_by_name("user/app/host").is_some());
    }

    #[test]
    fn test_serves_version_keys() {
        let (_dir, path) = temp_store();
        let mut backend = opened_backend(&path);
        let root = Key::new(crate::adapters::VERSION_ROOT).unwrap();
        let mut ks = KeySet::new();

        assert_eq!(backend.get(&mut ks, &root), BackendStatus::Updated);
        let version = ks.lookup_by_name(crate::adapters::VERSION_KEY).unwrap();
        assert_eq!(version.value(), env!("CARGO_PKG_VERSION"));
    }
}
