// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing backend implementations.
//!
//! This module contains concrete implementations of the
//! [`Backend`](crate::ports::Backend) trait: a shared in-process memory
//! store and, with the `yaml` feature, a YAML-file store. Both detect
//! conflicting writers
//! through generation counters and report failures via the error metadata
//! wire contract.

use crate::domain::{Key, KeySet};

pub mod memory;
#[cfg(feature = "yaml")]
pub mod yaml_file;

// Re-export adapters based on feature flags
pub use memory::{MemoryBackend, MemoryStore};
#[cfg(feature = "yaml")]
pub use yaml_file::YamlFileBackend;

/// Root of the well-known subtree under which backends expose store metadata.
pub const VERSION_ROOT: &str = "system/cascfg/version";

/// Well-known key carrying the backend's version string.
pub const VERSION_KEY: &str = "system/cascfg/version/constants/VERSION";

/// Builds the well-known version constant keys the bundled backends serve.
pub(crate) fn version_keys() -> Vec<Key> {
    let constants = [
        ("VERSION", env!("CARGO_PKG_VERSION")),
        ("VERSION_MAJOR", env!("CARGO_PKG_VERSION_MAJOR")),
        ("VERSION_MINOR", env!("CARGO_PKG_VERSION_MINOR")),
        ("VERSION_PATCH", env!("CARGO_PKG_VERSION_PATCH")),
    ];

    let mut keys = Vec::with_capacity(constants.len());
    for (constant, value) in constants {
        let name = format!("{VERSION_ROOT}/constants/{constant}");
        match Key::with_text(&name, value) {
            Ok(key) => keys.push(key),
            Err(err) => tracing::warn!("could not build version key '{}': {}", name, err),
        }
    }
    keys
}

/// Merges `incoming` keys into `key_set`, overwriting same-name entries.
///
/// Returns whether anything was added or replaced with different content.
pub(crate) fn merge_keys(key_set: &mut KeySet, incoming: Vec<Key>) -> bool {
    let mut changed = false;
    for key in incoming {
        let replace = match key_set.lookup(&key) {
            Some(existing) => !existing.content_eq(&key),
            None => true,
        };
        if replace {
            changed = true;
            if let Err(err) = key_set.append_key(key) {
                tracing::warn!("skipping unmergeable key: {}", err);
            }
        }
    }
    changed
}
