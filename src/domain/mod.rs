// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing the core data model.
//!
//! This module contains the fundamental concepts of the configuration store:
//! the key name grammar, the [`Key`] entry type, the ordered [`KeySet`]
//! collection and the error taxonomy. It is independent of any backend
//! concerns.

pub mod errors;
pub mod key;
pub mod key_name;
pub mod key_set;

// Re-export commonly used types
pub use errors::{Result, StoreError, ERROR_DESCRIPTION_META, ERROR_NUMBER_META};
pub use key::{common_key_name, Key, KeyValue};
pub use key_name::{KeyName, Namespace, DELIMITER};
pub use key_set::KeySet;
