// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the configuration store.
//!
//! This module defines the closed error taxonomy used throughout the crate.
//! Backend-reported failures arrive as a fixed six-character code plus a
//! human-readable description, attached as metadata to the parent key of the
//! failing call (see [`ERROR_NUMBER_META`] and [`ERROR_DESCRIPTION_META`]);
//! the table in this module maps those codes onto typed [`StoreError`]
//! variants. All errors use `thiserror` for proper error handling and
//! conversion.

use crate::domain::key::Key;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

/// Metadata name under which backends report their structured error code.
pub const ERROR_NUMBER_META: &str = "error/number";

/// Metadata name under which backends report a human-readable description.
pub const ERROR_DESCRIPTION_META: &str = "error/description";

/// The fixed six-character codes backends use to report structured errors.
///
/// These are the wire contract between a backend and the error taxonomy:
/// a backend attaches one of these under [`ERROR_NUMBER_META`] on the parent
/// key of a failing call.
pub mod codes {
    /// Backend allocation failure.
    pub const OUT_OF_MEMORY: &str = "C01110";
    /// Unexpected backend-internal fault.
    pub const INTERNAL: &str = "C01310";
    /// Caller misused the API.
    pub const INTERFACE: &str = "C01320";
    /// A backend extension stage violated its contract.
    pub const PLUGIN_MISBEHAVIOR: &str = "C01330";
    /// Optimistic-concurrency conflict detected on set.
    pub const CONFLICTING_STATE: &str = "C02000";
    /// A value failed structural validation.
    pub const VALIDATION_SYNTACTIC: &str = "C03100";
    /// A value failed semantic validation.
    pub const VALIDATION_SEMANTIC: &str = "C03200";
}

/// The main error type for configuration store operations.
///
/// The first seven variants mirror the structured codes a backend can report;
/// the remaining variants are raised locally (naming grammar violations,
/// misuse of placeholder keys, unreachable stores, file I/O). The enum is
/// `#[non_exhaustive]` to allow future additions without breaking backwards
/// compatibility.
///
/// # Examples
///
/// ```
/// use cascfg::domain::errors::StoreError;
///
/// fn rejected() -> Result<(), StoreError> {
///     Err(StoreError::InvalidName {
///         name: "flat".to_string(),
///         reason: "unknown namespace tag".to_string(),
///     })
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The backend failed to allocate memory.
    #[error("backend out of memory: {description}")]
    OutOfMemory {
        /// Description reported by the backend
        description: String,
    },

    /// The backend hit an unexpected internal fault.
    #[error("internal backend fault: {description}")]
    Internal {
        /// Description reported by the backend
        description: String,
    },

    /// The caller misused the API (e.g. an unopened handle).
    #[error("interface misuse: {description}")]
    Interface {
        /// Description reported by the backend
        description: String,
    },

    /// A backend extension stage violated its contract.
    #[error("backend plugin misbehaved: {description}")]
    PluginMisbehavior {
        /// Description reported by the backend
        description: String,
    },

    /// The store's state advanced past this session's last get.
    ///
    /// This is the expected signal of the optimistic-concurrency protocol:
    /// re-get the subtree, reapply the intended change and set again.
    #[error("conflicting state, get the subtree again before set: {description}")]
    ConflictingState {
        /// Description reported by the backend
        description: String,
    },

    /// A value failed structural validation on set.
    #[error("syntactic validation failed: {description}")]
    ValidationSyntactic {
        /// Description reported by the backend
        description: String,
    },

    /// A value failed semantic validation on set.
    #[error("semantic validation failed: {description}")]
    ValidationSemantic {
        /// Description reported by the backend
        description: String,
    },

    /// A key name failed the naming grammar.
    #[error("invalid key name '{name}': {reason}")]
    InvalidName {
        /// The offending name
        name: String,
        /// Why the grammar rejected it
        reason: String,
    },

    /// A placeholder or otherwise unusable key was passed where a stored
    /// entry is required.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected
        reason: String,
    },

    /// The underlying store could not be reached on open.
    #[error("backend unavailable: {description}")]
    BackendUnavailable {
        /// What went wrong while reaching the store
        description: String,
    },

    /// An I/O error occurred while reading or writing a store file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Table mapping backend error codes to variant constructors.
static CODE_TABLE: Lazy<HashMap<&'static str, fn(String) -> StoreError>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, fn(String) -> StoreError> = HashMap::new();
    table.insert(codes::OUT_OF_MEMORY, |description| {
        StoreError::OutOfMemory { description }
    });
    table.insert(codes::INTERNAL, |description| StoreError::Internal {
        description,
    });
    table.insert(codes::INTERFACE, |description| StoreError::Interface {
        description,
    });
    table.insert(codes::PLUGIN_MISBEHAVIOR, |description| {
        StoreError::PluginMisbehavior { description }
    });
    table.insert(codes::CONFLICTING_STATE, |description| {
        StoreError::ConflictingState { description }
    });
    table.insert(codes::VALIDATION_SYNTACTIC, |description| {
        StoreError::ValidationSyntactic { description }
    });
    table.insert(codes::VALIDATION_SEMANTIC, |description| {
        StoreError::ValidationSemantic { description }
    });
    table
});

impl StoreError {
    /// Builds an error from a backend-reported code and description.
    ///
    /// Unrecognized codes collapse into [`StoreError::Internal`] so that a
    /// misbehaving backend can never make a failure disappear.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::errors::{codes, StoreError};
    ///
    /// let err = StoreError::from_code(codes::CONFLICTING_STATE, "another writer got there first");
    /// assert!(matches!(err, StoreError::ConflictingState { .. }));
    /// ```
    pub fn from_code(code: &str, description: impl Into<String>) -> Self {
        let description = description.into();
        match CODE_TABLE.get(code) {
            Some(build) => build(description),
            None => StoreError::Internal {
                description: format!("unrecognized error code {code}: {description}"),
            },
        }
    }

    /// Reads the error metadata a backend attached to `key` and maps it to a
    /// typed error.
    ///
    /// A failure reported without a code becomes [`StoreError::Internal`].
    pub fn from_error_key(key: &Key) -> Self {
        let code = key.meta(ERROR_NUMBER_META);
        let description = key.meta(ERROR_DESCRIPTION_META);

        if code.is_empty() {
            return StoreError::Internal {
                description: if description.is_empty() {
                    "backend reported a failure without an error code".to_string()
                } else {
                    description
                },
            };
        }

        StoreError::from_code(&code, description)
    }

    /// Returns the wire code of backend-kind variants, `None` for errors that
    /// are only ever raised locally.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            StoreError::OutOfMemory { .. } => Some(codes::OUT_OF_MEMORY),
            StoreError::Internal { .. } => Some(codes::INTERNAL),
            StoreError::Interface { .. } => Some(codes::INTERFACE),
            StoreError::PluginMisbehavior { .. } => Some(codes::PLUGIN_MISBEHAVIOR),
            StoreError::ConflictingState { .. } => Some(codes::CONFLICTING_STATE),
            StoreError::ValidationSyntactic { .. } => Some(codes::VALIDATION_SYNTACTIC),
            StoreError::ValidationSemantic { .. } => Some(codes::VALIDATION_SEMANTIC),
            _ => None,
        }
    }
}

/// A specialized Result type for configuration store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_known_codes() {
        let codes = [
            codes::OUT_OF_MEMORY,
            codes::INTERNAL,
            codes::INTERFACE,
            codes::PLUGIN_MISBEHAVIOR,
            codes::CONFLICTING_STATE,
            codes::VALIDATION_SYNTACTIC,
            codes::VALIDATION_SEMANTIC,
        ];

        for code in codes {
            let err = StoreError::from_code(code, "details");
            assert_eq!(err.code(), Some(code));
        }
    }

    #[test]
    fn test_from_code_unknown_code() {
        let err = StoreError::from_code("C99999", "something odd");
        assert!(matches!(err, StoreError::Internal { .. }));
        assert!(err.to_string().contains("C99999"));
    }

    #[test]
    fn test_from_error_key_reads_metadata() {
        let key = Key::placeholder();
        key.set_meta(ERROR_NUMBER_META, codes::CONFLICTING_STATE)
            .unwrap();
        key.set_meta(ERROR_DESCRIPTION_META, "state advanced").unwrap();

        let err = StoreError::from_error_key(&key);
        assert!(matches!(err, StoreError::ConflictingState { .. }));
        assert!(err.to_string().contains("state advanced"));
    }

    #[test]
    fn test_from_error_key_without_code() {
        let key = Key::placeholder();
        let err = StoreError::from_error_key(&key);
        assert!(matches!(err, StoreError::Internal { .. }));
    }

    #[test]
    fn test_local_errors_have_no_code() {
        let err = StoreError::InvalidName {
            name: "bogus".to_string(),
            reason: "unknown namespace tag".to_string(),
        };
        assert_eq!(err.code(), None);

        let err = StoreError::InvalidArgument {
            reason: "placeholder".to_string(),
        };
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_invalid_name_display() {
        let err = StoreError::InvalidName {
            name: "a//b".to_string(),
            reason: "empty name segment".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid key name 'a//b': empty name segment"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = StoreError::from(io_error);
        assert!(matches!(err, StoreError::Io(_)));
    }
}
