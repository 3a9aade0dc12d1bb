// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! This module contains the trait definitions (ports) that storage backends
//! implement. The bundled implementations live in the adapters layer.

pub mod backend;

// Re-export commonly used types
pub use backend::{clear_error, report_error, Backend, BackendStatus};
