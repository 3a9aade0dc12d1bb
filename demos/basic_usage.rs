// SPDX-License-Identifier: MIT OR Apache-2.0

//! Basic usage example for the configuration store crate.
//!
//! This example demonstrates:
//! - Opening a session on a shared in-memory store
//! - The get-modify-set cycle
//! - Keys, values, booleans, bytes and metadata
//! - Cascading lookup across namespaces
//!
//! To run this example:
//! ```bash
//! cargo run --example basic_usage
//! ```

use cascfg::prelude::*;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    println!("=== Configuration Store: Basic Usage ===\n");

    let store = MemoryStore::new();
    let root = Key::new("user/demo")?;

    let mut session = Session::open(Box::new(store.backend()), &Key::placeholder())?;

    // Always get before mutating: this is what arms the conflict check.
    println!("--- Example 1: Get, modify, set ---");
    let mut ks = KeySet::new();
    session.get(&mut ks, &root)?;

    ks.append_key(Key::with_text("user/demo/host", "localhost")?)?;
    ks.append_key(Key::with_text("user/demo/port", "5432")?)?;

    let debug = Key::new("user/demo/debug")?;
    debug.set_boolean(true);
    ks.append_key(debug)?;

    let changed = session.set(&mut ks, &root)?;
    println!("✓ persisted {} keys (changed: {})\n", ks.len(), changed);

    // Example 2: a second session sees the persisted state.
    println!("--- Example 2: Reading from a fresh session ---");
    let mut reader = Session::open(Box::new(store.backend()), &Key::placeholder())?;
    let mut read = KeySet::new();
    reader.get(&mut read, &root)?;

    for key in &read {
        println!("  {}", key);
    }
    println!();

    // Example 3: metadata and binary values.
    println!("--- Example 3: Metadata and bytes ---");
    let icon = Key::new("user/demo/icon")?;
    icon.set_bytes(&[0x89, 0x50, 0x4e, 0x47]);
    icon.set_meta("mimetype", "image/png")?;
    println!(
        "✓ {} carries {} bytes, mimetype {}",
        icon.name(),
        icon.bytes().len(),
        icon.meta("mimetype")
    );
    println!();

    // Example 4: cascading lookup resolves across namespaces.
    println!("--- Example 4: Cascading lookup ---");
    let mut layered = KeySet::new();
    layered.append_key(Key::with_text("system/demo/host", "fallback.example.org")?)?;
    layered.append_key(Key::with_text("user/demo/host", "localhost")?)?;

    if let Some(found) = layered.lookup_by_name("/demo/host") {
        println!("✓ '/demo/host' resolved to {}", found.name());
    }
    println!();

    println!("--- Example 5: Backend version ---");
    println!("store version: {}\n", session.version()?);

    session.close(&Key::placeholder())?;
    reader.close(&Key::placeholder())?;

    println!("=== Example Complete ===");
    Ok(())
}
