// SPDX-License-Identifier: MIT OR Apache-2.0

//! Optimistic-concurrency example: two sessions racing on one store.
//!
//! This example demonstrates:
//! - Two independent sessions on the same store
//! - A conflicting set and the error it produces
//! - The documented recovery: re-get, reapply, set again
//!
//! To run this example:
//! ```bash
//! cargo run --example conflict_retry
//! ```

use cascfg::prelude::*;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    println!("=== Configuration Store: Conflict and Retry ===\n");

    let store = MemoryStore::new();
    let root = Key::new("user/demo/shared")?;

    let mut alice = Session::open(Box::new(store.backend()), &Key::placeholder())?;
    let mut bob = Session::open(Box::new(store.backend()), &Key::placeholder())?;

    // Both sessions observe the same starting state.
    let mut alice_ks = KeySet::new();
    alice.get(&mut alice_ks, &root)?;
    let mut bob_ks = KeySet::new();
    bob.get(&mut bob_ks, &root)?;

    // Alice wins the race.
    alice_ks.append_key(Key::with_text("user/demo/shared/owner", "alice")?)?;
    alice.set(&mut alice_ks, &root)?;
    println!("✓ alice persisted her change");

    // Bob's set is now stale and must fail.
    bob_ks.append_key(Key::with_text("user/demo/shared/theme", "dark")?)?;
    match bob.set(&mut bob_ks, &root) {
        Err(StoreError::ConflictingState { .. }) => {
            println!("✗ bob conflicted, as expected");
        }
        other => {
            println!("unexpected outcome: {:?}", other.map(|_| ()));
            return Ok(());
        }
    }

    // Recovery: re-get, reapply the intended change, set again.
    bob.get(&mut bob_ks, &root)?;
    bob_ks.append_key(Key::with_text("user/demo/shared/theme", "dark")?)?;
    bob.set(&mut bob_ks, &root)?;
    println!("✓ bob retried his cycle and succeeded\n");

    let mut reader = Session::open(Box::new(store.backend()), &Key::placeholder())?;
    let mut read = KeySet::new();
    reader.get(&mut read, &root)?;
    println!("final state:");
    for key in &read {
        println!("  {}", key);
    }

    Ok(())
}
