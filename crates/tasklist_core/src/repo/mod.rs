//! Key-value store port and its adapters.
//!
//! # Responsibility
//! - Define the `get`/`set` contract the persistence adapter depends on.
//! - Keep SQLite details inside the core persistence boundary.
//!
//! # Invariants
//! - Keys are non-empty.
//! - `set` overwrites any prior value under the same key.

pub mod kv_repo;
