//! Adapters that live inside the domain crate for convenience.
//!
//! The in-memory repository backs unit tests, the demo binary and the
//! server's `memory` storage mode. SQLite lives in its own crate.

pub mod memory_repo;
