//! Synchronization engine.
//!
//! Orchestrates what happens once a filesystem change has been
//! classified: wait for the file to settle, extract its metadata, update
//! the persisted catalog, and recompute only the feed documents the
//! change touched. The engine's state mutex is the single serialization
//! point for catalog mutation.

pub mod engine;

pub use engine::{AddOutcome, RemoveOutcome, SyncEngine, SyncError};
