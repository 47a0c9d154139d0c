//! Durable catalog of admitted media items.
//!
//! The catalog is the source of truth for feed generation: membership is
//! exactly "items successfully extracted and not yet removed." It is
//! loaded at startup and a fresh snapshot is persisted after every
//! admitted mutation, before any feed document is written, so a crash
//! between persistence and regeneration is recoverable by re-rendering
//! from the snapshot.

pub mod catalog;

pub use catalog::{Catalog, CatalogError};
