//! Shared wire types for the gotya artifact manager.
//!
//! This crate defines the canonical data structures used by both halves
//! of the system: the index generator (producer) and the resolver /
//! orchestrator (consumer). Nothing in here depends on the filesystem or
//! the network -- that behavior lives in `gotya-core`.

/// Typed hash wrappers.
pub mod hash;
/// The repository index wire format: parsing, writing, and search.
pub mod index;
/// The `meta/artifact.json` metadata record and hook specs.
pub mod metadata;
/// Configured index origins.
pub mod repository;
/// Core domain types: artifact names, versions, and descriptors.
pub mod types;

pub use hash::Sha256Hash;
pub use index::Index;
pub use metadata::{HookEvent, HookSpec, Metadata};
pub use repository::Repository;
pub use types::{ArtifactDescriptor, ArtifactError, ArtifactName, Dependency, Version};
