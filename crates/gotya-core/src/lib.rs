//! Core engine for the gotya artifact manager.
//!
//! This crate implements the hard core of the package manager:
//! semver/constraint evaluation, platform matching, the index model and
//! repository manager, the index generator, the concurrent downloader,
//! the dependency resolver, and the orchestrator that sequences them.
//! Everything here is free of any particular CLI or UI; `gotya-cli`
//! supplies the concrete collaborators (archive reader, hook runner,
//! artifact database, terminal reporter) that this crate only depends on
//! through traits.

/// Configuration loading: repositories, cache/home directories, defaults.
pub mod config;
/// Semver constraint parsing and evaluation.
pub mod constraint;
/// The index generator: walk a directory of artifacts, emit an index.
pub mod generator;
/// Hook lifecycle trait consumed by the orchestrator.
pub mod hooks;
/// In-memory, multi-repository index cache (the "repository manager").
pub mod index_store;
/// I/O utilities: downloading and archive extraction.
pub mod io;
/// Sequences sync -> resolve -> download -> install/update/uninstall/cleanup.
pub mod orchestrator;
/// Filesystem path helpers for the gotya directory layout.
pub mod paths;
/// Platform (os/arch) matching between descriptors and requests.
pub mod platform;
/// Progress event taxonomy and the sink trait the orchestrator reports through.
pub mod reporter;
/// The dependency resolver.
pub mod resolver;
/// Installed-artifact store trait and value types (the "artifact manager").
pub mod store;

/// User agent string sent with every HTTP request this crate issues.
pub const USER_AGENT: &str = concat!("gotya/", env!("CARGO_PKG_VERSION"));
