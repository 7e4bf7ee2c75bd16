//! The lifecycle hook interface (§4.9/§9): abstracted so the orchestrator
//! can trigger install/remove scripts without depending on a process
//! execution strategy.

use gotya_schema::HookEvent;
use thiserror::Error;

/// Everything a hook script needs to know about the artifact it's
/// running for.
#[derive(Debug, Clone)]
pub struct HookContext<'a> {
    /// Artifact name.
    pub name: &'a str,
    /// Artifact version.
    pub version: &'a str,
    /// Directory the artifact's files were unpacked into.
    pub install_dir: &'a std::path::Path,
}

/// Error running a lifecycle hook script.
#[derive(Error, Debug)]
pub enum HookError {
    /// The script process could not be spawned, or exited non-zero.
    #[error("hook script failed: {0}")]
    ScriptFailed(String),
}

/// Runs a single inline lifecycle script at the given event. Concrete
/// implementations (e.g. shelling out via `std::process::Command`) live
/// in the CLI collaborator layer; this crate depends only on the trait.
pub trait RunHook: Send + Sync {
    /// Execute `script` for `event` against `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::ScriptFailed`] if the script could not be run
    /// or exited with a non-zero status.
    fn run(&self, event: HookEvent, script: &str, ctx: &HookContext<'_>) -> Result<(), HookError>;
}

/// A hook runner that does nothing. Used where no hook execution is
/// configured (tests, `--dry-run` simulations).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHookRunner;

impl RunHook for NullHookRunner {
    fn run(&self, _event: HookEvent, _script: &str, _ctx: &HookContext<'_>) -> Result<(), HookError> {
        Ok(())
    }
}
