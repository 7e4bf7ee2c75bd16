//! Shells out to run a lifecycle hook's inline script via
//! `std::process::Command`.

use gotya_core::hooks::{HookContext, HookError, RunHook};
use gotya_schema::HookEvent;

/// Runs a hook script through the platform shell (`sh -c` on unix,
/// `cmd /C` on windows), exposing the artifact name/version/event as
/// environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellHookRunner;

impl RunHook for ShellHookRunner {
    fn run(&self, event: HookEvent, script: &str, ctx: &HookContext<'_>) -> Result<(), HookError> {
        let event_name = match event {
            HookEvent::PreInstall => "pre-install",
            HookEvent::PostInstall => "post-install",
            HookEvent::PreRemove => "pre-remove",
            HookEvent::PostRemove => "post-remove",
        };

        let mut command = shell_command(script);
        command
            .env("GOTYA_ARTIFACT_NAME", ctx.name)
            .env("GOTYA_ARTIFACT_VERSION", ctx.version)
            .env("GOTYA_EVENT", event_name)
            .current_dir(ctx.install_dir);

        let status = command
            .status()
            .map_err(|e| HookError::ScriptFailed(format!("failed to spawn hook script: {e}")))?;

        if !status.success() {
            return Err(HookError::ScriptFailed(format!(
                "{event_name} hook exited with {status}"
            )));
        }
        Ok(())
    }
}

#[cfg(unix)]
fn shell_command(script: &str) -> std::process::Command {
    let mut command = std::process::Command::new("sh");
    command.arg("-c").arg(script);
    command
}

#[cfg(windows)]
fn shell_command(script: &str) -> std::process::Command {
    let mut command = std::process::Command::new("cmd");
    command.arg("/C").arg(script);
    command
}
