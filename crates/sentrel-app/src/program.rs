//! Process-spawning [`ExternalProgramRunner`]: substitutes the `%hash%`
//! placeholder into a program's argument template, applies its configured
//! path mappings, and launches the result as a detached child process.

use async_trait::async_trait;
use tokio::process::Command;

use sentrel_actions::{ActionsError, ActionsResult, ExternalProgramRunner};
use sentrel_limits::CancelToken;
use sentrel_model::{ExternalProgram, PathMapping};

/// Placeholder substituted with the torrent's infohash before launch.
const HASH_PLACEHOLDER: &str = "%hash%";

/// Spawns a registered [`ExternalProgram`] as a child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessProgramRunner;

impl ProcessProgramRunner {
    /// Construct a runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExternalProgramRunner for ProcessProgramRunner {
    async fn invoke(
        &self,
        program: &ExternalProgram,
        hash: &str,
        path_mappings: &[PathMapping],
        cancel: &mut CancelToken,
    ) -> ActionsResult<()> {
        if cancel.is_cancelled() {
            return Err(ActionsError::Client("invocation cancelled before launch".to_string()));
        }

        let args = build_args(&program.args_template, hash, path_mappings);
        let mut command = Command::new(&program.path);
        command.args(&args);

        let status = command.status().await.map_err(|err| ActionsError::Client(format!("failed to launch {}: {err}", program.path)))?;
        if !status.success() {
            return Err(ActionsError::Client(format!("{} exited with {status}", program.path)));
        }
        Ok(())
    }
}

/// Split `template` on whitespace, substitute [`HASH_PLACEHOLDER`] with
/// `hash`, then apply every `path_mappings` prefix substitution to the
/// result. Does not attempt shell-style quoting; a template with quoted
/// arguments containing spaces is not supported.
fn build_args(template: &str, hash: &str, path_mappings: &[PathMapping]) -> Vec<String> {
    template
        .split_whitespace()
        .map(|token| {
            let substituted = token.replace(HASH_PLACEHOLDER, hash);
            path_mappings.iter().fold(substituted, |value, mapping| {
                if let Some(rest) = value.strip_prefix(mapping.from.as_str()) {
                    format!("{}{rest}", mapping.to)
                } else {
                    value
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_substitutes_the_hash_placeholder() {
        let args = build_args("--hash %hash% --verbose", "abc123", &[]);
        assert_eq!(args, vec!["--hash", "abc123", "--verbose"]);
    }

    #[test]
    fn build_args_applies_path_mappings_to_every_token() {
        let mappings = vec![PathMapping { from: "/downloads".to_string(), to: "/mnt/host/downloads".to_string() }];
        let args = build_args("/downloads/%hash%", "abc123", &mappings);
        assert_eq!(args, vec!["/mnt/host/downloads/abc123"]);
    }

    #[test]
    fn build_args_leaves_unmatched_tokens_untouched() {
        let mappings = vec![PathMapping { from: "/other".to_string(), to: "/elsewhere".to_string() }];
        let args = build_args("/downloads/%hash%", "abc123", &mappings);
        assert_eq!(args, vec!["/downloads/abc123"]);
    }
}
