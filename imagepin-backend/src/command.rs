//! Builder and publisher that shell out to external tools.
//!
//! Arguments may contain placeholders that are expanded per reference:
//!
//! | Placeholder     | Value                                      |
//! |-----------------|--------------------------------------------|
//! | `{reference}`   | canonical reference, `ko://github.com/…`   |
//! | `{import_path}` | reference without the scheme               |
//! | `{artifact}`    | build output (publisher only)              |
//!
//! The last non-empty stdout line is the command's answer. Stderr is kept
//! for error messages.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use imagepin_core::config::CommandConfig;
use imagepin_core::{Artifact, BoxError, Builder, CanonicalReference, Publisher, ResolvedDigest};

use crate::error::BackendError;

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// An argv template plus its environment.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    argv: Vec<String>,
    env: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl CommandRunner {
    pub fn new(config: &CommandConfig) -> Self {
        Self {
            argv: config.command.clone(),
            env: config.env.clone(),
            working_dir: config.working_dir.clone(),
        }
    }

    fn expand(&self, vars: &[(&str, &str)]) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (name, value)| {
                    acc.replace(&format!("{{{name}}}"), value)
                })
            })
            .collect()
    }

    /// Run the command and return its last non-empty stdout line.
    ///
    /// The child is killed if `cancel` fires first.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        vars: &[(&str, &str)],
    ) -> Result<String, BackendError> {
        let argv = self.expand(vars);
        let Some((program, args)) = argv.split_first() else {
            return Err(BackendError::EmptyCommand);
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(program = %program, args = ?args, "running command");
        let child = cmd.spawn().map_err(|source| BackendError::Spawn {
            program: program.clone(),
            source,
        })?;

        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|source| BackendError::Spawn {
                program: program.clone(),
                source,
            })?,
            _ = cancel.cancelled() => {
                return Err(BackendError::Cancelled {
                    operation: format!("running {program}"),
                });
            }
        };

        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                program: program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(str::to_owned)
            .ok_or_else(|| BackendError::EmptyOutput {
                program: program.clone(),
            })
    }

    fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

/// Reject import paths no build tool could make sense of.
pub fn validate_import_path(import_path: &str) -> Result<(), BackendError> {
    let invalid = |reason| BackendError::InvalidImportPath {
        import_path: import_path.to_owned(),
        reason,
    };
    if import_path.is_empty() {
        return Err(invalid("empty import path"));
    }
    if import_path.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }
    for segment in import_path.split('/') {
        match segment {
            "" => return Err(invalid("empty path segment")),
            ".." => return Err(invalid("parent directory segment")),
            _ => {}
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds by running a command; a stdout line naming an existing file is a
/// [`Artifact::Path`], anything else an [`Artifact::Image`].
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    runner: CommandRunner,
}

impl CommandBuilder {
    pub fn new(config: &CommandConfig) -> Self {
        Self {
            runner: CommandRunner::new(config),
        }
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    type Artifact = Artifact;

    fn is_supported_reference(&self, reference: &CanonicalReference) -> Result<(), BoxError> {
        validate_import_path(reference.import_path())?;
        Ok(())
    }

    async fn build(
        &self,
        cancel: &CancellationToken,
        reference: &CanonicalReference,
    ) -> Result<Artifact, BoxError> {
        let line = self
            .runner
            .run(
                cancel,
                &[
                    ("reference", reference.as_str()),
                    ("import_path", reference.import_path()),
                ],
            )
            .await?;

        let is_file = tokio::fs::metadata(&line)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        let artifact = if is_file {
            Artifact::Path(PathBuf::from(line))
        } else {
            Artifact::Image(line)
        };
        tracing::debug!(reference = %reference, artifact = %artifact, "built");
        Ok(artifact)
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Publishes by running a command whose last stdout line is the image
/// reference.
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    runner: CommandRunner,
}

impl CommandPublisher {
    pub fn new(config: &CommandConfig) -> Self {
        Self {
            runner: CommandRunner::new(config),
        }
    }
}

#[async_trait]
impl Publisher<Artifact> for CommandPublisher {
    async fn publish(
        &self,
        cancel: &CancellationToken,
        artifact: Artifact,
        reference: &CanonicalReference,
    ) -> Result<ResolvedDigest, BoxError> {
        let artifact = artifact.to_string();
        let line = self
            .runner
            .run(
                cancel,
                &[
                    ("reference", reference.as_str()),
                    ("import_path", reference.import_path()),
                    ("artifact", artifact.as_str()),
                ],
            )
            .await?;

        if line.chars().any(char::is_whitespace) {
            return Err(BackendError::InvalidOutput {
                program: self.runner.program().to_owned(),
                output: line,
            }
            .into());
        }
        Ok(ResolvedDigest::from(line))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(argv: &[&str]) -> CommandRunner {
        CommandRunner::new(&CommandConfig {
            command: argv.iter().map(|s| s.to_string()).collect(),
            env: BTreeMap::new(),
            working_dir: None,
        })
    }

    #[test]
    fn placeholders_expand_inside_arguments() {
        let r = runner(&["ko", "build", "--image={import_path}", "{reference}", "{unknown}"]);
        let argv = r.expand(&[
            ("reference", "ko://github.com/acme/app"),
            ("import_path", "github.com/acme/app"),
        ]);
        assert_eq!(
            argv,
            vec![
                "ko",
                "build",
                "--image=github.com/acme/app",
                "ko://github.com/acme/app",
                "{unknown}"
            ]
        );
    }

    #[test]
    fn import_path_validation() {
        assert!(validate_import_path("github.com/acme/app/cmd/server").is_ok());
        assert!(validate_import_path("./cmd/server").is_ok());
        assert!(validate_import_path("").is_err());
        assert!(validate_import_path("github.com//app").is_err());
        assert!(validate_import_path("github.com/acme/../app").is_err());
        assert!(validate_import_path("github.com/acme app").is_err());
    }
}
