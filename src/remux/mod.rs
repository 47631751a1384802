//! Materialization of an imported file at its library path.
//!
//! Matroska sources are moved into place. Anything else is remuxed into
//! matroska with stream copy, trying each configured tool in turn. Remux
//! output goes to a hidden partial file next to the destination and is only
//! renamed into place once a tool succeeds.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ImportError;
use crate::paths::DESTINATION_EXTENSION;

/// Exit status and captured output of one tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Best description of a failure: stderr, or stdout when stderr is empty.
    pub fn diagnostics(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

#[async_trait]
pub trait RemuxRunner: Send + Sync {
    /// Run `tool <input_args> -i <input> <output_args> <output>`.
    async fn run(
        &self,
        tool: &str,
        input_args: &[String],
        input: &Path,
        output_args: &[String],
        output: &Path,
    ) -> Result<ToolOutput>;
}

/// Runs remux tools as child processes.
#[derive(Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl RemuxRunner for ProcessRunner {
    async fn run(
        &self,
        tool: &str,
        input_args: &[String],
        input: &Path,
        output_args: &[String],
        output: &Path,
    ) -> Result<ToolOutput> {
        let mut cmd = Command::new(tool);
        cmd.args(input_args);
        cmd.arg("-i").arg(input);
        cmd.args(output_args);
        cmd.arg(output);

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!("Executing remux command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to start {}", tool))?;

        Ok(ToolOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// One entry of the remux fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemuxStep {
    pub tool: String,
    pub input_args: Vec<String>,
    pub output_args: Vec<String>,
}

impl RemuxStep {
    fn new(tool: &str, input_args: &[&str], output_args: &[&str]) -> Self {
        let owned = |args: &[&str]| args.iter().map(|a| a.to_string()).collect();
        Self {
            tool: tool.to_string(),
            input_args: owned(input_args),
            output_args: owned(output_args),
        }
    }

    /// Plain stream copy of every stream.
    pub fn primary(tool: &str) -> Self {
        Self::new(tool, &[], &["-map", "0", "-c", "copy", "-y"])
    }

    /// Stream copy with regenerated timestamps, for sources whose timestamps
    /// matroska rejects.
    pub fn secondary(tool: &str) -> Self {
        Self::new(tool, &["-fflags", "+genpts"], &["-map", "0", "-c", "copy", "-y"])
    }
}

/// How a file ended up at its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    AlreadyImported,
    Moved,
    Remuxed { tool: String },
}

pub struct MediaMaterializer {
    runner: Arc<dyn RemuxRunner>,
    steps: Vec<RemuxStep>,
    disable_source: bool,
}

impl MediaMaterializer {
    pub fn new(config: &Config, runner: Arc<dyn RemuxRunner>) -> Self {
        Self {
            runner,
            steps: vec![
                RemuxStep::primary(&config.remux_tool),
                RemuxStep::secondary(&config.fallback_remux_tool),
            ],
            disable_source: config.disable_source_after_remux,
        }
    }

    pub fn steps(&self) -> &[RemuxStep] {
        &self.steps
    }

    /// Produce `destination` from `source`. A regular file already at the
    /// destination counts as done, so running an import twice is harmless.
    pub async fn materialize(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<Materialized, ImportError> {
        match tokio::fs::metadata(destination).await {
            Ok(meta) if meta.is_file() => {
                info!("✅ Already imported: {:?}", destination);
                return Ok(Materialized::AlreadyImported);
            }
            Ok(_) => {
                return Err(ImportError::Materialization {
                    path: destination.to_path_buf(),
                    reason: "destination exists and is not a regular file".to_string(),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ImportError::Materialization {
                    path: destination.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }

        if !tokio::fs::metadata(source)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
        {
            return Err(ImportError::Materialization {
                path: source.to_path_buf(),
                reason: "source is not a regular file".to_string(),
            });
        }

        let parent = destination
            .parent()
            .ok_or_else(|| ImportError::Materialization {
                path: destination.to_path_buf(),
                reason: "destination has no parent directory".to_string(),
            })?;
        let created = create_dirs(parent).await?;

        let result = if is_matroska(source) {
            move_file(source, destination)
                .await
                .map(|_| Materialized::Moved)
                .map_err(|e| ImportError::Materialization {
                    path: destination.to_path_buf(),
                    reason: e.to_string(),
                })
        } else {
            self.remux(source, destination, parent).await
        };

        match result {
            Ok(materialized) => {
                if matches!(materialized, Materialized::Remuxed { .. }) && self.disable_source {
                    if let Err(e) = disable_source(source).await {
                        warn!("⚠️ Could not disable source {:?}: {}", source, e);
                    }
                }
                Ok(materialized)
            }
            Err(e) => {
                remove_created_dirs(&created).await;
                Err(e)
            }
        }
    }

    async fn remux(
        &self,
        source: &Path,
        destination: &Path,
        dir: &Path,
    ) -> Result<Materialized, ImportError> {
        let partial = dir.join(format!(".{}.partial.{}", Uuid::new_v4(), DESTINATION_EXTENSION));
        let mut failures = Vec::new();

        for step in &self.steps {
            info!("🎬 Remuxing {:?} with {}", source, step.tool);

            match self
                .runner
                .run(&step.tool, &step.input_args, source, &step.output_args, &partial)
                .await
            {
                Ok(output) if output.success => {
                    if let Err(e) = tokio::fs::rename(&partial, destination).await {
                        let _ = tokio::fs::remove_file(&partial).await;
                        return Err(ImportError::Materialization {
                            path: destination.to_path_buf(),
                            reason: format!("cannot move remuxed output into place: {}", e),
                        });
                    }
                    info!("✅ Remux successful: {:?} -> {:?}", source, destination);
                    return Ok(Materialized::Remuxed {
                        tool: step.tool.clone(),
                    });
                }
                Ok(output) => {
                    error!("{} failed ({}): {}", step.tool, output.status, output.diagnostics());
                    failures.push(format!(
                        "{} ({}): {}",
                        step.tool,
                        output.status,
                        output.diagnostics()
                    ));
                }
                Err(e) => {
                    error!("{} could not run: {:#}", step.tool, e);
                    failures.push(format!("{}: {:#}", step.tool, e));
                }
            }

            let _ = tokio::fs::remove_file(&partial).await;
        }

        Err(ImportError::RemuxFailed {
            input: source.to_path_buf(),
            failures: failures.join("\n"),
        })
    }
}

fn is_matroska(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mkv"))
}

/// Create `dir` and its missing ancestors. Returns the directories that were
/// created, outermost first. On failure nothing created here is left behind.
async fn create_dirs(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let mut missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
        .map(Path::to_path_buf)
        .collect();
    missing.reverse();

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        remove_created_dirs(&missing).await;
        return Err(ImportError::Materialization {
            path: dir.to_path_buf(),
            reason: format!("cannot create directory: {}", e),
        });
    }
    if !missing.is_empty() {
        debug!("Created directories: {:?}", missing);
    }
    Ok(missing)
}

async fn remove_created_dirs(created: &[PathBuf]) {
    for dir in created.iter().rev() {
        if let Err(e) = tokio::fs::remove_dir(dir).await {
            debug!("Leaving {:?} in place: {}", dir, e);
        }
    }
}

/// Rename, falling back to copy and delete across filesystems.
async fn move_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    if let Err(e) = tokio::fs::rename(source, destination).await {
        debug!("Rename failed ({}), copying instead", e);
        copy_then_remove(source, destination).await?;
    }

    info!("📁 Moved file: {:?} -> {:?}", source, destination);
    Ok(())
}

/// Copy `source` to `destination`, then delete `source`. A partial copy is
/// removed again.
async fn copy_then_remove(source: &Path, destination: &Path) -> std::io::Result<()> {
    if let Err(e) = tokio::fs::copy(source, destination).await {
        let _ = tokio::fs::remove_file(destination).await;
        return Err(e);
    }
    tokio::fs::remove_file(source).await
}

async fn disable_source(source: &Path) -> std::io::Result<()> {
    let disabled = source.with_extension(format!(
        "{}.disabled",
        source
            .extension()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    ));

    tokio::fs::rename(source, &disabled).await?;
    debug!("Renamed source file: {:?} -> {:?}", source, disabled);
    Ok(())
}
