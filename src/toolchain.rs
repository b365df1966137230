//! External toolchain capability traits
//!
//! Each external build step is modelled as a trait so the orchestrator's
//! sequencing and failure logic can be exercised with fakes, independent of
//! the real toolchains. The real implementations run subprocesses with
//! inherited standard streams: build diagnostics go straight to the
//! operator's terminal, never parsed. A non-zero exit code is the sole
//! failure signal.

use std::path::Path;
use std::process::Command;

use crate::error::{SkiffError, SkiffResult};
use crate::models::Entrypoint;

/// Compiles one renderer entrypoint to JavaScript.
pub trait Compiler {
    /// Compile `entrypoint` inside `project_dir`, writing the entry file to
    /// the fixed relative path `out_rel` (plus any generated support files
    /// alongside it).
    fn compile(&self, entrypoint: Entrypoint, project_dir: &Path, out_rel: &Path)
        -> SkiffResult<()>;
}

/// Builds the static frontend into its conventional `dist/` directory.
pub trait FrontendTool {
    fn build(&self, project_dir: &Path) -> SkiffResult<()>;
}

/// Run a prepared command with inherited stdio; map a non-zero exit to
/// `BuildFailure` for `entrypoint`.
fn run_build_step(mut cmd: Command, program: &str, entrypoint: &str) -> SkiffResult<()> {
    let status = cmd.status().map_err(|e| SkiffError::ToolchainSpawn {
        program: program.to_string(),
        source: e,
    })?;
    if !status.success() {
        return Err(SkiffError::BuildFailure {
            entrypoint: entrypoint.to_string(),
        });
    }
    Ok(())
}

/// The Dart-to-JavaScript compiler, in server-optimized mode.
#[derive(Debug, Clone)]
pub struct DartCompiler {
    /// Executable name or path (`dart` by default, overridable in config)
    pub program: String,
}

impl DartCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Compiler for DartCompiler {
    fn compile(
        &self,
        entrypoint: Entrypoint,
        project_dir: &Path,
        out_rel: &Path,
    ) -> SkiffResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["compile", "js", "--server-mode", "--output"])
            .arg(out_rel)
            .arg(entrypoint.source_file())
            .current_dir(project_dir);
        run_build_step(cmd, &self.program, entrypoint.as_str())
    }
}

/// The frontend build tool (`pnpm run build` against a vite project).
#[derive(Debug, Clone)]
pub struct PnpmBuilder {
    pub program: String,
}

impl PnpmBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl FrontendTool for PnpmBuilder {
    fn build(&self, project_dir: &Path) -> SkiffResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["run", "build"]).current_dir(project_dir);
        run_build_step(cmd, &self.program, "frontend")
    }
}
