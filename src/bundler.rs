//! Artifact and frontend bundlers
//!
//! `ArtifactBundler` drives one compiler invocation per entrypoint:
//! delete the stale output directory, compile, inject the host shim,
//! copy the whole tree to staging. The delete-then-rebuild discipline is
//! a correctness requirement: the compiler is not guaranteed to overwrite
//! every file a previous run generated.
//!
//! `FrontendBundler` applies the same discipline to the frontend build
//! tool's conventional output directory before invoking it.

use std::path::{Path, PathBuf};

use crate::error::{SkiffError, SkiffResult};
use crate::models::{CompiledArtifact, Entrypoint, StaticBundle};
use crate::shim;
use crate::stage;
use crate::toolchain::{Compiler, FrontendTool};

/// Builds one compiled artifact per (renderer module, entrypoint) pair.
pub struct ArtifactBundler<'a, C: Compiler> {
    compiler: &'a C,
    renderer_dir: PathBuf,
    /// Fixed relative path of the compiled entry file, e.g. `dist/index.js`
    out_rel: PathBuf,
}

impl<'a, C: Compiler> ArtifactBundler<'a, C> {
    pub fn new(compiler: &'a C, renderer_dir: PathBuf, out_rel: PathBuf) -> Self {
        Self {
            compiler,
            renderer_dir,
            out_rel,
        }
    }

    fn build_out_dir(&self) -> SkiffResult<PathBuf> {
        match self.out_rel.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                Ok(self.renderer_dir.join(parent))
            }
            _ => Err(SkiffError::Config {
                file: PathBuf::from("skiff.toml"),
                message: format!(
                    "renderer.out '{}' must include an output directory (e.g. dist/index.js)",
                    self.out_rel.display()
                ),
            }),
        }
    }

    /// Compile `entrypoint` and stage the result at `staging_dir`.
    ///
    /// After a successful call, `staging_dir` contains exactly the files
    /// this build produced plus the shim-modified entry file.
    pub fn build(&self, entrypoint: Entrypoint, staging_dir: &Path) -> SkiffResult<CompiledArtifact> {
        let build_out = self.build_out_dir()?;
        stage::clean_dir(&build_out)?;

        self.compiler
            .compile(entrypoint, &self.renderer_dir, &self.out_rel)?;

        let entry = self.renderer_dir.join(&self.out_rel);
        shim::inject(&entry)?;

        stage::clean_dir(staging_dir)?;
        stage::copy_tree(&build_out, staging_dir)?;

        let entry_name = self.out_rel.file_name().unwrap_or_default();
        let staged_entry = staging_dir.join(entry_name);
        CompiledArtifact::new(entrypoint, staging_dir.to_path_buf(), staged_entry)
    }
}

/// Builds and stages the static frontend bundle.
pub struct FrontendBundler<'a, T: FrontendTool> {
    tool: &'a T,
    frontend_dir: PathBuf,
    /// The tool's conventional output directory, relative to `frontend_dir`
    out_rel: PathBuf,
}

impl<'a, T: FrontendTool> FrontendBundler<'a, T> {
    pub fn new(tool: &'a T, frontend_dir: PathBuf, out_rel: PathBuf) -> Self {
        Self {
            tool,
            frontend_dir,
            out_rel,
        }
    }

    pub fn build(&self, staging_dir: &Path) -> SkiffResult<StaticBundle> {
        let build_out = self.frontend_dir.join(&self.out_rel);
        // same discipline as the artifact builds: the external tool is not
        // trusted to fully own its output directory
        stage::clean_dir(&build_out)?;

        self.tool.build(&self.frontend_dir)?;

        stage::clean_dir(staging_dir)?;
        stage::copy_tree(&build_out, staging_dir)?;
        Ok(StaticBundle {
            out_dir: staging_dir.to_path_buf(),
        })
    }
}
