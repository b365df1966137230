//! Build-and-deploy pipeline
//!
//! Sequences the whole run: acquire the per-checkout lock, build both
//! renderer artifacts, build the frontend, then hand the staged outputs to
//! the deployer. Steps run one after another because each consumes the
//! previous step's output; a single cancellation flag is checked between
//! steps so a ctrl-c aborts before the next blocking call starts.
//!
//! The two artifact builds are logically independent, but they share the
//! renderer's fixed `dist/` output path, so they run back to back rather
//! than in parallel. Both must succeed before any deploy step runs.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fs2::FileExt;

use crate::bundler::{ArtifactBundler, FrontendBundler};
use crate::config::Config;
use crate::deploy::{AwsCli, DeployEventSink, Deployer};
use crate::error::{SkiffError, SkiffResult};
use crate::models::{
    BuiltArtifacts, CompiledArtifact, DeploymentResult, Entrypoint, StaticBundle,
};
use crate::toolchain::{DartCompiler, PnpmBuilder};

/// Shared cancellation flag, set from the ctrl-c handler and checked
/// between pipeline steps.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Abort the pipeline if a cancellation was requested.
    pub fn check(&self) -> SkiffResult<()> {
        if self.is_cancelled() {
            Err(SkiffError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Wire the process interrupt signal to `flag`.
pub fn install_interrupt_handler(flag: &CancelFlag) -> SkiffResult<()> {
    let flag = flag.clone();
    ctrlc::set_handler(move || flag.cancel())
        .map_err(|e| SkiffError::Io(std::io::Error::other(e.to_string())))
}

/// Staging layout under `<project>/<stage_dir>/`.
#[derive(Debug, Clone)]
pub struct StagePaths {
    pub primary: PathBuf,
    pub edge: PathBuf,
    pub frontend: PathBuf,
    pub lock: PathBuf,
}

impl StagePaths {
    pub fn new(project_root: &Path, config: &Config) -> Self {
        let base = project_root.join(&config.deploy.stage_dir);
        Self {
            primary: base.join("primary"),
            edge: base.join("edge"),
            frontend: base.join("frontend"),
            lock: base.join("deploy.lock"),
        }
    }

    pub fn base(&self) -> &Path {
        // all four live directly under the staging base
        self.lock.parent().expect("stage lock has a parent")
    }
}

/// Exclusive deploy-in-progress lock, one per project checkout.
///
/// The staging directories are owned by exactly one pipeline invocation at
/// a time; a second invocation fails fast instead of corrupting staged
/// output. Released when dropped.
#[derive(Debug)]
pub struct DeployLock {
    _file: File,
    path: PathBuf,
}

impl DeployLock {
    pub fn acquire(path: &Path) -> SkiffResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        file.try_lock_exclusive().map_err(|_| SkiffError::LockHeld {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The full build-and-deploy pipeline for one project checkout.
pub struct Pipeline<'a> {
    config: &'a Config,
    project_root: &'a Path,
    cancel: CancelFlag,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, project_root: &'a Path, cancel: CancelFlag) -> Self {
        Self {
            config,
            project_root,
            cancel,
        }
    }

    pub fn stage_paths(&self) -> StagePaths {
        StagePaths::new(self.project_root, self.config)
    }

    fn staging_dir_for(&self, entrypoint: Entrypoint) -> PathBuf {
        let paths = self.stage_paths();
        match entrypoint {
            Entrypoint::Primary => paths.primary,
            Entrypoint::Edge => paths.edge,
        }
    }

    /// Compile, shim, and stage one renderer artifact.
    pub fn build_artifact(&self, entrypoint: Entrypoint) -> SkiffResult<CompiledArtifact> {
        self.cancel.check()?;
        let compiler = DartCompiler::new(&self.config.toolchain.compiler);
        let bundler = ArtifactBundler::new(
            &compiler,
            self.project_root.join(&self.config.renderer.dir),
            self.config.renderer.out.clone(),
        );
        bundler.build(entrypoint, &self.staging_dir_for(entrypoint))
    }

    /// Compile, shim, and stage both renderer artifacts.
    pub fn build_artifacts(&self) -> SkiffResult<BuiltArtifacts> {
        let primary = self.build_artifact(Entrypoint::Primary)?;
        let edge = self.build_artifact(Entrypoint::Edge)?;
        Ok(BuiltArtifacts { primary, edge })
    }

    /// Build and stage the static frontend bundle.
    pub fn build_frontend(&self) -> SkiffResult<StaticBundle> {
        self.cancel.check()?;
        let tool = PnpmBuilder::new(&self.config.toolchain.frontend_builder);
        let bundler = FrontendBundler::new(
            &tool,
            self.project_root.join(&self.config.frontend.dir),
            self.config.frontend.out.clone(),
        );
        bundler.build(&self.stage_paths().frontend)
    }

    /// Build everything. Both artifacts and the bundle must exist before
    /// any deploy step runs.
    pub fn build_all(&self) -> SkiffResult<(BuiltArtifacts, StaticBundle)> {
        let artifacts = self.build_artifacts()?;
        let bundle = self.build_frontend()?;
        Ok((artifacts, bundle))
    }

    /// Reload previously staged outputs for a `--skip-build` deploy.
    ///
    /// Fails with a staging error if the staged entry files are missing.
    pub fn load_staged(&self) -> SkiffResult<(BuiltArtifacts, StaticBundle)> {
        let paths = self.stage_paths();
        let entry_name = self
            .config
            .renderer
            .out
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();

        let load = |entrypoint: Entrypoint, dir: &Path| {
            CompiledArtifact::new(entrypoint, dir.to_path_buf(), dir.join(&entry_name)).map_err(
                |_| SkiffError::StageFailure {
                    path: dir.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no staged artifact; run 'skiff build' first",
                    ),
                },
            )
        };
        let artifacts = BuiltArtifacts {
            primary: load(Entrypoint::Primary, &paths.primary)?,
            edge: load(Entrypoint::Edge, &paths.edge)?,
        };

        if !paths.frontend.is_dir() {
            return Err(SkiffError::StageFailure {
                path: paths.frontend.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no staged frontend bundle; run 'skiff build' first",
                ),
            });
        }
        Ok((artifacts, StaticBundle {
            out_dir: paths.frontend,
        }))
    }

    /// Run the deploy steps against the real cloud ports.
    pub fn deploy(
        &self,
        artifacts: &BuiltArtifacts,
        bundle: &StaticBundle,
        sink: &dyn DeployEventSink,
    ) -> SkiffResult<DeploymentResult> {
        let distribution_id = self.config.require_distribution_id()?;
        let aws = AwsCli::new(&self.config.toolchain, &self.config.deploy);
        Deployer::new(&aws, &aws, &aws).deploy(
            &self.config.deploy,
            distribution_id,
            artifacts,
            bundle,
            &self.cancel,
            sink,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cancel_flag_check_fails_only_after_cancel() {
        let flag = CancelFlag::new();
        assert!(flag.check().is_ok());
        flag.cancel();
        assert!(matches!(flag.check(), Err(SkiffError::Cancelled)));
        // clones observe the same state
        assert!(flag.clone().is_cancelled());
    }

    #[test]
    fn stage_paths_live_under_the_configured_base() {
        let config = Config::default();
        let paths = StagePaths::new(Path::new("/work/playground"), &config);
        assert_eq!(
            paths.primary,
            Path::new("/work/playground/.skiff/stage/primary")
        );
        assert_eq!(paths.base(), Path::new("/work/playground/.skiff/stage"));
    }

    #[test]
    fn second_lock_acquisition_fails_while_held() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("stage").join("deploy.lock");

        let held = DeployLock::acquire(&lock_path).unwrap();
        let err = DeployLock::acquire(&lock_path).unwrap_err();
        assert!(matches!(err, SkiffError::LockHeld { .. }));

        drop(held);
        DeployLock::acquire(&lock_path).unwrap();
    }

    #[test]
    fn cancelled_pipeline_never_invokes_the_compiler() {
        let dir = tempdir().unwrap();
        let config = Config::default();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let pipeline = Pipeline::new(&config, dir.path(), cancel);
        // would fail with ToolchainSpawn if the compiler were reached
        assert!(matches!(
            pipeline.build_artifacts(),
            Err(SkiffError::Cancelled)
        ));
    }
}
