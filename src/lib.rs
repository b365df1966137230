//! Skiff - build-and-deploy orchestrator for an edge-rendered code playground
//!
//! Skiff compiles one renderer module into two runtime artifacts (a
//! synchronous function and an edge interceptor), patches each with a
//! host-compatibility shim, builds the static editor frontend, and wires
//! all three behind one CDN distribution: publish function versions, upload
//! the bundle, update the routing topology, invalidate the cache.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod shim;
pub mod stage;
pub mod toolchain;
pub mod topology;
pub mod ui;

// Re-exports for convenience
pub use bundler::{ArtifactBundler, FrontendBundler};
pub use config::{Config, ConfigWarning};
pub use error::{DeployStep, SkiffError, SkiffResult};
pub use models::{
    BuiltArtifacts, CompiledArtifact, DeploymentResult, Entrypoint, StaticBundle,
};
pub use pipeline::{CancelFlag, DeployLock, Pipeline, StagePaths};
pub use topology::{DistributionState, RoutingRule};
