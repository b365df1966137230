//! Core data models for Skiff
//!
//! Defines the fundamental data structures used throughout Skiff:
//! - `Entrypoint`: which runtime artifact a build produces
//! - `CompiledArtifact` / `StaticBundle`: ephemeral build outputs
//! - `FunctionEndpoint` / `EdgeFunctionVersion`: published references
//! - `DeploymentResult`: what a successful deploy prints

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SkiffResult;

/// Which runtime artifact to compile the renderer module into.
///
/// `Primary` becomes the synchronous request/response function; `Edge`
/// becomes the viewer-request interceptor. Chosen at build invocation time,
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entrypoint {
    Primary,
    Edge,
}

impl Entrypoint {
    pub const ALL: [Entrypoint; 2] = [Entrypoint::Primary, Entrypoint::Edge];

    pub fn as_str(&self) -> &'static str {
        match self {
            Entrypoint::Primary => "primary",
            Entrypoint::Edge => "edge",
        }
    }

    /// Source file the compiler is pointed at, relative to the renderer root.
    pub fn source_file(&self) -> PathBuf {
        PathBuf::from(format!("lib/{}.dart", self.as_str()))
    }
}

impl fmt::Display for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled renderer artifact staged for publication.
///
/// The output directory is recreated from scratch on every build; nothing
/// here survives a rebuild. The entry file has already been rewritten with
/// the host-compatibility preamble by the time a `CompiledArtifact` exists.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    pub entrypoint: Entrypoint,
    /// Staging directory holding the full compiler output tree
    pub out_dir: PathBuf,
    /// The designated entry file inside `out_dir`
    pub entry_file: PathBuf,
    /// SHA256 of the (shimmed) entry file content
    pub checksum: String,
}

impl CompiledArtifact {
    pub fn new(entrypoint: Entrypoint, out_dir: PathBuf, entry_file: PathBuf) -> SkiffResult<Self> {
        let checksum = checksum_file(&entry_file)?;
        Ok(Self {
            entrypoint,
            out_dir,
            entry_file,
            checksum,
        })
    }
}

/// SHA256 content hash, formatted the way lockfiles and logs show it.
pub fn checksum_file(path: &Path) -> SkiffResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

/// Both renderer artifacts, built and staged. The deploy step requires the
/// pair; there is no single-artifact deploy.
#[derive(Debug, Clone)]
pub struct BuiltArtifacts {
    pub primary: CompiledArtifact,
    pub edge: CompiledArtifact,
}

/// The staged static frontend bundle (editor assets, worker bundles).
#[derive(Debug, Clone, PartialEq)]
pub struct StaticBundle {
    pub out_dir: PathBuf,
}

/// Invocable endpoint of the published synchronous function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEndpoint {
    /// Full https URL, e.g. `https://abc123.lambda-url.eu-west-1.on.aws/`
    pub url: String,
}

impl FunctionEndpoint {
    /// The bare host name, which is what the distribution's HTTP origin
    /// configuration wants.
    pub fn host(&self) -> &str {
        let stripped = self
            .url
            .strip_prefix("https://")
            .unwrap_or(self.url.as_str());
        stripped.split('/').next().unwrap_or(stripped)
    }
}

/// A pinned, immutable version of the edge interceptor.
///
/// Edge functions are versioned by nature; the active version is always
/// referenced explicitly, never as "latest".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFunctionVersion {
    /// Qualified reference including the version, e.g. `arn:...:function:x:7`
    pub qualified_arn: String,
}

/// Identifiers of the distribution a deploy just updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRef {
    pub id: String,
    pub domain_name: String,
}

/// Everything a successful deploy reports to the operator.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentResult {
    pub endpoint_url: String,
    pub edge_version: String,
    pub distribution_id: String,
    pub distribution_domain: String,
    pub invalidation_id: String,
}
