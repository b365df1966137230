//! Configuration module for Skiff
//!
//! Configuration hierarchy, highest priority first:
//! 1. CLI flags
//! 2. Environment variables (SKIFF_*)
//! 3. Project config (skiff.toml in the project root)
//! 4. User config (~/.config/skiff/config.toml)
//! 5. Built-in defaults
//!
//! Unknown keys warn instead of erroring so older binaries keep working
//! against newer config files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SkiffError, SkiffResult};

/// Renderer (lambda source module) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Project directory holding `lib/primary.dart` and `lib/edge.dart`
    #[serde(default = "default_renderer_dir")]
    pub dir: PathBuf,

    /// Fixed relative path of the compiled entry file
    #[serde(default = "default_renderer_out")]
    pub out: PathBuf,
}

fn default_renderer_dir() -> PathBuf {
    PathBuf::from("renderer")
}

fn default_renderer_out() -> PathBuf {
    PathBuf::from("dist/index.js")
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            dir: default_renderer_dir(),
            out: default_renderer_out(),
        }
    }
}

/// Frontend (static editor bundle) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    #[serde(default = "default_frontend_dir")]
    pub dir: PathBuf,

    /// The build tool's conventional output directory, relative to `dir`
    #[serde(default = "default_frontend_out")]
    pub out: PathBuf,
}

fn default_frontend_dir() -> PathBuf {
    PathBuf::from("frontend")
}

fn default_frontend_out() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            dir: default_frontend_dir(),
            out: default_frontend_out(),
        }
    }
}

/// External executables. Overridable so tests can slot in stubs and CI can
/// pin absolute paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default = "default_compiler")]
    pub compiler: String,

    #[serde(default = "default_frontend_builder")]
    pub frontend_builder: String,

    #[serde(default = "default_aws")]
    pub aws: String,

    #[serde(default = "default_zip")]
    pub zip: String,
}

fn default_compiler() -> String {
    "dart".to_string()
}

fn default_frontend_builder() -> String {
    "pnpm".to_string()
}

fn default_aws() -> String {
    "aws".to_string()
}

fn default_zip() -> String {
    "zip".to_string()
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            frontend_builder: default_frontend_builder(),
            aws: default_aws(),
            zip: default_zip(),
        }
    }
}

/// Remote deployment targets and routing prefixes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Object-storage bucket holding the static bundle
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Name of the synchronous function
    #[serde(default = "default_function_name")]
    pub function_name: String,

    /// Name of the edge interceptor function
    #[serde(default = "default_edge_function_name")]
    pub edge_function_name: String,

    /// Distribution to update. Required for a real deploy; `plan` and
    /// `--dry-run` work without it.
    #[serde(default)]
    pub distribution_id: Option<String>,

    /// Path pattern for synchronous API traffic
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Path pattern for edge-intercepted traffic
    #[serde(default = "default_edge_prefix")]
    pub edge_prefix: String,

    /// Staging area, relative to the project root
    #[serde(default = "default_stage_dir")]
    pub stage_dir: PathBuf,
}

fn default_bucket() -> String {
    "playground-frontend".to_string()
}

fn default_function_name() -> String {
    "playground-renderer".to_string()
}

fn default_edge_function_name() -> String {
    "playground-renderer-edge".to_string()
}

fn default_api_prefix() -> String {
    "api/*".to_string()
}

fn default_edge_prefix() -> String {
    "edge/*".to_string()
}

fn default_stage_dir() -> PathBuf {
    PathBuf::from(".skiff/stage")
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            function_name: default_function_name(),
            edge_function_name: default_edge_function_name(),
            distribution_id: None,
            api_prefix: default_api_prefix(),
            edge_prefix: default_edge_prefix(),
            stage_dir: default_stage_dir(),
        }
    }
}

/// Warning about an unrecognized config key
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub key: String,
}

/// Resolved Skiff configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub renderer: RendererConfig,

    #[serde(default)]
    pub frontend: FrontendConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub deploy: DeployConfig,
}

/// Partial config as read from one file; merged over lower layers.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    renderer: Option<RendererConfig>,
    frontend: Option<FrontendConfig>,
    toolchain: Option<ToolchainConfig>,
    deploy: Option<DeployConfig>,
}

impl Config {
    /// Load configuration for `project_root`, applying the full hierarchy
    /// (minus CLI flags, which callers apply on top).
    pub fn load(project_root: &Path) -> SkiffResult<(Self, Vec<ConfigWarning>)> {
        let mut config = Config::default();
        let mut warnings = Vec::new();

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                let raw = parse_file(&user_path, &mut warnings)?;
                config.apply(raw);
            }
        }

        let project_path = project_root.join("skiff.toml");
        if project_path.exists() {
            let raw = parse_file(&project_path, &mut warnings)?;
            config.apply(raw);
        }

        config.apply_env();
        Ok((config, warnings))
    }

    /// `~/.config/skiff/config.toml` (platform equivalent)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("skiff").join("config.toml"))
    }

    fn apply(&mut self, raw: RawConfig) {
        if let Some(renderer) = raw.renderer {
            self.renderer = renderer;
        }
        if let Some(frontend) = raw.frontend {
            self.frontend = frontend;
        }
        if let Some(toolchain) = raw.toolchain {
            self.toolchain = toolchain;
        }
        if let Some(deploy) = raw.deploy {
            self.deploy = deploy;
        }
    }

    fn apply_env(&mut self) {
        let mut set = |key: &str, apply: &mut dyn FnMut(&mut Self, String)| {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    apply(self, value);
                }
            }
        };
        set("SKIFF_COMPILER", &mut |c, v| c.toolchain.compiler = v);
        set("SKIFF_FRONTEND_BUILDER", &mut |c, v| {
            c.toolchain.frontend_builder = v
        });
        set("SKIFF_AWS", &mut |c, v| c.toolchain.aws = v);
        set("SKIFF_ZIP", &mut |c, v| c.toolchain.zip = v);
        set("SKIFF_BUCKET", &mut |c, v| c.deploy.bucket = v);
        set("SKIFF_FUNCTION_NAME", &mut |c, v| c.deploy.function_name = v);
        set("SKIFF_EDGE_FUNCTION_NAME", &mut |c, v| {
            c.deploy.edge_function_name = v
        });
        set("SKIFF_DISTRIBUTION_ID", &mut |c, v| {
            c.deploy.distribution_id = Some(v)
        });
        set("SKIFF_STAGE_DIR", &mut |c, v| {
            c.deploy.stage_dir = PathBuf::from(v)
        });
    }

    /// Distribution id, or a `MissingConfig` error pointing at the knob.
    pub fn require_distribution_id(&self) -> SkiffResult<&str> {
        self.deploy
            .distribution_id
            .as_deref()
            .ok_or_else(|| SkiffError::MissingConfig {
                key: "deploy.distribution_id".to_string(),
                env: "SKIFF_DISTRIBUTION_ID".to_string(),
            })
    }
}

fn parse_file(path: &Path, warnings: &mut Vec<ConfigWarning>) -> SkiffResult<RawConfig> {
    let content = std::fs::read_to_string(path)?;
    let de = toml::Deserializer::new(&content);
    serde_ignored::deserialize(de, |ignored| {
        warnings.push(ConfigWarning {
            key: ignored.to_string(),
        });
    })
    .map_err(|e| SkiffError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })
}
