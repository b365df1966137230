//! Cloud port implementations backed by the `aws` CLI
//!
//! Remote calls use the same subprocess-capability model as the build
//! toolchains: JSON responses are parsed, progress and errors stream to the
//! operator's terminal. Account and region come from the CLI's own ambient
//! environment and are opaque here, with one exception: edge interceptor
//! functions always live in `us-east-1`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::{json, Value};

use crate::config::{DeployConfig, ToolchainConfig};
use crate::error::{SkiffError, SkiffResult};
use crate::models::{
    CompiledArtifact, DistributionRef, EdgeFunctionVersion, FunctionEndpoint, StaticBundle,
};
use crate::topology::DistributionState;

use super::ports::{CdnApi, FunctionPublisher, ObjectStore};

/// Region edge functions are published from.
const EDGE_REGION: &str = "us-east-1";

/// Origin id skiff owns inside the distribution config.
const FUNCTION_ORIGIN_ID: &str = "renderer";

fn remote_err(message: impl Into<String>) -> SkiffError {
    SkiffError::Io(std::io::Error::other(message.into()))
}

fn str_field(value: &Value, pointer: &str) -> SkiffResult<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| remote_err(format!("missing '{pointer}' in aws response")))
}

/// AWS CLI client implementing all three cloud ports.
pub struct AwsCli {
    program: String,
    zip_program: String,
    function_name: String,
    edge_function_name: String,
}

impl AwsCli {
    pub fn new(toolchain: &ToolchainConfig, deploy: &DeployConfig) -> Self {
        Self {
            program: toolchain.aws.clone(),
            zip_program: toolchain.zip.clone(),
            function_name: deploy.function_name.clone(),
            edge_function_name: deploy.edge_function_name.clone(),
        }
    }

    /// Run `aws` with JSON output captured; stderr streams through.
    fn run_json(&self, args: &[&str]) -> SkiffResult<Value> {
        let output = Command::new(&self.program)
            .args(args)
            .args(["--output", "json"])
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| SkiffError::ToolchainSpawn {
                program: self.program.clone(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(remote_err(format!(
                "'{} {}' exited non-zero",
                self.program,
                args.first().copied().unwrap_or_default()
            )));
        }
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| remote_err(format!("unparseable aws response: {e}")))
    }

    /// Run `aws` with all streams inherited (uploads show live progress).
    fn run_streamed(&self, args: &[&str]) -> SkiffResult<()> {
        let status = Command::new(&self.program)
            .args(args)
            .status()
            .map_err(|e| SkiffError::ToolchainSpawn {
                program: self.program.clone(),
                source: e,
            })?;
        if !status.success() {
            return Err(remote_err(format!(
                "'{} {}' exited non-zero",
                self.program,
                args.first().copied().unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Zip the staged artifact next to its staging directory.
    fn zip_artifact(&self, artifact: &CompiledArtifact) -> SkiffResult<PathBuf> {
        let parent = artifact
            .out_dir
            .parent()
            .ok_or_else(|| remote_err("artifact staging dir has no parent"))?;
        let parent = std::fs::canonicalize(parent).map_err(|e| SkiffError::StageFailure {
            path: parent.to_path_buf(),
            source: e,
        })?;
        let zip_path = parent.join(format!("{}.zip", artifact.entrypoint));
        if zip_path.exists() {
            std::fs::remove_file(&zip_path).map_err(|e| SkiffError::StageFailure {
                path: zip_path.clone(),
                source: e,
            })?;
        }
        let status = Command::new(&self.zip_program)
            .arg("-qr")
            .arg(&zip_path)
            .arg(".")
            .current_dir(&artifact.out_dir)
            .status()
            .map_err(|e| SkiffError::ToolchainSpawn {
                program: self.zip_program.clone(),
                source: e,
            })?;
        if !status.success() {
            return Err(remote_err(format!(
                "'{}' exited non-zero while packaging {}",
                self.zip_program, artifact.entrypoint
            )));
        }
        Ok(zip_path)
    }

    fn update_function_code(
        &self,
        function_name: &str,
        zip_path: &Path,
        region: Option<&str>,
    ) -> SkiffResult<()> {
        let file_arg = format!("fileb://{}", zip_path.display());
        let mut args = vec![
            "lambda",
            "update-function-code",
            "--function-name",
            function_name,
            "--zip-file",
            file_arg.as_str(),
        ];
        if let Some(region) = region {
            args.extend(["--region", region]);
        }
        self.run_json(&args).map(|_| ())
    }

    fn publish_version(&self, function_name: &str, region: Option<&str>) -> SkiffResult<Value> {
        let mut args = vec![
            "lambda",
            "publish-version",
            "--function-name",
            function_name,
        ];
        if let Some(region) = region {
            args.extend(["--region", region]);
        }
        self.run_json(&args)
    }
}

impl FunctionPublisher for AwsCli {
    fn publish_primary(&self, artifact: &CompiledArtifact) -> SkiffResult<FunctionEndpoint> {
        let zip_path = self.zip_artifact(artifact)?;
        self.update_function_code(&self.function_name, &zip_path, None)?;
        self.publish_version(&self.function_name, None)?;
        let url_config = self.run_json(&[
            "lambda",
            "get-function-url-config",
            "--function-name",
            &self.function_name,
        ])?;
        Ok(FunctionEndpoint {
            url: str_field(&url_config, "/FunctionUrl")?,
        })
    }

    fn publish_edge(&self, artifact: &CompiledArtifact) -> SkiffResult<EdgeFunctionVersion> {
        let zip_path = self.zip_artifact(artifact)?;
        self.update_function_code(&self.edge_function_name, &zip_path, Some(EDGE_REGION))?;
        let version = self.publish_version(&self.edge_function_name, Some(EDGE_REGION))?;
        // publish-version returns the qualified ARN for the new version
        Ok(EdgeFunctionVersion {
            qualified_arn: str_field(&version, "/FunctionArn")?,
        })
    }
}

impl ObjectStore for AwsCli {
    fn upload_dir(&self, bundle: &StaticBundle, bucket: &str) -> SkiffResult<()> {
        let target = format!("s3://{bucket}");
        let source = bundle.out_dir.to_string_lossy();
        self.run_streamed(&["s3", "sync", source.as_ref(), target.as_str(), "--delete"])
    }
}

impl CdnApi for AwsCli {
    fn put_distribution(&self, id: &str, state: &DistributionState) -> SkiffResult<DistributionRef> {
        let current = self.run_json(&["cloudfront", "get-distribution-config", "--id", id])?;
        let etag = str_field(&current, "/ETag")?;
        let mut config = current
            .pointer("/DistributionConfig")
            .cloned()
            .ok_or_else(|| remote_err("missing DistributionConfig in aws response"))?;

        patch_distribution_config(&mut config, state)?;

        let config_arg = config.to_string();
        let updated = self.run_json(&[
            "cloudfront",
            "update-distribution",
            "--id",
            id,
            "--if-match",
            &etag,
            "--distribution-config",
            &config_arg,
        ])?;
        Ok(DistributionRef {
            id: str_field(&updated, "/Distribution/Id")?,
            domain_name: str_field(&updated, "/Distribution/DomainName")?,
        })
    }

    fn invalidate_all(&self, distribution_id: &str) -> SkiffResult<String> {
        let caller_reference = format!(
            "skiff-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        );
        let batch = json!({
            "Paths": { "Quantity": 1, "Items": ["/*"] },
            "CallerReference": caller_reference,
        })
        .to_string();
        let response = self.run_json(&[
            "cloudfront",
            "create-invalidation",
            "--distribution-id",
            distribution_id,
            "--invalidation-batch",
            &batch,
        ])?;
        str_field(&response, "/Invalidation/Id")
    }
}

/// Rewrite the parts of a fetched distribution config that a deploy owns:
/// the renderer origin, the default behavior, the path behaviors, and the
/// default root object. The static origin (provisioned once, with its
/// access identity) is located but left untouched.
fn patch_distribution_config(config: &mut Value, state: &DistributionState) -> SkiffResult<()> {
    let static_origin_id = {
        let origins = config
            .pointer("/Origins/Items")
            .and_then(Value::as_array)
            .ok_or_else(|| remote_err("distribution config has no origins"))?;
        origins
            .iter()
            .find(|origin| origin.get("S3OriginConfig").is_some())
            .and_then(|origin| origin.get("Id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| remote_err("distribution has no provisioned static origin"))?
    };

    // replace-or-append the renderer origin
    let rendered_origin = state.render_function_origin(FUNCTION_ORIGIN_ID);
    let items = config
        .pointer_mut("/Origins/Items")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| remote_err("distribution config has no origins"))?;
    if let Some(existing) = items
        .iter_mut()
        .find(|origin| origin.get("Id").and_then(Value::as_str) == Some(FUNCTION_ORIGIN_ID))
    {
        *existing = rendered_origin;
    } else {
        items.push(rendered_origin);
    }
    let count = items.len();
    config["Origins"]["Quantity"] = json!(count);

    config["DefaultRootObject"] = json!(state.default_root_object);
    config["DefaultCacheBehavior"] = state.render_default_behavior(&static_origin_id);
    config["CacheBehaviors"] = state.render_cache_behaviors(FUNCTION_ORIGIN_ID);
    Ok(())
}
