//! Test environment builder for isolated Skiff testing.
//!
//! Provides `TestEnv` - a temp project checkout with stub toolchain
//! executables wired in through `skiff.toml`, plus helpers to run the
//! skiff CLI against it. The `aws` stub records every invocation to a log
//! file so tests can assert deploy ordering.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Result of running a skiff CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// A working compiler stub: emits a one-line entry plus a source map.
pub const DART_OK: &str = r#"#!/bin/sh
out=""
src=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; shift; fi
  src="$1"
  shift
done
mkdir -p "$(dirname "$out")"
printf 'console.log("compiled %s");\n' "$src" > "$out"
printf '{}' > "$out.map"
"#;

/// A compiler stub that always fails, for fail-fast tests.
pub const DART_FAIL: &str = "#!/bin/sh\nexit 1\n";

const PNPM_OK: &str = r#"#!/bin/sh
mkdir -p dist
printf '<!doctype html><title>playground</title>\n' > dist/index.html
"#;

const ZIP_OK: &str = "#!/bin/sh\ntouch \"$2\"\n";

const AWS_OK: &str = r#"#!/bin/sh
echo "$*" >> "$AWS_CALL_LOG"
case "$1 $2" in
  "s3 sync")
    ;;
  "lambda update-function-code")
    echo '{}'
    ;;
  "lambda publish-version")
    case "$*" in
      *edge*)
        echo '{"FunctionArn":"arn:aws:lambda:us-east-1:123:function:playground-renderer-edge:5","Version":"5"}'
        ;;
      *)
        echo '{"FunctionArn":"arn:aws:lambda:eu-west-1:123:function:playground-renderer:3","Version":"3"}'
        ;;
    esac
    ;;
  "lambda get-function-url-config")
    echo '{"FunctionUrl":"https://abc123.lambda-url.eu-west-1.on.aws/"}'
    ;;
  "cloudfront get-distribution-config")
    echo '{"ETag":"E2ETAG","DistributionConfig":{"DefaultRootObject":"","Origins":{"Quantity":1,"Items":[{"Id":"frontend-bucket","DomainName":"playground-frontend.s3.amazonaws.com","S3OriginConfig":{"OriginAccessIdentity":"origin-access-identity/cloudfront/EOAI"}}]},"DefaultCacheBehavior":{"TargetOriginId":"frontend-bucket"},"CacheBehaviors":{"Quantity":0}}}'
    ;;
  "cloudfront update-distribution")
    echo '{"Distribution":{"Id":"E123TEST","DomainName":"d111.cloudfront.example"}}'
    ;;
  "cloudfront create-invalidation")
    echo '{"Invalidation":{"Id":"IINVTEST"}}'
    ;;
  *)
    echo '{}'
    ;;
esac
"#;

/// Isolated project checkout with stubbed toolchains.
pub struct TestEnv {
    pub project: TempDir,
    home: TempDir,
    aws_log: PathBuf,
}

impl TestEnv {
    /// Environment with working stubs and a configured distribution.
    pub fn new() -> Self {
        Self::build(DART_OK, true)
    }

    /// Environment with a custom compiler stub.
    pub fn with_compiler(compiler_script: &str) -> Self {
        Self::build(compiler_script, true)
    }

    /// Environment whose config has no distribution id.
    pub fn without_distribution_id() -> Self {
        Self::build(DART_OK, false)
    }

    fn build(compiler_script: &str, with_distribution: bool) -> Self {
        let project = TempDir::new().expect("temp project");
        let home = TempDir::new().expect("temp home");

        let bin = project.path().join("stub-bin");
        std::fs::create_dir_all(&bin).unwrap();
        let dart = write_script(&bin, "dart", compiler_script);
        let pnpm = write_script(&bin, "pnpm", PNPM_OK);
        let aws = write_script(&bin, "aws", AWS_OK);
        let zip = write_script(&bin, "zip", ZIP_OK);

        // minimal renderer + frontend project layout
        let renderer_lib = project.path().join("renderer").join("lib");
        std::fs::create_dir_all(&renderer_lib).unwrap();
        std::fs::write(renderer_lib.join("primary.dart"), "void main() {}\n").unwrap();
        std::fs::write(renderer_lib.join("edge.dart"), "void main() {}\n").unwrap();
        std::fs::create_dir_all(project.path().join("frontend")).unwrap();

        let distribution_line = if with_distribution {
            "distribution_id = \"E123TEST\"\n"
        } else {
            ""
        };
        std::fs::write(
            project.path().join("skiff.toml"),
            format!(
                r#"[toolchain]
compiler = "{dart}"
frontend_builder = "{pnpm}"
aws = "{aws}"
zip = "{zip}"

[deploy]
{distribution_line}"#,
                dart = dart.display(),
                pnpm = pnpm.display(),
                aws = aws.display(),
                zip = zip.display(),
            ),
        )
        .unwrap();

        let aws_log = project.path().join("aws-calls.log");
        Self {
            project,
            home,
            aws_log,
        }
    }

    /// Run skiff in this environment from the project root.
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_skiff"));
        cmd.args(args)
            .current_dir(self.project.path())
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env("AWS_CALL_LOG", &self.aws_log);
        for (key, value) in env_vars {
            cmd.env(key, value);
        }
        let output = cmd.output().expect("failed to run skiff");
        TestResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Path under the project root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.project.path().join(relative)
    }

    /// Path under the default staging base.
    pub fn staged(&self, relative: &str) -> PathBuf {
        self.path(".skiff/stage").join(relative)
    }

    /// Every `aws` invocation so far, one argv line each.
    pub fn aws_calls(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.aws_log) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn write_script(bin: &Path, name: &str, content: &str) -> PathBuf {
    let path = bin.join(name);
    std::fs::write(&path, content).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}
