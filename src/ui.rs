//! Console output for the CLI
//!
//! Progress goes to stderr so stdout stays clean for `--json` consumers.
//! ANSI color is used only when stderr is a terminal.

use is_terminal::IsTerminal;

use crate::config::ConfigWarning;
use crate::deploy::{DeployEvent, DeployEventSink};
use crate::models::DeploymentResult;

fn color(code: &str, text: &str) -> String {
    if std::io::stderr().is_terminal() {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

pub fn info(message: &str) {
    eprintln!("{message}");
}

pub fn success(message: &str) {
    eprintln!("{} {message}", color("32", "✓"));
}

pub fn warn(message: &str) {
    eprintln!("{} {message}", color("33", "⚠"));
}

pub fn print_config_warnings(warnings: &[ConfigWarning]) {
    for w in warnings {
        warn(&format!("Unknown config key '{}'", w.key));
    }
}

/// Final result block: endpoint URL plus the distribution's public
/// identifiers, as JSON on stdout when requested.
pub fn print_deployment_result(result: &DeploymentResult, json: bool) {
    if json {
        // serialization of a plain struct with string fields cannot fail
        println!(
            "{}",
            serde_json::to_string_pretty(result).expect("serializable result")
        );
        return;
    }
    success("Deploy complete");
    println!("Renderer URL:        {}", result.endpoint_url);
    println!("Edge version:        {}", result.edge_version);
    println!("Distribution ID:     {}", result.distribution_id);
    println!("Distribution domain: {}", result.distribution_domain);
    println!("Invalidation:        {}", result.invalidation_id);
}

/// Console sink for deploy progress, `-v` style line per step.
pub struct ConsoleEventSink {
    pub verbose: bool,
}

impl DeployEventSink for ConsoleEventSink {
    fn on_event(&self, event: DeployEvent) {
        match event {
            DeployEvent::Started => info("Deploying..."),
            DeployEvent::PrimaryPublished { url } => {
                success(&format!("Published renderer function ({url})"))
            }
            DeployEvent::EdgePublished { version } => {
                success(&format!("Published edge interceptor version ({version})"))
            }
            DeployEvent::StaticUploaded { bucket } => {
                success(&format!("Uploaded static bundle to s3://{bucket}"))
            }
            DeployEvent::DistributionUpdated { id, domain } => {
                success(&format!("Updated distribution {id} ({domain})"))
            }
            DeployEvent::Invalidated { invalidation_id } => {
                if self.verbose {
                    success(&format!("Invalidated all paths ({invalidation_id})"));
                } else {
                    success("Invalidated all paths");
                }
            }
        }
    }
}
