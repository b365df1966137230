//! Skiff CLI - build-and-deploy orchestrator for an edge-rendered code playground
//!
//! Usage: skiff <COMMAND>
//!
//! Commands:
//!   build   Compile and stage artifacts without deploying
//!   plan    Validate and print the routing topology
//!   deploy  Build everything and deploy it behind the distribution
//!   clean   Remove the staging directory

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use skiff::cli::{BuildSelection, Cli, Commands};
use skiff::config::Config;
use skiff::models::{EdgeFunctionVersion, FunctionEndpoint};
use skiff::pipeline::{self, CancelFlag, DeployLock, Pipeline};
use skiff::topology::DistributionState;
use skiff::{stage, ui};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_root = match &cli.project {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let (config, warnings) = Config::load(&project_root)?;
    if !cli.json {
        ui::print_config_warnings(&warnings);
    }

    match cli.command {
        Commands::Build { only } => cmd_build(&config, &project_root, only, cli.verbose),
        Commands::Plan => cmd_plan(&config, cli.json),
        Commands::Deploy { dry_run, skip_build } => cmd_deploy(
            &config,
            &project_root,
            dry_run,
            skip_build,
            cli.json,
            cli.verbose,
        ),
        Commands::Clean => cmd_clean(&config, &project_root),
    }
}

fn cmd_build(
    config: &Config,
    project_root: &Path,
    only: Option<BuildSelection>,
    verbose: u8,
) -> Result<()> {
    let cancel = CancelFlag::new();
    pipeline::install_interrupt_handler(&cancel)?;

    let pipeline = Pipeline::new(config, project_root, cancel);
    let _lock = DeployLock::acquire(&pipeline.stage_paths().lock)?;

    match only {
        Some(BuildSelection::Primary) => {
            let artifact = pipeline.build_artifact(skiff::Entrypoint::Primary)?;
            report_artifact(&artifact, verbose);
        }
        Some(BuildSelection::Edge) => {
            let artifact = pipeline.build_artifact(skiff::Entrypoint::Edge)?;
            report_artifact(&artifact, verbose);
        }
        Some(BuildSelection::Frontend) => {
            let bundle = pipeline.build_frontend()?;
            ui::success(&format!("Staged frontend at {}", bundle.out_dir.display()));
        }
        None => {
            let (artifacts, bundle) = pipeline.build_all()?;
            report_artifact(&artifacts.primary, verbose);
            report_artifact(&artifacts.edge, verbose);
            ui::success(&format!("Staged frontend at {}", bundle.out_dir.display()));
        }
    }
    Ok(())
}

fn report_artifact(artifact: &skiff::CompiledArtifact, verbose: u8) {
    if verbose > 0 {
        ui::success(&format!(
            "Staged {} at {} ({})",
            artifact.entrypoint,
            artifact.out_dir.display(),
            artifact.checksum
        ));
    } else {
        ui::success(&format!(
            "Staged {} at {}",
            artifact.entrypoint,
            artifact.out_dir.display()
        ));
    }
}

/// References shown by `plan` and `deploy --dry-run` before anything is
/// published.
fn placeholder_state(config: &Config) -> Result<DistributionState> {
    let endpoint = FunctionEndpoint {
        url: "https://pending.lambda-url.invalid/".to_string(),
    };
    let edge_version = EdgeFunctionVersion {
        qualified_arn: "arn:aws:lambda:us-east-1:000000000000:function:pending:0".to_string(),
    };
    Ok(DistributionState::new(&config.deploy, endpoint, edge_version)?)
}

fn cmd_plan(config: &Config, json: bool) -> Result<()> {
    let state = placeholder_state(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("Routing topology (first match wins):");
    for rule in &state.rules {
        println!(
            "  {:<10} -> function origin, caching disabled{}",
            rule.pattern,
            if rule.edge.is_some() {
                ", edge interceptor at viewer-request (body included)"
            } else {
                ""
            }
        );
    }
    println!(
        "  {:<10} -> static origin (access identity only), cached, https redirect",
        state.default_rule.pattern
    );
    Ok(())
}

fn cmd_deploy(
    config: &Config,
    project_root: &Path,
    dry_run: bool,
    skip_build: bool,
    json: bool,
    verbose: u8,
) -> Result<()> {
    if !dry_run {
        // fail before any build work if the target is not configured
        config.require_distribution_id()?;
    }

    let cancel = CancelFlag::new();
    pipeline::install_interrupt_handler(&cancel)?;

    let pipeline = Pipeline::new(config, project_root, cancel);
    let _lock = DeployLock::acquire(&pipeline.stage_paths().lock)?;

    let (artifacts, bundle) = if skip_build {
        pipeline.load_staged()?
    } else {
        pipeline.build_all()?
    };

    if dry_run {
        ui::info("Dry run: staged outputs ready, no remote calls made.");
        report_artifact(&artifacts.primary, verbose);
        report_artifact(&artifacts.edge, verbose);
        ui::success(&format!("Staged frontend at {}", bundle.out_dir.display()));
        return cmd_plan(config, json);
    }

    let sink = ui::ConsoleEventSink {
        verbose: verbose > 0,
    };
    let result = pipeline.deploy(&artifacts, &bundle, &sink)?;
    ui::print_deployment_result(&result, json);
    Ok(())
}

fn cmd_clean(config: &Config, project_root: &Path) -> Result<()> {
    let base = project_root.join(&config.deploy.stage_dir);
    stage::remove_tree(&base)?;
    ui::success(&format!("Removed {}", base.display()));
    Ok(())
}
