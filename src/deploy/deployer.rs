//! Deploy Use Case
//!
//! Orchestrates the remote half of the pipeline, parameterized by its
//! ports so ordering and failure semantics can be tested with fakes:
//!
//! 1. Publish the primary artifact; obtain the function endpoint
//! 2. Publish the edge artifact as a pinned interceptor version
//! 3. Construct and validate the distribution topology (pure)
//! 4. Upload the static bundle
//! 5. Update the distribution with the new topology
//! 6. Invalidate all cached paths
//!
//! Any step failing aborts the remainder; nothing already applied is rolled
//! back. Redeploying is the recovery path.

use crate::config::DeployConfig;
use crate::error::{DeployStep, SkiffError, SkiffResult};
use crate::models::{BuiltArtifacts, DeploymentResult, StaticBundle};
use crate::pipeline::CancelFlag;
use crate::topology::DistributionState;

use super::ports::{CdnApi, DeployEvent, DeployEventSink, FunctionPublisher, ObjectStore};

/// Tag a port error with the step it happened in. Cancellation and already
/// tagged failures pass through unchanged.
fn in_step<T>(step: DeployStep, result: SkiffResult<T>) -> SkiffResult<T> {
    result.map_err(|e| match e {
        SkiffError::Cancelled | SkiffError::DeployFailure { .. } => e,
        other => SkiffError::DeployFailure {
            step,
            message: other.to_string(),
        },
    })
}

/// Deploy use case, parameterized by its cloud ports.
pub struct Deployer<'a, P, S, C>
where
    P: FunctionPublisher,
    S: ObjectStore,
    C: CdnApi,
{
    publisher: &'a P,
    store: &'a S,
    cdn: &'a C,
}

impl<'a, P, S, C> Deployer<'a, P, S, C>
where
    P: FunctionPublisher,
    S: ObjectStore,
    C: CdnApi,
{
    pub fn new(publisher: &'a P, store: &'a S, cdn: &'a C) -> Self {
        Self {
            publisher,
            store,
            cdn,
        }
    }

    /// Execute the deploy steps in order, checking for cancellation before
    /// each blocking call.
    pub fn deploy(
        &self,
        deploy_config: &DeployConfig,
        distribution_id: &str,
        artifacts: &BuiltArtifacts,
        bundle: &StaticBundle,
        cancel: &CancelFlag,
        sink: &dyn DeployEventSink,
    ) -> SkiffResult<DeploymentResult> {
        sink.on_event(DeployEvent::Started);

        cancel.check()?;
        let endpoint = in_step(
            DeployStep::PublishPrimary,
            self.publisher.publish_primary(&artifacts.primary),
        )?;
        sink.on_event(DeployEvent::PrimaryPublished {
            url: endpoint.url.clone(),
        });

        cancel.check()?;
        let edge_version = in_step(
            DeployStep::PublishEdge,
            self.publisher.publish_edge(&artifacts.edge),
        )?;
        sink.on_event(DeployEvent::EdgePublished {
            version: edge_version.qualified_arn.clone(),
        });

        // pure construction + validation, before any further remote call
        let state = DistributionState::new(deploy_config, endpoint, edge_version)?;

        cancel.check()?;
        in_step(
            DeployStep::UploadStatic,
            self.store.upload_dir(bundle, &deploy_config.bucket),
        )?;
        sink.on_event(DeployEvent::StaticUploaded {
            bucket: deploy_config.bucket.clone(),
        });

        cancel.check()?;
        let distribution = in_step(
            DeployStep::PutDistribution,
            self.cdn.put_distribution(distribution_id, &state),
        )?;
        sink.on_event(DeployEvent::DistributionUpdated {
            id: distribution.id.clone(),
            domain: distribution.domain_name.clone(),
        });

        cancel.check()?;
        let invalidation_id = in_step(
            DeployStep::Invalidate,
            self.cdn.invalidate_all(&distribution.id),
        )?;
        sink.on_event(DeployEvent::Invalidated {
            invalidation_id: invalidation_id.clone(),
        });

        Ok(DeploymentResult {
            endpoint_url: state.endpoint.url.clone(),
            edge_version: state.edge_version.qualified_arn.clone(),
            distribution_id: distribution.id,
            distribution_domain: distribution.domain_name,
            invalidation_id,
        })
    }
}
