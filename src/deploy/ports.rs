//! Deploy Ports (Interfaces)
//!
//! These traits are the boundary between the deploy use case and the cloud
//! provider. The real implementations live in `deploy::aws_cli`; tests use
//! fakes to assert ordering and the values threaded between steps.

use crate::error::SkiffResult;
use crate::models::{
    CompiledArtifact, DistributionRef, EdgeFunctionVersion, FunctionEndpoint, StaticBundle,
};
use crate::topology::DistributionState;

/// Publishes compiled artifacts as function versions.
pub trait FunctionPublisher {
    /// Publish the primary artifact as the synchronous function and return
    /// its invocable endpoint.
    fn publish_primary(&self, artifact: &CompiledArtifact) -> SkiffResult<FunctionEndpoint>;

    /// Publish the edge artifact as a new immutable interceptor version.
    /// The returned reference pins that exact version, never "latest".
    fn publish_edge(&self, artifact: &CompiledArtifact) -> SkiffResult<EdgeFunctionVersion>;
}

/// Uploads the static bundle to object storage.
pub trait ObjectStore {
    fn upload_dir(&self, bundle: &StaticBundle, bucket: &str) -> SkiffResult<()>;
}

/// Updates the CDN distribution and invalidates its cache.
pub trait CdnApi {
    fn put_distribution(&self, id: &str, state: &DistributionState) -> SkiffResult<DistributionRef>;

    /// Invalidate all paths; returns the invalidation id.
    fn invalidate_all(&self, distribution_id: &str) -> SkiffResult<String>;
}

/// Event emitted while a deploy progresses.
#[derive(Debug, Clone)]
pub enum DeployEvent {
    Started,
    PrimaryPublished { url: String },
    EdgePublished { version: String },
    StaticUploaded { bucket: String },
    DistributionUpdated { id: String, domain: String },
    Invalidated { invalidation_id: String },
}

/// Trait for receiving deploy events
///
/// Implementations can be a console progress printer, an NDJSON stream for
/// CI, or silent.
pub trait DeployEventSink {
    fn on_event(&self, event: DeployEvent);
}

/// No-op event sink for silent operation
pub struct NoopEventSink;

impl DeployEventSink for NoopEventSink {
    fn on_event(&self, _event: DeployEvent) {}
}
