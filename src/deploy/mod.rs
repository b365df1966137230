//! Deploy layer: ports, use case, and the aws CLI adapter
//!
//! `ports` defines the cloud capability traits, `deployer` sequences them,
//! `aws_cli` is the real adapter. Fakes for the ports live with the
//! deployer's tests.

pub mod aws_cli;
pub mod deployer;
pub mod ports;

pub use aws_cli::AwsCli;
pub use deployer::Deployer;
pub use ports::{CdnApi, DeployEvent, DeployEventSink, FunctionPublisher, NoopEventSink, ObjectStore};
