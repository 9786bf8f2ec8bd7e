//! Job runners binding configured jobs to pipelines
//!
//! Each runner owns one configured entry and constructs a fresh
//! connector per run (dump streams are non-restartable), then hands it
//! to the pipeline together with the scheduler's cancellation token.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pontoon_bridge::BridgeStore;
use pontoon_connectors::ConnectorRegistry;
use pontoon_core::config::{DestinationEntry, SourceEntry};
use pontoon_core::types::RetryPolicy;
use pontoon_core::Result;
use pontoon_pipeline::{DumpPipeline, DumpSpec, RestorePipeline, RestoreSpec};
use pontoon_scheduler::{Job, JobRunner, RunOutput};

/// Runs dump jobs for one configured source.
pub struct DumpRunner {
    pipeline: DumpPipeline,
    spec: DumpSpec,
    entry: SourceEntry,
    registry: Arc<ConnectorRegistry>,
}

impl DumpRunner {
    pub fn new(
        bridge: Arc<dyn BridgeStore>,
        retry: RetryPolicy,
        entry: SourceEntry,
        registry: Arc<ConnectorRegistry>,
    ) -> Self {
        Self {
            pipeline: DumpPipeline::new(bridge, retry),
            spec: DumpSpec::from(&entry),
            entry,
            registry,
        }
    }
}

#[async_trait]
impl JobRunner for DumpRunner {
    async fn run(&self, _job: &Job, cancel: CancellationToken) -> Result<RunOutput> {
        let source = self.registry.source(&self.entry)?;
        let manifest = self.pipeline.run(&self.spec, source, cancel).await?;
        Ok(RunOutput {
            manifest_id: Some(manifest.id),
        })
    }
}

/// Runs restore jobs for one configured destination.
pub struct RestoreRunner {
    pipeline: RestorePipeline,
    spec: RestoreSpec,
    entry: DestinationEntry,
    registry: Arc<ConnectorRegistry>,
}

impl RestoreRunner {
    pub fn new(
        bridge: Arc<dyn BridgeStore>,
        retry: RetryPolicy,
        entry: DestinationEntry,
        registry: Arc<ConnectorRegistry>,
    ) -> Self {
        Self {
            pipeline: RestorePipeline::new(bridge, retry),
            spec: RestoreSpec::from(&entry),
            entry,
            registry,
        }
    }
}

#[async_trait]
impl JobRunner for RestoreRunner {
    async fn run(&self, _job: &Job, cancel: CancellationToken) -> Result<RunOutput> {
        let destination = self.registry.destination(&self.entry)?;
        let report = self.pipeline.run(&self.spec, destination, cancel).await?;
        Ok(RunOutput {
            manifest_id: Some(report.manifest_id),
        })
    }
}
