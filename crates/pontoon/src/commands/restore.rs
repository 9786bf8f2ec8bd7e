//! Restore command: one-shot restore of a configured destination

use anyhow::Result;
use camino::Utf8Path;
use clap::Args;
use tokio_util::sync::CancellationToken;

use pontoon_connectors::ConnectorRegistry;
use pontoon_core::config::PontoonConfig;
use pontoon_pipeline::{RestorePipeline, RestoreSpec};

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Name of the configured destination job
    pub job: String,

    /// Restore this manifest id instead of the latest complete one
    #[arg(short, long)]
    pub manifest: Option<String>,
}

pub async fn run(args: RestoreArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let loaded = PontoonConfig::load(config_path)?;

    let entry = loaded
        .destination(&args.job)
        .ok_or_else(|| anyhow::anyhow!("no destination job named {} in configuration", args.job))?
        .clone();

    let bridge = pontoon_bridge::from_config(&loaded.config.bridge).await?;
    let registry = ConnectorRegistry::with_builtins();
    let destination = registry.destination(&entry)?;

    let mut spec = RestoreSpec::from(&entry);
    spec.manifest_id = args.manifest;

    let pipeline = RestorePipeline::new(bridge, loaded.config.runtime.retry.clone());
    let report = pipeline
        .run(&spec, destination, CancellationToken::new())
        .await?;

    println!(
        "Restore complete: manifest {} ({} chunks, {} bytes)",
        report.manifest_id, report.chunks, report.bytes_written
    );
    Ok(())
}
