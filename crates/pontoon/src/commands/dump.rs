//! Dump command: one-shot dump of a configured source

use anyhow::Result;
use camino::Utf8Path;
use clap::Args;
use tokio_util::sync::CancellationToken;

use pontoon_connectors::ConnectorRegistry;
use pontoon_core::config::PontoonConfig;
use pontoon_pipeline::{DumpPipeline, DumpSpec};

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Name of the configured source job
    pub job: String,
}

pub async fn run(args: DumpArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let loaded = PontoonConfig::load(config_path)?;

    let entry = loaded
        .source(&args.job)
        .ok_or_else(|| anyhow::anyhow!("no source job named {} in configuration", args.job))?
        .clone();

    let bridge = pontoon_bridge::from_config(&loaded.config.bridge).await?;
    let registry = ConnectorRegistry::with_builtins();
    let source = registry.source(&entry)?;

    let pipeline = DumpPipeline::new(bridge, loaded.config.runtime.retry.clone());
    let manifest = pipeline
        .run(&DumpSpec::from(&entry), source, CancellationToken::new())
        .await?;

    println!(
        "Dump complete: manifest {} ({} chunks, {} bytes)",
        manifest.id,
        manifest.chunks.len(),
        manifest.total_bytes
    );
    Ok(())
}
