//! Manifests command: list stored artifacts for a source job

use anyhow::Result;
use camino::Utf8Path;
use clap::Args;

use pontoon_core::config::PontoonConfig;
use pontoon_pipeline::select;

#[derive(Args, Debug)]
pub struct ManifestsArgs {
    /// Source job whose manifests to list
    pub job: String,
}

pub async fn run(args: ManifestsArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let loaded = PontoonConfig::load(config_path)?;
    let bridge = pontoon_bridge::from_config(&loaded.config.bridge).await?;

    let manifests = select::list_manifests(bridge.as_ref(), &args.job).await?;
    if manifests.is_empty() {
        println!("No manifests stored for job {}", args.job);
        return Ok(());
    }

    for manifest in manifests {
        println!(
            "{}  {}  {:>8}  {} chunks  {} bytes",
            manifest.created_at.format("%Y-%m-%dT%H:%M:%SZ"),
            manifest.id,
            manifest.status.to_string(),
            manifest.chunks.len(),
            manifest.total_bytes
        );
    }
    Ok(())
}
