//! Run command: the scheduler daemon

use std::sync::Arc;

use anyhow::Result;
use camino::Utf8Path;
use clap::Args;
use tracing::info;

use pontoon_connectors::ConnectorRegistry;
use pontoon_core::config::PontoonConfig;
use pontoon_scheduler::{Job, JobRole, Scheduler, SchedulerConfig};

use crate::runners::{DumpRunner, RestoreRunner};

#[derive(Args, Debug)]
pub struct RunArgs {}

pub async fn run(_args: RunArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let loaded = PontoonConfig::load(config_path)?;
    let config = &loaded.config;

    if config.sources.is_empty() && config.destinations.is_empty() {
        anyhow::bail!("configuration declares no sources or destinations to schedule");
    }

    let bridge = pontoon_bridge::from_config(&config.bridge).await?;
    let registry = Arc::new(ConnectorRegistry::with_builtins());
    let retry = config.runtime.retry.clone();

    let scheduler = Scheduler::new(SchedulerConfig::from(&config.runtime));

    for entry in &config.sources {
        let job = Job::new(entry.name.as_str(), JobRole::Dump, entry.cron.as_str())?;
        let runner = Arc::new(DumpRunner::new(
            bridge.clone(),
            retry.clone(),
            entry.clone(),
            registry.clone(),
        ));
        scheduler.register(job, runner)?;
    }

    for entry in &config.destinations {
        let job = Job::new(entry.name.as_str(), JobRole::Restore, entry.cron.as_str())?;
        let runner = Arc::new(RestoreRunner::new(
            bridge.clone(),
            retry.clone(),
            entry.clone(),
            registry.clone(),
        ));
        scheduler.register(job, runner)?;
    }

    scheduler.start();
    info!(
        "Pontoon scheduling {} dump and {} restore jobs; Ctrl-C to stop",
        config.sources.len(),
        config.destinations.len()
    );

    tokio::signal::ctrl_c().await?;
    scheduler.stop().await;

    Ok(())
}
