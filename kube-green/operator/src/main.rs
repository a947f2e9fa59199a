mod config;
mod live_cluster;
mod reconciler;

use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use kube::runtime::controller::{Config as ControllerConfig, Controller};
use kube::runtime::watcher;
use kube::{Api, Client};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use kube_green_crd::SleepInfo;

use config::Config;
use live_cluster::LiveCluster;
use reconciler::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing();

    let client = Client::try_default().await?;
    let cluster = Arc::new(LiveCluster::new(client.clone()));
    let context = Arc::new(Context {
        client: cluster,
        config: config.clone(),
    });

    let sleep_infos: Api<SleepInfo> = match &config.namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    tracing::info!(
        dry_run = config.dry_run,
        max_concurrent_reconciles = config.max_concurrent_reconciles,
        "starting kube-green"
    );

    let concurrency = usize::from(config.max_concurrent_reconciles).max(1);

    Controller::new(sleep_infos, watcher::Config::default())
        .with_config(ControllerConfig::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconciler::reconcile, reconciler::error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((object_ref, action)) => {
                    tracing::debug!(?object_ref, ?action, "reconciled");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reconcile stream error");
                }
            }
        })
        .await;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
