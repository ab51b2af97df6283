mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use ordersync_infra::queue::PgOrderQueueStore;
use ordersync_infra::remote::HttpOrderTransport;
use ordersync_infra::{
    database_url_from_env, load_store_config, OrderSyncProcessor, SyncConfig, SyncScheduler,
};
use ordersync_orders::LocalOrder;

use crate::cli::{Cli, Command};

type Processor = OrderSyncProcessor<PgOrderQueueStore, HttpOrderTransport>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ordersync_observability::init();

    let cli = Cli::parse();

    match cli.command() {
        Command::InitSchema => {
            let store = connect(&database_url_from_env()?).await?;
            store.ensure_schema().await?;
            tracing::info!("queue schema ready");
        }
        Command::Enqueue { file } => {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let order: LocalOrder = serde_json::from_str(&raw).context("invalid order document")?;
            let store = connect(&database_url_from_env()?).await?;
            let id = store.enqueue(&order).await?;
            tracing::info!(order_id = %id, reference = %order.increment_id, "order queued");
        }
        Command::Once => {
            let config = load_config()?;
            let store = connect(&config.database_url).await?;
            let report = build_processor(&config, store)?.process_pending().await?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Cancel { order_id } => {
            let config = load_config()?;
            let store = connect(&config.database_url).await?;
            let cancelled = build_processor(&config, store)?.cancel(*order_id).await?;
            if !cancelled {
                anyhow::bail!("fulfillment API declined to cancel order {order_id}");
            }
        }
        Command::Run => {
            let config = load_config()?;
            let store = connect(&config.database_url).await?;
            store.ensure_schema().await?;
            let processor = Arc::new(build_processor(&config, store)?);
            let handle = SyncScheduler::new(config.poll_interval).spawn(processor);

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            tracing::info!("shutdown requested");

            let stats = handle.stats();
            handle.shutdown().await;
            tracing::info!(?stats, "order sync worker stopped");
        }
    }

    Ok(())
}

fn load_config() -> anyhow::Result<SyncConfig> {
    let config = SyncConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

async fn connect(database_url: &str) -> anyhow::Result<PgOrderQueueStore> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to the order database")?;
    Ok(PgOrderQueueStore::new(pool))
}

fn build_processor(config: &SyncConfig, store: PgOrderQueueStore) -> anyhow::Result<Processor> {
    let transport = HttpOrderTransport::new(&config.api_base_url, &config.api_token, config.http_timeout)?;
    let (store_config, regions) = load_store_config(&config.store_config_path)?;

    Ok(
        OrderSyncProcessor::new(store, transport, Arc::new(store_config), Arc::new(regions))
            .with_batch_size(config.batch_size),
    )
}
