//! `stateline-worker` -- queue dispatcher daemon.
//!
//! Polls the `action_messages` queue in the control database, resolves
//! each message's tenant, and runs the handler for its action type.
//! Shuts down cleanly on Ctrl-C, letting in-flight handlers finish their
//! current message.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default | Description                       |
//! |----------------------------|----------|---------|-----------------------------------|
//! | `DATABASE_URL`             | yes      | --      | Control database (queue, tenants) |
//! | `DISPATCH_POLL_MS`         | no       | `1000`  | Queue poll interval               |
//! | `DISPATCH_CONCURRENCY`     | no       | `4`     | Concurrent messages per process   |
//! | `DISPATCH_MAX_ATTEMPTS`    | no       | `5`     | Claims before dead-lettering      |
//! | `DISPATCH_RETRY_BASE_SECS` | no       | `30`    | Linear retry backoff base         |
//! | `DISPATCH_LEASE_SECS`      | no       | `300`   | Claim lease before redelivery     |

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stateline_dispatch::{DispatcherConfig, HandlerRegistry, MessageDispatcher, TenantResolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stateline_worker=debug,stateline_dispatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

    let control = stateline_db::create_pool(&database_url).await?;
    tracing::info!("Control database connection pool created");

    stateline_db::run_migrations(&control).await?;
    tracing::info!("Database migrations applied");

    let config = DispatcherConfig::from_env();
    let resolver = Arc::new(TenantResolver::new(control.clone()));
    let registry = Arc::new(HandlerRegistry::standard(control.clone()));
    let dispatcher = Arc::new(MessageDispatcher::new(control, resolver, registry, config));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    dispatcher.run(cancel).await;

    tracing::info!("Worker stopped");
    Ok(())
}
