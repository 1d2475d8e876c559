//! Run Server
//!
//! HTTP front-end for registering git repositories with the pollers.
//!
//! Architecture:
//! - Configuration: settings from environment variables
//! - Repository: PostgreSQL store for repositories
//! - Services: registration logic
//! - API: axum routes behind the request pipeline
//! - Notify: best-effort delivery of notifications to NATS
//!
//! A registration is saved synchronously; the poller notification is handed
//! to the dispatcher and delivered in the background, so the HTTP response
//! never waits for the message bus.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod notify;
pub mod repository;
pub mod service;

use crate::api::AppState;
use crate::config::Config;
use crate::notify::{BusForwarder, Dispatcher, MessageBus, NatsBus, notification_channel};
use crate::repository::PgRepoStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing before loading the configuration so its defaults get logged
    let log_level = std::env::var("RUN_LOG_LEVEL").ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| crate::config::log_filter(log_level.as_deref()).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;

    info!("booting server...");

    info!("connecting to database");
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    info!("setting up pollers send channel");
    let (sender, receiver) = notification_channel(config.notify_capacity);
    let dispatcher = Dispatcher::new(sender, config.dispatcher());

    // Without NATS the receiver is dropped: dispatches retry against the
    // closed channel, then drop the notification, while registrations keep working.
    info!("setting up NATS connection");
    let forwarder = match NatsBus::connect(&config.nats_url).await {
        Ok(bus) => {
            let bus: Arc<dyn MessageBus> = Arc::new(bus);
            Some(BusForwarder::new(bus, config.poller_subject.clone()).spawn(receiver))
        }
        Err(e) => {
            warn!(error = %e, "unable to connect to NATS, poller notifications will be dropped");
            drop(receiver);
            None
        }
    };

    let state = AppState {
        store: Arc::new(PgRepoStore::new(pool)),
        dispatcher: dispatcher.clone(),
    };
    let app = api::create_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("shutting down server")?;

    info!("server stopped, shutting down notifications");
    dispatcher.shutdown();
    // The router and its dispatcher clones are gone; dropping the last
    // handle closes the channel once abandoned dispatches have finished.
    drop(dispatcher);

    if let Some(forwarder) = forwarder {
        match tokio::time::timeout(config.shutdown_timeout, forwarder).await {
            Ok(Ok(stats)) => info!(
                published = stats.published,
                failed = stats.failed,
                "forwarder drained"
            ),
            Ok(Err(e)) => error!("forwarder task panicked: {}", e),
            Err(_) => warn!("forwarder did not drain within {:?}", config.shutdown_timeout),
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    info!("shutdown signal received");
}
