use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uniflow_api::{
    config, db, events, providers::registry::ProviderRegistry, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config().context("loading configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);
    info!(environment = %cfg.environment, "starting uniflow-api");

    let db = Arc::new(
        db::establish_connection_from_app_config(&cfg)
            .await
            .context("connecting to database")?,
    );
    if cfg.auto_migrate {
        db::run_migrations(&db).await.context("running migrations")?;
        info!("migrations applied");
    } else {
        warn!("auto_migrate disabled; assuming schema is current");
    }

    let (event_sender, event_rx) = events::channel(1024);
    let event_sender = Arc::new(event_sender);
    tokio::spawn(events::process_events(event_rx));

    let registry = Arc::new(ProviderRegistry::new(
        db.clone(),
        &cfg.credential_key,
        cfg.provider_timeout(),
    ));

    let host = cfg.host.clone();
    let port = cfg.port;
    let state = AppState::build(db, cfg, event_sender, registry);

    let app = uniflow_api::app(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(std::time::Duration::from_secs(30))),
    );

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("parsing bind address")?;
    info!("uniflow-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding listener")?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
