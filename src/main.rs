use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;

use planting_wizard::config::WizardConfig;
use planting_wizard::store::{Database, LibSqlBackend, SettingsRecordSink};
use planting_wizard::wizard::{SettingsDraftStore, WizardRouteState, WizardSessions, wizard_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WizardConfig::from_env();

    eprintln!("🌱 Planting Wizard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/users/{{user_id}}/wizard", config.port);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Draft namespace: {}\n", config.draft_namespace);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );

    // ── Wizard sessions ─────────────────────────────────────────────────
    let areas = Arc::new(SettingsRecordSink::new(Arc::clone(&db)));
    let sessions = Arc::new(WizardSessions::new(
        Arc::new(SettingsDraftStore::new(Arc::clone(&db))),
        areas.clone(),
        config.draft_namespace.clone(),
    ));

    // Spawn session pruning task
    let prune_sessions = Arc::clone(&sessions);
    let idle_timeout = config.session_idle_timeout;
    let pruning_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600)); // Every 10 min
        interval.tick().await; // Skip immediate first tick
        loop {
            interval.tick().await;
            prune_sessions.prune_idle(idle_timeout).await;
        }
    });

    let app = wizard_routes(WizardRouteState {
        sessions: Arc::clone(&sessions),
        areas,
    })
    .layer(CorsLayer::permissive());

    // ── HTTP server ─────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Planting wizard server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await
        .context("HTTP server error")?;

    pruning_handle.abort();

    // Let queued draft writes land before exiting.
    sessions.flush_all().await;
    tracing::info!("Planting wizard stopped");
    Ok(())
}
