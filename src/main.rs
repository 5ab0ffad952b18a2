use flyhigh::config::AppConfig;
use flyhigh::db::{init_pool, run_migrations};
use flyhigh::error::AppError;
use flyhigh::routes::create_router;
use flyhigh::state::AppState;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

const PRUNE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = run_migrations(&db).await {
        error!("migration failed: {err:?}");
        return Err(err);
    }

    let state = AppState::new(config.clone(), db);
    tokio::spawn(state.sessions.clone().run_pruner(PRUNE_INTERVAL));
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(
        seed_sample_trips = config.seed_sample_trips,
        session_ttl_hours = config.session_ttl_hours,
        "listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,flyhigh=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
