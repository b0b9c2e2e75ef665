use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use device_gateway::config::Config;
use device_gateway::service::bootstrap;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        port = cfg.port,
        base_dir = %cfg.base_dir.display(),
        credentials = %cfg.credential_path().display(),
        emulator = %cfg.emulator_host().unwrap_or("<none>"),
        loglevel = %cfg.loglevel
    );

    let http_client = bootstrap::build_http_client()?;
    let store = bootstrap::build_store(&cfg, &http_client);

    let state = device_gateway::GatewayState::new(store);
    info!(database_available = state.is_available(), "gateway state built");
    let app = device_gateway::gateway_router(state, &cfg.base_dir);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://localhost:{}", cfg.port);
    axum::serve(listener, app).await?;
    Ok(())
}
