use omdb_data_server::{Config, build_router, create_app_state};
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env()?;
    let state = create_app_state(&config).await?;
    let app = build_router(state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    let addr = listener.local_addr()?;

    info!("OMDb data service starting on {}", addr);
    info!("Available endpoints:");
    info!("  GET /health");
    info!("  GET /movies?query=<title>");
    info!("  GET /movies/{{imdb_id}}");
    info!("  GET /searches");
    info!("  GET /searches/last");

    axum::serve(listener, app).await?;

    Ok(())
}
