use movie_ranking_service::{jobs::run_communal_snapshot_job, Config};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    info!(
        service = %config.service.service_name,
        method = config.aggregation.method.as_str(),
        "Starting communal ranking service"
    );

    run_communal_snapshot_job(&config).await?;

    Ok(())
}
