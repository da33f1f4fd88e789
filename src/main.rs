use anyhow::Result;
use clap::Parser;
use gift_shop::{
    cli::{Args, CliApp},
    database::Database,
    utils::Config,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_env()?;

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    tracing::info!("🎁 Gift shop starting in {} environment", config.environment);

    let database = Database::from_url(&config.database_url).await?;

    match database.health_check().await {
        Ok(true) => tracing::debug!("Database health check passed"),
        Ok(false) => {
            tracing::error!("Database health check failed. Please check your database connection.");
            return Err(anyhow::anyhow!("Database health check failed"));
        }
        Err(e) => {
            tracing::error!("Failed to perform health check: {}", e);
            return Err(e);
        }
    }

    database.migrate().await?;

    let app = CliApp::new(&config, &database)?;
    let result = app.run(args).await;

    database.close().await;
    result
}
