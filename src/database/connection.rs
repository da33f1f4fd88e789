use anyhow::Context;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn from_url(database_url: &str) -> Result<Self, anyhow::Error> {
        tracing::info!("Connecting to database at {}", redact_credentials(database_url));
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to database")?;

        tracing::info!("Database connected successfully");
        Ok(Database { pool })
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), anyhow::Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool, anyhow::Error> {
        let health_check: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Failed to perform health check")?;

        tracing::debug!("Database health check returned {}", health_check);
        Ok(health_check == 1)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database connection closed successfully");
    }
}

// Replace the userinfo part of a connection URL so it can be logged.
fn redact_credentials(database_url: &str) -> String {
    match url::Url::parse(database_url) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            let _ = url.set_username("***");
            let _ = url.set_password(None);
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "<invalid url>".to_string(),
    }
}
