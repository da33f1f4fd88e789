use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

pub const DEFAULT_JWT_SECRET: &str = "default-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub log_level: String,
    pub environment: String,
    pub session_dir: PathBuf,
    pub shipping_fee: Decimal,
    pub admin_email: Option<String>,
    pub image_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let shipping_fee = match env::var("SHIPPING_FEE") {
            Ok(value) => Decimal::from_str(value.trim())
                .map_err(|e| anyhow::anyhow!("SHIPPING_FEE '{}' is not a valid amount: {}", value, e))?,
            Err(_) => Decimal::from(50),
        };

        let config = Config {
            database_url: env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            session_dir: env::var("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./.gift-shop")),
            shipping_fee,
            admin_email: non_empty_var("ADMIN_EMAIL"),
            image_base_url: non_empty_var("IMAGE_BASE_URL"),
        };

        config.validate()?;
        tracing::info!("Config: successfully loaded for {} environment", config.environment);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.is_empty() {
            return Err(anyhow::anyhow!("DATABASE_URL is not set"));
        }

        let url = Url::parse(&self.database_url)
            .map_err(|e| anyhow::anyhow!("DATABASE_URL is not a valid URL: {}", e))?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must start with 'postgres://' or 'postgresql://'"
            ));
        }

        if self.shipping_fee < Decimal::ZERO {
            return Err(anyhow::anyhow!("SHIPPING_FEE cannot be negative"));
        }

        if let Some(base) = &self.image_base_url {
            Url::parse(base).map_err(|e| anyhow::anyhow!("IMAGE_BASE_URL is not a valid URL: {}", e))?;
        }

        if self.is_production() && self.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(anyhow::anyhow!("JWT_SECRET is not set in production"));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
