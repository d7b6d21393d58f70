use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Base URL of the hosted PayOS checkout page; the order code is appended.
    pub payos_checkout_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let payos_checkout_url = env::var("PAYOS_CHECKOUT_URL")
            .unwrap_or_else(|_| "https://pay.payos.vn/web".to_string());
        Ok(Self {
            database_url,
            host,
            port,
            payos_checkout_url,
        })
    }
}
