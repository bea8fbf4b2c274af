use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

/// Placeholder values that must be replaced in production.
const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";
const DEFAULT_ADMIN_PASSWORD: &str = "Admin99";

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub admin_password: String,
}

impl Config {
    /// Read `ESIGN_*` environment variables, falling back to development
    /// defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env_or("ESIGN_HOST", "0.0.0.0");
        let port: u16 = env_or("ESIGN_PORT", "3000")
            .parse()
            .context("ESIGN_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("ESIGN_HOST must be an IP address")?;

        let jwt_secret = env_or("ESIGN_JWT_SECRET", DEFAULT_JWT_SECRET);
        if jwt_secret == DEFAULT_JWT_SECRET {
            warn!("ESIGN_JWT_SECRET is unset, using the development placeholder");
        }

        let admin_password = env_or("ESIGN_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD);
        if admin_password == DEFAULT_ADMIN_PASSWORD {
            warn!("ESIGN_ADMIN_PASSWORD is unset, a new ADMIN account gets the default password");
        }

        Ok(Self {
            addr,
            db_path: env_or("ESIGN_DB_PATH", "esign.db").into(),
            jwt_secret,
            admin_password,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
