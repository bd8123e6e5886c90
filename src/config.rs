use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Duration;

pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub sendgrid_api_key: Option<String>,
    pub sender_email: String,
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let session_secret = env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?;
        let ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .context("SESSION_TTL_HOURS must be an integer")?,
            Err(_) => 24,
        };
        // no API key means log-only email, not a startup failure
        let sendgrid_api_key = env::var("SENDGRID_API_KEY").ok().filter(|key| !key.is_empty());
        let sender_email =
            env::var("SENDER_EMAIL").unwrap_or_else(|_| "wohibc2025@gmail.com".to_string());
        let upload_dir =
            PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()));

        Ok(Self {
            bind_addr,
            database_url,
            session_secret,
            session_ttl: Duration::hours(ttl_hours),
            sendgrid_api_key,
            sender_email,
            upload_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_requires_database_and_secret_then_fills_defaults() {
        env::remove_var("DATABASE_URL");
        env::remove_var("SESSION_SECRET");
        assert!(Config::from_env().is_err());

        env::set_var("DATABASE_URL", "postgres://localhost/whibc");
        env::set_var("SESSION_SECRET", "test-secret");
        env::remove_var("BIND_ADDR");
        env::remove_var("SESSION_TTL_HOURS");
        env::remove_var("SENDGRID_API_KEY");
        env::remove_var("SENDER_EMAIL");
        env::remove_var("UPLOAD_DIR");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.session_ttl, Duration::hours(24));
        assert!(config.sendgrid_api_key.is_none());
        assert_eq!(config.sender_email, "wohibc2025@gmail.com");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }
}
