use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub db_pool_size: u32,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// Quiet period the scoring worker waits for before recomputing.
    pub scoring_debounce: Duration,
    /// Events buffered per realtime client before new ones are dropped.
    pub client_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = env_or("RO_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid RO_LISTEN_ADDR")?;
        let db_path = env_or("RO_DB_PATH", "./db/app.db");
        let cors_allow = env_or("RO_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            listen_addr,
            db_path,
            db_pool_size: parse_or("RO_DB_POOL_SIZE", 8),
            cors_allow,
            request_timeout: Duration::from_millis(parse_or("RO_REQUEST_TIMEOUT_MS", 30_000)),
            scoring_debounce: Duration::from_millis(parse_or("RO_SCORING_DEBOUNCE_MS", 500)),
            client_queue_capacity: parse_or("RO_CLIENT_QUEUE_CAPACITY", 256),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
