use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// CSV file with the book catalog
    #[serde(default = "default_books_path")]
    pub books_path: String,

    /// CSV file with historical `user_id,book_id,rating` rows
    #[serde(default = "default_ratings_path")]
    pub ratings_path: String,

    /// JSON latent-factor model used for personalized ranking
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds of inactivity after which a visitor's ratings are dropped
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Seconds between expired-session sweeps
    #[serde(default = "default_session_sweep_secs")]
    pub session_sweep_secs: u64,
}

fn default_books_path() -> String {
    "data/books.csv".to_string()
}

fn default_ratings_path() -> String {
    "data/ratings.csv".to_string()
}

fn default_model_path() -> String {
    "data/model.json".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_session_ttl_secs() -> u64 {
    1800
}

fn default_session_sweep_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs.max(1))
    }
}
