// src/config.rs
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub db_max_connections: u32,
    /// Base URL of the external RAG service exposing `/database-rag` and `/browser-rag`.
    pub rag_service_url: Option<String>,
    pub rag_collection: String,
    pub rag_timeout_secs: u64,
    /// Requests per minute per client on the credential endpoints.
    pub auth_rate_limit: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        if database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using an insecure development secret");
                "default_secret".to_string()
            }
        };

        Ok(Self {
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            jwt_secret,
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS", 24)?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            rag_service_url: env::var("RAG_SERVICE_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .map(|v| v.trim_end_matches('/').to_string()),
            rag_collection: env::var("RAG_COLLECTION").unwrap_or_else(|_| "medical".to_string()),
            rag_timeout_secs: parse_var("RAG_TIMEOUT_SECS", 60)?,
            auth_rate_limit: parse_var("AUTH_RATE_LIMIT", 10)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
