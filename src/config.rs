use std::{env, net::SocketAddr};

use crate::error::AppError;

const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    /// Load the sample trips into every new session's trip store.
    pub seed_sample_trips: bool,
    /// How long a session stays valid after sign-in.
    pub session_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://flyhigh.db?mode=rwc".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-flyhigh-cookie-secret-please".to_string());

        let seed_sample_trips = match env::var("SEED_SAMPLE_TRIPS") {
            Ok(raw) => parse_flag(&raw)
                .ok_or_else(|| AppError::Config(format!("invalid SEED_SAMPLE_TRIPS: {raw}")))?,
            Err(_) => true,
        };

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or_else(|| AppError::Config(format!("invalid SESSION_TTL_HOURS: {raw}")))?,
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            seed_sample_trips,
            session_ttl_hours,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
