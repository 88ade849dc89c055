//! Environment-driven configuration.
//!
//! Operational parameters the product spec leaves open (broadcast window,
//! geofence radius, OTP length) live here with documented defaults instead
//! of being hard-coded at call sites.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port. Default 8080.
    pub port: u16,
    /// Postgres connection string. Required by the server binary.
    pub database_url: String,
    /// Geofence radius for the eligibility filter, km. Default 10.
    pub broadcast_radius_km: f64,
    /// How long a broadcast stays open before the sweep expires it, seconds.
    /// Default 20 (the provider app shows a ~20s countdown).
    pub broadcast_window_secs: u64,
    /// Expiry sweep cadence, seconds. Default 5; the scheduler clamps it
    /// to 1..=59 (it becomes the seconds step of a cron expression).
    pub expiry_sweep_secs: u64,
    /// Digits in the arrival OTP. Default 4.
    pub otp_length: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Best-effort .env load for local development
        dotenvy::dotenv().ok();

        Ok(Self {
            port: env_parsed("PORT", 8080)?,
            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            broadcast_radius_km: env_parsed("BROADCAST_RADIUS_KM", 10.0)?,
            broadcast_window_secs: env_parsed("BROADCAST_WINDOW_SECS", 20)?,
            expiry_sweep_secs: env_parsed("EXPIRY_SWEEP_SECS", 5)?,
            otp_length: env_parsed("OTP_LENGTH", 4)?,
        })
    }

    /// Configuration for tests: no database, short broadcast window.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: String::new(),
            broadcast_radius_km: 10.0,
            broadcast_window_secs: 20,
            expiry_sweep_secs: 1,
            otp_length: 4,
        }
    }

    pub fn broadcast_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.broadcast_window_secs as i64)
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {}", key)),
        Err(_) => Ok(default),
    }
}
