//! Postgres-backed provider presence reader.
//!
//! The presence service owns the `provider_sessions` table (heartbeats,
//! online flags, locations); this engine only reads it. Category and online
//! filtering happen in SQL, the geofence check in Rust — the fleet within
//! one city is small enough that pulling candidate rows is cheaper than
//! teaching plain Postgres great-circle math.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::traits::BaseProviderPresence;
use crate::common::{Coordinates, ProviderId};

#[derive(Clone)]
pub struct PgProviderPresence {
    pool: PgPool,
}

impl PgProviderPresence {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseProviderPresence for PgProviderPresence {
    async fn list_eligible_providers(
        &self,
        category: &str,
        location: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<ProviderId>> {
        let rows: Vec<PgRow> = sqlx::query(
            r#"
            SELECT provider_id, location_lat, location_lng
            FROM provider_sessions
            WHERE is_online = TRUE AND $1 = ANY(service_categories)
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        let mut eligible = Vec::new();
        for row in rows {
            let provider_id: ProviderId = row.try_get("provider_id")?;
            let at = Coordinates {
                lat: row.try_get("location_lat")?,
                lng: row.try_get("location_lng")?,
            };
            if at.distance_km(&location) <= radius_km {
                eligible.push(provider_id);
            }
        }

        tracing::debug!(
            category,
            radius_km,
            count = eligible.len(),
            "eligibility filter resolved"
        );
        Ok(eligible)
    }
}
