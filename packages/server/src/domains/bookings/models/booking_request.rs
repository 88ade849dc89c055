//! Per-provider broadcast request rows.
//!
//! One row exists per (booking, candidate provider) pair, created when the
//! arbiter fans out a request. A row is resolved exactly once; across all
//! rows for one booking at most one ever reaches `Accepted` — the
//! booking-level CAS is what actually guarantees that.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};

use crate::common::{BookingId, ProviderId, RequestId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id: RequestId,
    pub booking_id: BookingId,
    pub provider_id: ProviderId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl BookingRequest {
    pub fn offer(booking_id: BookingId, provider_id: ProviderId) -> Self {
        Self {
            id: RequestId::new(),
            booking_id,
            provider_id,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Accepted => "ACCEPTED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Expired => "EXPIRED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "ACCEPTED" => Ok(RequestStatus::Accepted),
            "REJECTED" => Ok(RequestStatus::Rejected),
            "EXPIRED" => Ok(RequestStatus::Expired),
            _ => Err(anyhow::anyhow!("invalid request status: {}", s)),
        }
    }
}

impl FromRow<'_, PgRow> for BookingRequest {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<RequestStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: e.into(),
            })?;

        Ok(BookingRequest {
            id: row.try_get("id")?,
            booking_id: row.try_get("booking_id")?,
            provider_id: row.try_get("provider_id")?,
            status,
            created_at: row.try_get("created_at")?,
        })
    }
}

// =============================================================================
// SQL queries
// =============================================================================

impl BookingRequest {
    pub async fn find_by_id(id: RequestId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BookingRequest>("SELECT * FROM booking_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_booking(
        booking_id: BookingId,
        pool: &PgPool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BookingRequest>(
            "SELECT * FROM booking_requests WHERE booking_id = $1 ORDER BY created_at",
        )
        .bind(booking_id)
        .fetch_all(pool)
        .await
    }

    pub async fn insert_many(requests: &[Self], pool: &PgPool) -> Result<(), sqlx::Error> {
        for request in requests {
            sqlx::query(
                r#"
                INSERT INTO booking_requests (id, booking_id, provider_id, status, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(request.id)
            .bind(request.booking_id)
            .bind(request.provider_id)
            .bind(request.status.to_string())
            .bind(request.created_at)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    /// Request-level CAS: resolve only if the row still holds `expected`.
    pub async fn compare_and_resolve(
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        pool: &PgPool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BookingRequest>(
            r#"
            UPDATE booking_requests
            SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected.to_string())
        .bind(next.to_string())
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_parse_roundtrip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Rejected,
            RequestStatus::Expired,
        ] {
            let parsed: RequestStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn offer_starts_pending() {
        let offer = BookingRequest::offer(BookingId::new(), ProviderId::new());
        assert_eq!(offer.status, RequestStatus::Pending);
    }
}
