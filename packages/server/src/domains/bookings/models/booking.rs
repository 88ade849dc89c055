//! The central booking entity and its status enums.
//!
//! All SQL for the `bookings` table lives here; the Postgres store in
//! `data/pg.rs` delegates to these functions.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};

use crate::common::{BookingId, ClientId, Coordinates, ProviderId};

/// One service engagement between a client and a provider, tracked through
/// its full lifecycle. Never deleted — only moved to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub client_id: ClientId,
    /// Null until a provider wins the acceptance race.
    pub provider_id: Option<ProviderId>,
    pub status: BookingStatus,

    pub service_category: String,
    /// Free-form key/value requirements captured by the request form.
    pub requirements: serde_json::Value,
    pub notes: Option<String>,

    /// Short numeric secret proving physical arrival. Scoped per booking —
    /// collisions across bookings are fine.
    pub otp: String,
    /// Provider-completable items; informational only, never gates a
    /// transition.
    pub checklist: Vec<ChecklistItem>,

    pub estimated_cost: Option<f64>,
    pub final_cost: Option<f64>,
    pub payment_status: PaymentStatus,
    /// Required when cancelling an in-progress booking.
    pub cancel_reason: Option<String>,

    pub location: Coordinates,

    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub label: String,
    pub done: bool,
}

/// Closed set of booking statuses. The legal-transition table lives in
/// `machines` and is enforced centrally — screens never re-derive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Requested,
    Pending,
    Confirmed,
    EnRoute,
    InProgress,
    Completed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Expired
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Requested => "REQUESTED",
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::EnRoute => "EN_ROUTE",
            BookingStatus::InProgress => "IN_PROGRESS",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Expired => "EXPIRED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "REQUESTED" => Ok(BookingStatus::Requested),
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "EN_ROUTE" => Ok(BookingStatus::EnRoute),
            "IN_PROGRESS" => Ok(BookingStatus::InProgress),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "EXPIRED" => Ok(BookingStatus::Expired),
            _ => Err(anyhow::anyhow!("invalid booking status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            "FAILED" => Ok(PaymentStatus::Failed),
            _ => Err(anyhow::anyhow!("invalid payment status: {}", s)),
        }
    }
}

// =============================================================================
// Row mapping
// =============================================================================

impl FromRow<'_, PgRow> for Booking {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        fn decode_err(
            column: &str,
            err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
        ) -> sqlx::Error {
            sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: err.into(),
            }
        }

        let status: String = row.try_get("status")?;
        let status = status
            .parse::<BookingStatus>()
            .map_err(|e| decode_err("status", e))?;

        let payment: String = row.try_get("payment_status")?;
        let payment_status = payment
            .parse::<PaymentStatus>()
            .map_err(|e| decode_err("payment_status", e))?;

        let checklist: serde_json::Value = row.try_get("checklist")?;
        let checklist: Vec<ChecklistItem> =
            serde_json::from_value(checklist).map_err(|e| decode_err("checklist", e))?;

        Ok(Booking {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            provider_id: row.try_get("provider_id")?,
            status,
            service_category: row.try_get("service_category")?,
            requirements: row.try_get("requirements")?,
            notes: row.try_get("notes")?,
            otp: row.try_get("otp")?,
            checklist,
            estimated_cost: row.try_get("estimated_cost")?,
            final_cost: row.try_get("final_cost")?,
            payment_status,
            cancel_reason: row.try_get("cancel_reason")?,
            location: Coordinates {
                lat: row.try_get("location_lat")?,
                lng: row.try_get("location_lng")?,
            },
            created_at: row.try_get("created_at")?,
            accepted_at: row.try_get("accepted_at")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// =============================================================================
// SQL queries - all bookings-table queries live here
// =============================================================================

impl Booking {
    pub async fn find_by_id(id: BookingId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                id, client_id, provider_id, status, service_category,
                requirements, notes, otp, checklist,
                estimated_cost, final_cost, payment_status, cancel_reason,
                location_lat, location_lng,
                created_at, accepted_at, started_at, completed_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
            )
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.client_id)
        .bind(self.provider_id)
        .bind(self.status.to_string())
        .bind(&self.service_category)
        .bind(&self.requirements)
        .bind(&self.notes)
        .bind(&self.otp)
        .bind(serde_json::to_value(&self.checklist).unwrap_or_default())
        .bind(self.estimated_cost)
        .bind(self.final_cost)
        .bind(self.payment_status.to_string())
        .bind(&self.cancel_reason)
        .bind(self.location.lat)
        .bind(self.location.lng)
        .bind(self.created_at)
        .bind(self.accepted_at)
        .bind(self.started_at)
        .bind(self.completed_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await
    }

    /// The CAS primitive: update only if the stored status still equals
    /// `expected`. Returns `None` when the guard fails (caller maps that to
    /// a conflict against the fresh row).
    pub async fn compare_and_transition(
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        fields: &super::super::data::TransitionFields,
        pool: &PgPool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let checklist = match &fields.checklist {
            Some(items) => Some(serde_json::to_value(items).unwrap_or_default()),
            None => None,
        };

        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $3,
                provider_id = COALESCE($4, provider_id),
                accepted_at = COALESCE($5, accepted_at),
                started_at = COALESCE($6, started_at),
                completed_at = COALESCE($7, completed_at),
                final_cost = COALESCE($8, final_cost),
                payment_status = COALESCE($9, payment_status),
                cancel_reason = COALESCE($10, cancel_reason),
                checklist = COALESCE($11, checklist),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected.to_string())
        .bind(next.to_string())
        .bind(fields.provider_id)
        .bind(fields.accepted_at)
        .bind(fields.started_at)
        .bind(fields.completed_at)
        .bind(fields.final_cost)
        .bind(fields.payment_status.map(|p| p.to_string()))
        .bind(&fields.cancel_reason)
        .bind(checklist)
        .fetch_optional(pool)
        .await
    }

    /// Bookings still waiting on the broadcast window that have outlived it.
    pub async fn find_stale_broadcasts(
        cutoff: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE status IN ('REQUESTED', 'PENDING') AND created_at < $1
            ORDER BY created_at
            "#,
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Records the payment collaborator's outcome. Guarded on the booking
    /// being completed — payment settles after service, never drives the
    /// lifecycle.
    pub async fn update_payment_status(
        id: BookingId,
        payment: PaymentStatus,
        pool: &PgPool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET payment_status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'COMPLETED'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payment.to_string())
        .fetch_optional(pool)
        .await
    }

    /// Replaces the checklist. Informational, single-party; no status guard
    /// beyond refusing terminal bookings.
    pub async fn update_checklist(
        id: BookingId,
        checklist: &[ChecklistItem],
        pool: &PgPool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET checklist = $2, updated_at = NOW()
            WHERE id = $1 AND status NOT IN ('COMPLETED', 'CANCELLED', 'EXPIRED')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(serde_json::to_value(checklist).unwrap_or_default())
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
            BookingStatus::Requested,
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::EnRoute,
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::Expired,
        ] {
            let parsed: BookingStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn wire_format_matches_client_apps() {
        // The mobile apps switch on these exact strings
        assert_eq!(BookingStatus::EnRoute.to_string(), "EN_ROUTE");
        assert_eq!(BookingStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(
            serde_json::to_string(&BookingStatus::EnRoute).unwrap(),
            "\"EN_ROUTE\""
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Expired.is_terminal());
        assert!(!BookingStatus::InProgress.is_terminal());
        assert!(!BookingStatus::Requested.is_terminal());
    }

    #[test]
    fn invalid_status_rejected() {
        assert!("EN ROUTE".parse::<BookingStatus>().is_err());
        assert!("".parse::<BookingStatus>().is_err());
    }
}
