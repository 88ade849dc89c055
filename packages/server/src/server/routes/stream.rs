//! SSE streaming endpoint.
//!
//! GET /api/streams/:topic
//!
//! Subscribes to the stream hub by topic string and forwards JSON values as
//! SSE events. Two topic families are served: `booking:{id}` for the
//! parties to a booking, and `provider:{id}:requests` for a provider's
//! incoming broadcast offers. Identity comes from the same gateway headers
//! as the command routes.
//!
//! Delivery is at-least-once and snapshots carry the full booking state, so
//! a consumer that reconnects (or sees a `lagged` event) recovers by
//! fetching the booking once and resuming.

use std::convert::Infallible;

use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::common::Actor;
use crate::domains::bookings::data::BookingStore;
use crate::server::app::AxumAppState;
use crate::server::routes::actor_from_headers;

pub async fn stream_handler(
    Extension(state): Extension<AxumAppState>,
    Path(topic): Path<String>,
    headers: HeaderMap,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let actor = actor_from_headers(&headers).map_err(|_| StatusCode::UNAUTHORIZED)?;
    authorize_topic(&state, &topic, &actor).await?;

    let rx = state.deps.stream_hub.subscribe(&topic).await;

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let events = BroadcastStream::new(rx).filter_map(|result| async {
        match result {
            Ok(value) => {
                let event_name = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("message");
                Event::default()
                    .event(event_name)
                    .json_data(&value)
                    .ok()
                    .map(Ok)
            }
            Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                // Consumer fell behind; it must refetch before resuming
                Event::default()
                    .event("lagged")
                    .json_data(&serde_json::json!({"missed": n}))
                    .ok()
                    .map(Ok)
            }
        }
    });

    Ok(Sse::new(connected.chain(events)).keep_alive(KeepAlive::default()))
}

/// Topic-level authorization.
///
/// `booking:{id}` is readable by the owning client, the assigned provider,
/// and operators. `provider:{id}:requests` only by that provider.
async fn authorize_topic(
    state: &AxumAppState,
    topic: &str,
    actor: &Actor,
) -> Result<(), StatusCode> {
    if let Some(raw) = topic.strip_prefix("booking:") {
        let booking_id = crate::common::BookingId::parse(raw).map_err(|_| StatusCode::BAD_REQUEST)?;
        let booking = state
            .deps
            .store
            .booking(booking_id)
            .await
            .map_err(|_| StatusCode::NOT_FOUND)?;

        return match actor {
            Actor::Client(id) if *id == booking.client_id => Ok(()),
            Actor::Provider(id) if booking.provider_id == Some(*id) => Ok(()),
            Actor::Operator(_) => Ok(()),
            _ => Err(StatusCode::FORBIDDEN),
        };
    }

    if let Some(raw) = topic
        .strip_prefix("provider:")
        .and_then(|rest| rest.strip_suffix(":requests"))
    {
        let provider_id =
            crate::common::ProviderId::parse(raw).map_err(|_| StatusCode::BAD_REQUEST)?;
        return match actor {
            Actor::Provider(id) if *id == provider_id => Ok(()),
            _ => Err(StatusCode::FORBIDDEN),
        };
    }

    Err(StatusCode::BAD_REQUEST)
}
