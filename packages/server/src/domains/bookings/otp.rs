//! Arrival OTP generation and verification.
//!
//! The OTP is a short numeric secret shown in the client app and read back
//! to the provider at the door. It is scoped to one booking, so collisions
//! across concurrent bookings are acceptable. Verification is a pure check:
//! no state mutates, retries are unlimited (the PIN entry screen re-prompts
//! on failure), and mismatches are logged for audit.

use rand::Rng;

use crate::domains::bookings::models::Booking;

/// Generates a numeric code of `len` digits from a uniform random source.
/// Leading zeros are allowed, so the code is always exactly `len` chars.
pub fn generate(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

/// Compares `submitted` against the booking's stored OTP in constant time.
///
/// Returns `false` on mismatch rather than erroring — the caller's UI owns
/// the retry flow.
pub fn verify(booking: &Booking, submitted: &str) -> bool {
    let ok = constant_time_eq(booking.otp.as_bytes(), submitted.as_bytes());
    if !ok {
        tracing::warn!(
            booking_id = %booking.id,
            status = %booking.status,
            "arrival OTP verification failed"
        );
    }
    ok
}

/// Length-aware constant-time byte comparison: always walks the full
/// expected secret so timing doesn't leak the match prefix.
fn constant_time_eq(expected: &[u8], submitted: &[u8]) -> bool {
    let mut diff = expected.len() ^ submitted.len();
    for (i, &byte) in expected.iter().enumerate() {
        let other = submitted.get(i).copied().unwrap_or(0);
        diff |= (byte ^ other) as usize;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BookingId, ClientId, Coordinates};
    use crate::domains::bookings::models::{BookingStatus, PaymentStatus};
    use chrono::Utc;

    fn booking_with_otp(otp: &str) -> Booking {
        let now = Utc::now();
        Booking {
            id: BookingId::new(),
            client_id: ClientId::new(),
            provider_id: None,
            status: BookingStatus::EnRoute,
            service_category: "Plumber".to_string(),
            requirements: serde_json::json!({}),
            notes: None,
            otp: otp.to_string(),
            checklist: Vec::new(),
            estimated_cost: None,
            final_cost: None,
            payment_status: PaymentStatus::Pending,
            cancel_reason: None,
            location: Coordinates::new(28.70, 76.96),
            created_at: now,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn generated_codes_are_numeric_and_sized() {
        for len in [4, 5, 6] {
            let code = generate(len);
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn generated_codes_vary() {
        // 10^4 codes; 20 draws colliding into one value means a broken rng
        let codes: std::collections::HashSet<_> = (0..20).map(|_| generate(4)).collect();
        assert!(codes.len() > 1);
    }

    #[test]
    fn correct_code_verifies() {
        let b = booking_with_otp("4821");
        assert!(verify(&b, "4821"));
    }

    #[test]
    fn wrong_code_fails() {
        let b = booking_with_otp("4821");
        assert!(!verify(&b, "0000"));
        assert!(!verify(&b, "4820"));
    }

    #[test]
    fn length_mismatch_fails() {
        let b = booking_with_otp("4821");
        assert!(!verify(&b, ""));
        assert!(!verify(&b, "482"));
        assert!(!verify(&b, "48210"));
    }

    #[test]
    fn verification_does_not_mutate() {
        let b = booking_with_otp("4821");
        let before = b.otp.clone();
        let _ = verify(&b, "0000");
        let _ = verify(&b, "4821");
        assert_eq!(b.otp, before);
    }
}
