pub mod booking;
pub mod booking_request;

pub use booking::{Booking, BookingStatus, ChecklistItem, PaymentStatus};
pub use booking_request::{BookingRequest, RequestStatus};
