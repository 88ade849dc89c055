pub mod bookings;
pub mod dispatch;
