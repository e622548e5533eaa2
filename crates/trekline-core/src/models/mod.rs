//! Data models for marketplace entities.
//!
//! - `Trek`: a listed trek with its discovery metrics (rating, reviews, bookings)
//! - `Booking`, `Review`, `WishlistEntry`: user-scoped records

pub mod booking;
pub mod trek;

pub use booking::{Booking, BookingStatus, Review, WishlistEntry};
pub use trek::{Difficulty, Trek};
