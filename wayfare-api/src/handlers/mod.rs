pub mod admin;
pub mod bookings;
pub mod flights;
pub mod health;
