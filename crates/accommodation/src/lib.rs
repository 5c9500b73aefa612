//! Bed availability search, bookings, and application withdrawal for probation
//! accommodation services (Approved Premises and Temporary Accommodation).

pub mod config;
pub mod error;
pub mod pagination;
pub mod telemetry;
pub mod workflows;
