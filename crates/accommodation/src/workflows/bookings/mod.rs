pub mod domain;
pub mod router;
pub mod service;

pub use domain::{
    Arrival, ArrivalRequest, Booking, BookingId, BookingLinks, BookingStatus, BookingView,
    Cancellation, CancellationRequest, NewBooking, NewOutOfServicePeriod, NonArrival,
    NonArrivalRequest, OutOfServiceId, OutOfServicePeriod,
};
pub use router::booking_router;
pub use service::{BookingError, BookingService};
