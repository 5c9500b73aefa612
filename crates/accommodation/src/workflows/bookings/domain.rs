use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::workflows::applications::domain::{ApplicationId, PlacementRequestId, WithdrawalReason};
use crate::workflows::estate::{BedId, DateRange, PremisesId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutOfServiceId(pub String);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OutOfServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrival {
    pub arrival_date: NaiveDate,
    pub expected_departure_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonArrival {
    pub date: NaiveDate,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub date: NaiveDate,
    pub reason: WithdrawalReason,
    pub notes: Option<String>,
}

/// A bed held for a person over `[arrival_date, departure_date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub crn: String,
    pub premises_id: PremisesId,
    pub bed_id: BedId,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub application_id: Option<ApplicationId>,
    pub placement_request_id: Option<PlacementRequestId>,
    pub created_on: NaiveDate,
    pub arrival: Option<Arrival>,
    pub non_arrival: Option<NonArrival>,
    pub cancellation: Option<Cancellation>,
}

impl Booking {
    pub fn range(&self) -> DateRange {
        DateRange::spanning(self.arrival_date, self.departure_date)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_some()
    }

    pub fn has_arrival(&self) -> bool {
        self.arrival.is_some()
    }

    /// Cancelled bookings release their bed.
    pub fn blocks_bed(&self) -> bool {
        !self.is_cancelled()
    }

    pub fn status(&self) -> BookingStatus {
        if self.is_cancelled() {
            BookingStatus::Cancelled
        } else if self.has_arrival() {
            BookingStatus::Arrived
        } else if self.non_arrival.is_some() {
            BookingStatus::NotArrived
        } else {
            BookingStatus::AwaitingArrival
        }
    }

    pub fn view(&self) -> BookingView {
        BookingView {
            booking: self.clone(),
            status: self.status(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    AwaitingArrival,
    Arrived,
    NotArrived,
    Cancelled,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::AwaitingArrival => "awaiting_arrival",
            BookingStatus::Arrived => "arrived",
            BookingStatus::NotArrived => "not_arrived",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub status: BookingStatus,
}

/// A period during which a bed cannot be used (repairs, damage, and similar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutOfServicePeriod {
    pub id: OutOfServiceId,
    pub premises_id: PremisesId,
    pub bed_id: BedId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub notes: Option<String>,
    pub cancelled_on: Option<NaiveDate>,
}

impl OutOfServicePeriod {
    pub fn range(&self) -> DateRange {
        DateRange::spanning(self.start_date, self.end_date)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_on.is_some()
    }
}

/// Caller supplied fields for a new booking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub crn: String,
    pub bed_id: BedId,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
}

/// Optional links from a booking back into an application tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingLinks {
    pub application_id: Option<ApplicationId>,
    pub placement_request_id: Option<PlacementRequestId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalRequest {
    pub arrival_date: NaiveDate,
    pub expected_departure_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonArrivalRequest {
    pub date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRequest {
    pub date: NaiveDate,
    pub reason: WithdrawalReason,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOutOfServicePeriod {
    pub bed_id: BedId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}
