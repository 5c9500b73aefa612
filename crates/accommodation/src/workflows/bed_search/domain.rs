use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::workflows::bookings::BookingId;
use crate::workflows::estate::{BedId, PremisesId, RoomId};

/// Search body, tagged by the service whose estate is searched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "serviceName", rename_all = "kebab-case")]
pub enum BedSearchRequest {
    ApprovedPremises(ApprovedPremisesSearch),
    TemporaryAccommodation(TemporaryAccommodationSearch),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredCharacteristics {
    #[serde(default)]
    pub premises: BTreeSet<String>,
    #[serde(default)]
    pub room: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedPremisesSearch {
    pub postcode_district: String,
    /// Falls back to the configured search radius.
    #[serde(default)]
    pub max_distance_miles: Option<f64>,
    pub start_date: NaiveDate,
    pub duration_days: i64,
    #[serde(default)]
    pub required_characteristics: RequiredCharacteristics,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryAccommodationSearch {
    pub probation_delivery_units: Vec<String>,
    pub start_date: NaiveDate,
    pub duration_days: i64,
    #[serde(default)]
    pub required_characteristics: RequiredCharacteristics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremisesMatch {
    pub id: PremisesId,
    pub name: String,
    pub postcode: String,
    pub probation_delivery_unit: String,
    pub characteristics: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMatch {
    pub id: RoomId,
    pub name: String,
    pub characteristics: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BedMatch {
    pub id: BedId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedPremisesBed {
    pub distance_miles: f64,
    pub premises: PremisesMatch,
    pub room: RoomMatch,
    pub bed: BedMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryAccommodationBed {
    pub room: RoomMatch,
    pub bed: BedMatch,
}

/// A booking at the same premises that falls inside the searched dates. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOverlap {
    pub booking_id: BookingId,
    pub crn: String,
    pub room_id: RoomId,
    pub bed_id: BedId,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryAccommodationPremises {
    pub premises: PremisesMatch,
    pub beds: Vec<TemporaryAccommodationBed>,
    pub overlaps: Vec<BookingOverlap>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCounts {
    pub results_premises_count: usize,
    pub results_room_count: usize,
    pub results_bed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "serviceName", rename_all = "kebab-case")]
pub enum BedSearchResults {
    ApprovedPremises {
        #[serde(flatten)]
        counts: ResultCounts,
        results: Vec<ApprovedPremisesBed>,
    },
    TemporaryAccommodation {
        #[serde(flatten)]
        counts: ResultCounts,
        results: Vec<TemporaryAccommodationPremises>,
    },
}

impl BedSearchResults {
    pub fn counts(&self) -> &ResultCounts {
        match self {
            BedSearchResults::ApprovedPremises { counts, .. }
            | BedSearchResults::TemporaryAccommodation { counts, .. } => counts,
        }
    }
}
