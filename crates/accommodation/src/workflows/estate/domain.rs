use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PremisesId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BedId(pub String);

impl fmt::Display for PremisesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for BedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The accommodation service a premises is run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceName {
    ApprovedPremises,
    TemporaryAccommodation,
}

impl ServiceName {
    pub const fn label(self) -> &'static str {
        match self {
            ServiceName::ApprovedPremises => "approved-premises",
            ServiceName::TemporaryAccommodation => "temporary-accommodation",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approved-premises" | "approved_premises" | "ap" | "cas1" => {
                Some(Self::ApprovedPremises)
            }
            "temporary-accommodation" | "temporary_accommodation" | "ta" | "cas3" => {
                Some(Self::TemporaryAccommodation)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremisesStatus {
    Active,
    Archived,
}

impl PremisesStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PremisesStatus::Active => "active",
            PremisesStatus::Archived => "archived",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Premises {
    pub id: PremisesId,
    pub name: String,
    pub service: ServiceName,
    pub status: PremisesStatus,
    pub postcode: String,
    pub probation_delivery_unit: String,
    pub location: Option<Coordinates>,
    pub characteristics: BTreeSet<String>,
    /// Days a temporary accommodation bed stays blocked after a departure.
    pub turnaround_days: u32,
}

impl Premises {
    pub fn is_active(&self) -> bool {
        self.status == PremisesStatus::Active
    }

    pub fn has_characteristics(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.characteristics)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub premises_id: PremisesId,
    pub name: String,
    pub characteristics: BTreeSet<String>,
}

impl Room {
    pub fn has_characteristics(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.characteristics)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bed {
    pub id: BedId,
    pub room_id: RoomId,
    pub name: String,
    pub end_date: Option<NaiveDate>,
}

impl Bed {
    /// A bed whose end date falls on or before `date` is decommissioned for that date.
    pub fn in_service_on(&self, date: NaiveDate) -> bool {
        self.end_date.map_or(true, |end| end > date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomInventory {
    pub room: Room,
    pub beds: Vec<Bed>,
}

/// A premises together with its rooms and beds.
#[derive(Debug, Clone, PartialEq)]
pub struct PremisesInventory {
    pub premises: Premises,
    pub rooms: Vec<RoomInventory>,
}

impl PremisesInventory {
    pub fn bed_count(&self) -> usize {
        self.rooms.iter().map(|room| room.beds.len()).sum()
    }

    pub fn locate_bed(&self, bed_id: &BedId) -> Option<(&Room, &Bed)> {
        self.rooms.iter().find_map(|inventory| {
            inventory
                .beds
                .iter()
                .find(|bed| &bed.id == bed_id)
                .map(|bed| (&inventory.room, bed))
        })
    }
}

/// Centroid of a postcode district such as `SW1A` used as a search origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostcodeDistrict {
    pub outcode: String,
    pub location: Coordinates,
}

pub fn normalize_outcode(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Listing view of a premises.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremisesSummary {
    pub id: PremisesId,
    pub name: String,
    pub service: ServiceName,
    pub status: PremisesStatus,
    pub postcode: String,
    pub probation_delivery_unit: String,
    pub characteristics: Vec<String>,
    pub bed_count: usize,
}

impl From<&PremisesInventory> for PremisesSummary {
    fn from(inventory: &PremisesInventory) -> Self {
        let premises = &inventory.premises;
        Self {
            id: premises.id.clone(),
            name: premises.name.clone(),
            service: premises.service,
            status: premises.status,
            postcode: premises.postcode.clone(),
            probation_delivery_unit: premises.probation_delivery_unit.clone(),
            characteristics: premises.characteristics.iter().cloned().collect(),
            bed_count: inventory.bed_count(),
        }
    }
}
