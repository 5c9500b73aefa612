mod parser;

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::workflows::repository::{EstateRepository, RepositoryError};

use super::domain::{
    normalize_outcode, Bed, BedId, PostcodeDistrict, Premises, PremisesId, PremisesInventory, Room,
    RoomId, RoomInventory,
};
use parser::EstateRecord;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, message: String },
}

impl ImportError {
    pub(crate) fn invalid(line: u64, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read estate export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid estate CSV data: {}", err),
            ImportError::InvalidRow { line, message } => {
                write!(f, "invalid estate row on line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Builds premises inventories from a one-row-per-bed CSV export.
pub struct EstateImporter;

impl EstateImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<PremisesInventory>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<PremisesInventory>, ImportError> {
        let mut estate: Vec<PremisesInventory> = Vec::new();
        let mut premises_index: HashMap<String, usize> = HashMap::new();
        let mut room_owner: HashMap<String, String> = HashMap::new();
        let mut seen_beds: HashSet<String> = HashSet::new();

        for record in parser::parse_estate(reader)? {
            if !seen_beds.insert(record.bed_id.clone()) {
                return Err(ImportError::invalid(
                    record.line,
                    format!("bed_id '{}' appears more than once", record.bed_id),
                ));
            }

            match room_owner.get(&record.room_id) {
                Some(owner) if owner != &record.premises_id => {
                    return Err(ImportError::invalid(
                        record.line,
                        format!(
                            "room_id '{}' already belongs to premises '{}'",
                            record.room_id, owner
                        ),
                    ));
                }
                Some(_) => {}
                None => {
                    room_owner.insert(record.room_id.clone(), record.premises_id.clone());
                }
            }

            let index = *premises_index
                .entry(record.premises_id.clone())
                .or_insert_with(|| {
                    estate.push(new_inventory(&record));
                    estate.len() - 1
                });
            append_bed(&mut estate[index], record);
        }

        info!(
            premises = estate.len(),
            beds = seen_beds.len(),
            "estate export parsed"
        );
        Ok(estate)
    }

    /// Writes every inventory into the repository.
    pub fn load_into<R: EstateRepository>(
        repository: &R,
        estate: Vec<PremisesInventory>,
    ) -> Result<usize, RepositoryError> {
        let count = estate.len();
        for inventory in estate {
            repository.upsert_premises(inventory)?;
        }
        Ok(count)
    }
}

/// Loads postcode district centroids from an `outcode,latitude,longitude` CSV.
pub struct PostcodeDistrictImporter;

impl PostcodeDistrictImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<PostcodeDistrict>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<PostcodeDistrict>, ImportError> {
        let districts = parser::parse_districts(reader)?
            .into_iter()
            .map(|record| PostcodeDistrict {
                outcode: normalize_outcode(&record.outcode),
                location: record.location,
            })
            .collect::<Vec<_>>();
        info!(districts = districts.len(), "postcode districts parsed");
        Ok(districts)
    }

    pub fn load_into<R: EstateRepository>(
        repository: &R,
        districts: Vec<PostcodeDistrict>,
    ) -> Result<usize, RepositoryError> {
        let count = districts.len();
        for district in districts {
            repository.upsert_postcode_district(district)?;
        }
        Ok(count)
    }
}

fn new_inventory(record: &EstateRecord) -> PremisesInventory {
    PremisesInventory {
        premises: Premises {
            id: PremisesId(record.premises_id.clone()),
            name: record.premises_name.clone(),
            service: record.service,
            status: record.status,
            postcode: record.postcode.clone(),
            probation_delivery_unit: record.probation_delivery_unit.clone(),
            location: record.location,
            characteristics: record.premises_characteristics.clone(),
            turnaround_days: record.turnaround_days,
        },
        rooms: Vec::new(),
    }
}

fn append_bed(inventory: &mut PremisesInventory, record: EstateRecord) {
    let room_id = RoomId(record.room_id);
    let bed = Bed {
        id: BedId(record.bed_id),
        room_id: room_id.clone(),
        name: record.bed_name,
        end_date: record.bed_end_date,
    };

    if let Some(room) = inventory
        .rooms
        .iter_mut()
        .find(|room| room.room.id == room_id)
    {
        room.beds.push(bed);
        return;
    }

    inventory.rooms.push(RoomInventory {
        room: Room {
            id: room_id,
            premises_id: inventory.premises.id.clone(),
            name: record.room_name,
            characteristics: record.room_characteristics,
        },
        beds: vec![bed],
    });
}
