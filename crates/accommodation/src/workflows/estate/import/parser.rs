use std::collections::BTreeSet;
use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::super::domain::{Coordinates, PremisesStatus, ServiceName};
use super::ImportError;

/// One bed row of an estate export, with its premises and room columns repeated.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EstateRecord {
    pub(crate) line: u64,
    pub(crate) premises_id: String,
    pub(crate) premises_name: String,
    pub(crate) service: ServiceName,
    pub(crate) status: PremisesStatus,
    pub(crate) postcode: String,
    pub(crate) probation_delivery_unit: String,
    pub(crate) location: Option<Coordinates>,
    pub(crate) turnaround_days: u32,
    pub(crate) premises_characteristics: BTreeSet<String>,
    pub(crate) room_id: String,
    pub(crate) room_name: String,
    pub(crate) room_characteristics: BTreeSet<String>,
    pub(crate) bed_id: String,
    pub(crate) bed_name: String,
    pub(crate) bed_end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DistrictRecord {
    pub(crate) outcode: String,
    pub(crate) location: Coordinates,
}

pub(crate) fn parse_estate<R: Read>(reader: R) -> Result<Vec<EstateRecord>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, row) in csv_reader.deserialize::<EstateRow>().enumerate() {
        let row = row?;
        records.push(row.into_record(data_line(index))?);
    }

    Ok(records)
}

pub(crate) fn parse_districts<R: Read>(reader: R) -> Result<Vec<DistrictRecord>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, row) in csv_reader.deserialize::<DistrictRow>().enumerate() {
        let row = row?;
        let line = data_line(index);
        if row.outcode.is_empty() {
            return Err(ImportError::invalid(line, "outcode is empty"));
        }
        let latitude = Some(row.latitude.as_str());
        let longitude = Some(row.longitude.as_str());
        let location = parse_coordinates(line, latitude, longitude)?
            .ok_or_else(|| ImportError::invalid(line, "latitude and longitude are required"))?;
        records.push(DistrictRecord {
            outcode: row.outcode,
            location,
        });
    }

    Ok(records)
}

/// Header is line 1, so the first data row is line 2.
fn data_line(index: usize) -> u64 {
    index as u64 + 2
}

#[derive(Debug, Deserialize)]
struct EstateRow {
    premises_id: String,
    premises_name: String,
    service: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    postcode: String,
    #[serde(rename = "pdu")]
    probation_delivery_unit: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    latitude: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    longitude: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    turnaround_days: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    premises_characteristics: Option<String>,
    room_id: String,
    room_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    room_characteristics: Option<String>,
    bed_id: String,
    bed_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    bed_end_date: Option<String>,
}

impl EstateRow {
    fn into_record(self, line: u64) -> Result<EstateRecord, ImportError> {
        for (column, value) in [
            ("premises_id", &self.premises_id),
            ("room_id", &self.room_id),
            ("bed_id", &self.bed_id),
        ] {
            if value.is_empty() {
                return Err(ImportError::invalid(line, format!("{column} is empty")));
            }
        }

        let service = ServiceName::parse(&self.service).ok_or_else(|| {
            ImportError::invalid(line, format!("unknown service '{}'", self.service))
        })?;
        let status = PremisesStatus::parse(self.status.as_deref().unwrap_or_default())
            .ok_or_else(|| {
                ImportError::invalid(
                    line,
                    format!("unknown status '{}'", self.status.unwrap_or_default()),
                )
            })?;
        let location =
            parse_coordinates(line, self.latitude.as_deref(), self.longitude.as_deref())?;
        let turnaround_days = match self.turnaround_days.as_deref() {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ImportError::invalid(line, format!("turnaround_days '{raw}' is not a day count"))
            })?,
            None => 0,
        };
        let bed_end_date = match self.bed_end_date.as_deref() {
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| {
                ImportError::invalid(line, format!("bed_end_date '{raw}' ({err})"))
            })?),
            None => None,
        };

        Ok(EstateRecord {
            line,
            premises_id: self.premises_id,
            premises_name: self.premises_name,
            service,
            status,
            postcode: self.postcode,
            probation_delivery_unit: self.probation_delivery_unit,
            location,
            turnaround_days,
            premises_characteristics: split_characteristics(self.premises_characteristics),
            room_id: self.room_id,
            room_name: self.room_name,
            room_characteristics: split_characteristics(self.room_characteristics),
            bed_id: self.bed_id,
            bed_name: self.bed_name,
            bed_end_date,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DistrictRow {
    outcode: String,
    latitude: String,
    longitude: String,
}

fn split_characteristics(raw: Option<String>) -> BTreeSet<String> {
    raw.map(|value| {
        value
            .split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_coordinates(
    line: u64,
    latitude: Option<&str>,
    longitude: Option<&str>,
) -> Result<Option<Coordinates>, ImportError> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            let latitude = parse_degrees(line, "latitude", lat, 90.0)?;
            let longitude = parse_degrees(line, "longitude", lon, 180.0)?;
            Ok(Some(Coordinates {
                latitude,
                longitude,
            }))
        }
        _ => Err(ImportError::invalid(
            line,
            "latitude and longitude must be supplied together",
        )),
    }
}

fn parse_degrees(line: u64, column: &str, raw: &str, limit: f64) -> Result<f64, ImportError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && value.abs() <= limit)
        .ok_or_else(|| ImportError::invalid(line, format!("{column} '{raw}' is out of range")))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
