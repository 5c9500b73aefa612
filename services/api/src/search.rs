use crate::infra::{build_store, parse_date};
use accommodation::config::{AppConfig, EstateSourceConfig, SearchConfig};
use accommodation::error::AppError;
use accommodation::workflows::bed_search::{
    ApprovedPremisesSearch, BedSearchResults, BedSearchService, RequiredCharacteristics,
    TemporaryAccommodationSearch,
};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Estate CSV to search (falls back to APP_ESTATE_CSV)
    #[arg(long, global = true)]
    pub(crate) estate_csv: Option<PathBuf>,
    /// Postcode district centroids CSV (falls back to APP_POSTCODE_DISTRICTS_CSV)
    #[arg(long, global = true)]
    pub(crate) postcode_csv: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) service: SearchService,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SearchService {
    /// Beds in approved premises ordered by distance from a postcode district
    ApprovedPremises(ApprovedPremisesArgs),
    /// Beds in temporary accommodation grouped by premises
    TemporaryAccommodation(TemporaryAccommodationArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ApprovedPremisesArgs {
    /// Postcode district (outcode), e.g. LS1
    #[arg(long)]
    pub(crate) postcode_district: String,
    /// Search radius in miles (defaults to the configured radius)
    #[arg(long)]
    pub(crate) max_distance_miles: Option<f64>,
    /// First night of the stay (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start_date: NaiveDate,
    /// Number of nights
    #[arg(long)]
    pub(crate) duration_days: i64,
    /// Required premises characteristic (repeatable)
    #[arg(long = "premises-characteristic")]
    pub(crate) premises_characteristics: Vec<String>,
    /// Required room characteristic (repeatable)
    #[arg(long = "room-characteristic")]
    pub(crate) room_characteristics: Vec<String>,
}

#[derive(Args, Debug)]
pub(crate) struct TemporaryAccommodationArgs {
    /// Probation delivery unit to search (repeatable)
    #[arg(long = "pdu", required = true)]
    pub(crate) probation_delivery_units: Vec<String>,
    /// First night of the stay (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start_date: NaiveDate,
    /// Number of nights
    #[arg(long)]
    pub(crate) duration_days: i64,
    /// Required premises characteristic (repeatable)
    #[arg(long = "premises-characteristic")]
    pub(crate) premises_characteristics: Vec<String>,
    /// Required room characteristic (repeatable)
    #[arg(long = "room-characteristic")]
    pub(crate) room_characteristics: Vec<String>,
}

fn characteristics(premises: Vec<String>, room: Vec<String>) -> RequiredCharacteristics {
    RequiredCharacteristics {
        premises: premises.into_iter().collect::<BTreeSet<_>>(),
        room: room.into_iter().collect::<BTreeSet<_>>(),
    }
}

pub(crate) fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let sources = EstateSourceConfig {
        estate_csv: args.estate_csv.or(config.estate.estate_csv),
        postcode_districts_csv: args.postcode_csv.or(config.estate.postcode_districts_csv),
    };
    let results = search(&sources, config.search, args.service)?;
    render_results(&results);
    Ok(())
}

pub(crate) fn search(
    sources: &EstateSourceConfig,
    config: SearchConfig,
    service: SearchService,
) -> Result<BedSearchResults, AppError> {
    let store = build_store(sources)?;
    let searcher = BedSearchService::new(store, config);

    let results = match service {
        SearchService::ApprovedPremises(args) => {
            searcher.search_approved_premises(ApprovedPremisesSearch {
                postcode_district: args.postcode_district,
                max_distance_miles: args.max_distance_miles,
                start_date: args.start_date,
                duration_days: args.duration_days,
                required_characteristics: characteristics(
                    args.premises_characteristics,
                    args.room_characteristics,
                ),
            })?
        }
        SearchService::TemporaryAccommodation(args) => {
            searcher.search_temporary_accommodation(TemporaryAccommodationSearch {
                probation_delivery_units: args.probation_delivery_units,
                start_date: args.start_date,
                duration_days: args.duration_days,
                required_characteristics: characteristics(
                    args.premises_characteristics,
                    args.room_characteristics,
                ),
            })?
        }
    };
    Ok(results)
}

pub(crate) fn render_results(results: &BedSearchResults) {
    let counts = results.counts();
    println!(
        "{} premises | {} rooms | {} beds",
        counts.results_premises_count, counts.results_room_count, counts.results_bed_count
    );

    match results {
        BedSearchResults::ApprovedPremises { results, .. } => {
            if results.is_empty() {
                println!("\nNo beds available");
            }
            for result in results {
                println!(
                    "- {:>6.1} mi  {} / {} / {}",
                    result.distance_miles, result.premises.name, result.room.name, result.bed.name
                );
            }
        }
        BedSearchResults::TemporaryAccommodation { results, .. } => {
            if results.is_empty() {
                println!("\nNo beds available");
            }
            for group in results {
                println!(
                    "\n{} ({}, {})",
                    group.premises.name,
                    group.premises.postcode,
                    group.premises.probation_delivery_unit
                );
                for bed in &group.beds {
                    println!("- {} / {}", bed.room.name, bed.bed.name);
                }
                for overlap in &group.overlaps {
                    println!(
                        "  overlaps booking {} ({}) {} -> {}: {} nights",
                        overlap.booking_id,
                        overlap.crn,
                        overlap.arrival_date,
                        overlap.departure_date,
                        overlap.days
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accommodation::workflows::bed_search::BedSearchError;

    fn fixtures() -> EstateSourceConfig {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../crates/accommodation/tests/fixtures");
        EstateSourceConfig {
            estate_csv: Some(root.join("estate.csv")),
            postcode_districts_csv: Some(root.join("postcode_districts.csv")),
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date")
    }

    #[test]
    fn approved_premises_search_runs_against_csvs() {
        let results = search(
            &fixtures(),
            SearchConfig::default(),
            SearchService::ApprovedPremises(ApprovedPremisesArgs {
                postcode_district: "LS1".to_string(),
                max_distance_miles: Some(10.0),
                start_date: start(),
                duration_days: 7,
                premises_characteristics: Vec::new(),
                room_characteristics: Vec::new(),
            }),
        )
        .expect("search");
        assert_eq!(results.counts().results_bed_count, 3);
        render_results(&results);
    }

    #[test]
    fn temporary_accommodation_search_groups_premises() {
        let results = search(
            &fixtures(),
            SearchConfig::default(),
            SearchService::TemporaryAccommodation(TemporaryAccommodationArgs {
                probation_delivery_units: vec!["Bradford".to_string()],
                start_date: start(),
                duration_days: 7,
                premises_characteristics: Vec::new(),
                room_characteristics: Vec::new(),
            }),
        )
        .expect("search");
        assert_eq!(results.counts().results_premises_count, 1);
    }

    #[test]
    fn invalid_search_is_reported() {
        let result = search(
            &fixtures(),
            SearchConfig::default(),
            SearchService::TemporaryAccommodation(TemporaryAccommodationArgs {
                probation_delivery_units: vec!["Leeds".to_string()],
                start_date: start(),
                duration_days: 0,
                premises_characteristics: Vec::new(),
                room_characteristics: Vec::new(),
            }),
        );
        assert!(matches!(
            result,
            Err(AppError::Search(BedSearchError::Validation(_)))
        ));
    }
}
