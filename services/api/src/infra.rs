use accommodation::config::EstateSourceConfig;
use accommodation::error::AppError;
use accommodation::workflows::estate::{EstateImporter, PostcodeDistrictImporter};
use accommodation::workflows::memory::InMemoryStore;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory store seeded from whichever CSV sources are configured.
pub(crate) fn build_store(sources: &EstateSourceConfig) -> Result<Arc<InMemoryStore>, AppError> {
    let store = InMemoryStore::new();

    match &sources.estate_csv {
        Some(path) => {
            let estate = EstateImporter::from_path(path)?;
            let premises = EstateImporter::load_into(&store, estate)?;
            info!(path = %path.display(), premises, "estate loaded");
        }
        None => warn!("no estate CSV configured; starting with an empty estate"),
    }

    match &sources.postcode_districts_csv {
        Some(path) => {
            let districts = PostcodeDistrictImporter::from_path(path)?;
            let loaded = PostcodeDistrictImporter::load_into(&store, districts)?;
            info!(path = %path.display(), districts = loaded, "postcode districts loaded");
        }
        None => warn!("no postcode district CSV configured; approved premises searches will fail"),
    }

    Ok(Arc::new(store))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
