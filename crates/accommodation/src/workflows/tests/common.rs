use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::SearchConfig;
use crate::workflows::api_router;
use crate::workflows::applications::domain::{
    Application, ApplicationId, ApplicationTree, EntityRef,
};
use crate::workflows::applications::{ApplicationService, PlacementBooking, PlacementDates};
use crate::workflows::bed_search::{
    ApprovedPremisesSearch, BedSearchService, RequiredCharacteristics,
    TemporaryAccommodationSearch,
};
use crate::workflows::bookings::{
    Booking, BookingId, BookingService, OutOfServiceId, OutOfServicePeriod,
};
use crate::workflows::estate::{
    BedId, DateRange, EstateImporter, PostcodeDistrict, PostcodeDistrictImporter, PremisesId,
    PremisesInventory, ServiceName,
};
use crate::workflows::memory::InMemoryStore;
use crate::workflows::repository::{
    ApplicationRepository, BookingRepository, EstateRepository, RepositoryError,
};

const ESTATE_CSV: &str = include_str!("../../../tests/fixtures/estate.csv");
const DISTRICTS_CSV: &str = include_str!("../../../tests/fixtures/postcode_districts.csv");

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// First night of every search in these suites.
pub(super) fn search_start() -> NaiveDate {
    date(2024, 6, 10)
}

pub(super) fn config() -> SearchConfig {
    SearchConfig::default()
}

/// Store seeded with the fixture estate and postcode districts.
pub(super) fn seeded_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    let estate = EstateImporter::from_reader(ESTATE_CSV.as_bytes()).expect("fixture estate");
    EstateImporter::load_into(&store, estate).expect("load estate");
    let districts =
        PostcodeDistrictImporter::from_reader(DISTRICTS_CSV.as_bytes()).expect("fixture districts");
    PostcodeDistrictImporter::load_into(&store, districts).expect("load districts");
    Arc::new(store)
}

pub(super) fn search_service(store: &Arc<InMemoryStore>) -> BedSearchService<InMemoryStore> {
    BedSearchService::new(Arc::clone(store), config())
}

pub(super) fn booking_service(store: &Arc<InMemoryStore>) -> BookingService<InMemoryStore> {
    BookingService::new(Arc::clone(store), config())
}

pub(super) fn application_service(
    store: &Arc<InMemoryStore>,
) -> ApplicationService<InMemoryStore> {
    ApplicationService::new(Arc::clone(store), config())
}

pub(super) fn ap_search(district: &str, duration_days: i64) -> ApprovedPremisesSearch {
    ApprovedPremisesSearch {
        postcode_district: district.to_string(),
        max_distance_miles: None,
        start_date: search_start(),
        duration_days,
        required_characteristics: RequiredCharacteristics::default(),
    }
}

pub(super) fn ta_search(units: &[&str], duration_days: i64) -> TemporaryAccommodationSearch {
    TemporaryAccommodationSearch {
        probation_delivery_units: units.iter().map(|unit| unit.to_string()).collect(),
        start_date: search_start(),
        duration_days,
        required_characteristics: RequiredCharacteristics::default(),
    }
}

pub(super) fn characteristics(items: &[&str]) -> std::collections::BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// A booking written straight to the store, bypassing service validation.
pub(super) fn stored_booking(
    store: &InMemoryStore,
    premises: &str,
    bed: &str,
    arrival: NaiveDate,
    departure: NaiveDate,
) -> Booking {
    let booking = Booking {
        id: BookingId(format!("fixture-{bed}-{arrival}")),
        crn: "X320741".to_string(),
        premises_id: PremisesId(premises.to_string()),
        bed_id: BedId(bed.to_string()),
        arrival_date: arrival,
        departure_date: departure,
        application_id: None,
        placement_request_id: None,
        created_on: date(2024, 5, 1),
        arrival: None,
        non_arrival: None,
        cancellation: None,
    };
    store.insert_booking(booking).expect("fixture booking")
}

pub(super) fn stored_out_of_service(
    store: &InMemoryStore,
    premises: &str,
    bed: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> OutOfServicePeriod {
    let period = OutOfServicePeriod {
        id: OutOfServiceId(format!("fixture-oos-{bed}-{start}")),
        premises_id: PremisesId(premises.to_string()),
        bed_id: BedId(bed.to_string()),
        start_date: start,
        end_date: end,
        reason: "Fire damage".to_string(),
        notes: None,
        cancelled_on: None,
    };
    store.insert_out_of_service(period).expect("fixture out-of-service")
}

/// Application submitted, assessed, and accepted, with its initial placement request booked
/// on `ap-leeds-b1`.
pub(super) struct PlacedApplication {
    pub(super) application_id: ApplicationId,
    pub(super) booking: Booking,
}

pub(super) fn placed_application(service: &ApplicationService<InMemoryStore>) -> PlacedApplication {
    let application = service
        .create_application(
            crate::workflows::applications::NewApplication {
                crn: "X320741".to_string(),
            },
            date(2024, 5, 1),
        )
        .expect("create");
    let submitted = service.submit(&application.id, date(2024, 5, 2)).expect("submit");
    let assessment = submitted.assessments[0].id.clone();
    let accepted = service
        .accept_assessment(
            &assessment,
            PlacementDates {
                expected_arrival: search_start(),
                duration_days: 28,
            },
            date(2024, 5, 3),
        )
        .expect("accept");
    let request = accepted.placement_requests[0].id.clone();
    let booking = service
        .book_placement_request(
            &request,
            PlacementBooking {
                premises_id: PremisesId("ap-leeds".to_string()),
                bed_id: BedId("ap-leeds-b1".to_string()),
                arrival_date: search_start(),
                departure_date: date(2024, 7, 8),
            },
            date(2024, 5, 4),
        )
        .expect("book");

    PlacedApplication {
        application_id: application.id,
        booking,
    }
}

pub(super) fn router(store: Arc<InMemoryStore>) -> axum::Router {
    api_router(store, config())
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("json body")))
        .expect("request")
}

pub(super) fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl EstateRepository for UnavailableStore {
    fn inventory(&self, _service: ServiceName) -> Result<Vec<PremisesInventory>, RepositoryError> {
        offline()
    }

    fn premises(&self, _id: &PremisesId) -> Result<Option<PremisesInventory>, RepositoryError> {
        offline()
    }

    fn postcode_district(
        &self,
        _outcode: &str,
    ) -> Result<Option<PostcodeDistrict>, RepositoryError> {
        offline()
    }

    fn upsert_premises(&self, _inventory: PremisesInventory) -> Result<(), RepositoryError> {
        offline()
    }

    fn upsert_postcode_district(&self, _district: PostcodeDistrict) -> Result<(), RepositoryError> {
        offline()
    }
}

impl BookingRepository for UnavailableStore {
    fn insert_booking(&self, _booking: Booking) -> Result<Booking, RepositoryError> {
        offline()
    }

    fn update_booking(&self, _current: &Booking, _updated: Booking) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_booking(&self, _id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        offline()
    }

    fn bookings_for_premises(&self, _premises: &PremisesId) -> Result<Vec<Booking>, RepositoryError> {
        offline()
    }

    fn bookings_overlapping(&self, _range: DateRange) -> Result<Vec<Booking>, RepositoryError> {
        offline()
    }

    fn insert_out_of_service(
        &self,
        _period: OutOfServicePeriod,
    ) -> Result<OutOfServicePeriod, RepositoryError> {
        offline()
    }

    fn update_out_of_service(&self, _period: OutOfServicePeriod) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_out_of_service(
        &self,
        _id: &OutOfServiceId,
    ) -> Result<Option<OutOfServicePeriod>, RepositoryError> {
        offline()
    }

    fn out_of_service_overlapping(
        &self,
        _range: DateRange,
    ) -> Result<Vec<OutOfServicePeriod>, RepositoryError> {
        offline()
    }
}

impl ApplicationRepository for UnavailableStore {
    fn insert_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        offline()
    }

    fn mark_submitted(
        &self,
        _id: &ApplicationId,
        _submitted_on: NaiveDate,
    ) -> Result<Application, RepositoryError> {
        offline()
    }

    fn application_tree(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<ApplicationTree>, RepositoryError> {
        offline()
    }

    fn save_tree(
        &self,
        _snapshot: &ApplicationTree,
        _updated: ApplicationTree,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn owning_application(
        &self,
        _entity: &EntityRef,
    ) -> Result<Option<ApplicationId>, RepositoryError> {
        offline()
    }
}

/// Reads from the wrapped store but fails every tree write.
pub(super) struct FailingTreeWrites(pub(super) Arc<InMemoryStore>);

impl EstateRepository for FailingTreeWrites {
    fn inventory(&self, service: ServiceName) -> Result<Vec<PremisesInventory>, RepositoryError> {
        self.0.inventory(service)
    }

    fn premises(&self, id: &PremisesId) -> Result<Option<PremisesInventory>, RepositoryError> {
        self.0.premises(id)
    }

    fn postcode_district(
        &self,
        outcode: &str,
    ) -> Result<Option<PostcodeDistrict>, RepositoryError> {
        self.0.postcode_district(outcode)
    }

    fn upsert_premises(&self, inventory: PremisesInventory) -> Result<(), RepositoryError> {
        self.0.upsert_premises(inventory)
    }

    fn upsert_postcode_district(&self, district: PostcodeDistrict) -> Result<(), RepositoryError> {
        self.0.upsert_postcode_district(district)
    }
}

impl BookingRepository for FailingTreeWrites {
    fn insert_booking(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        self.0.insert_booking(booking)
    }

    fn update_booking(&self, current: &Booking, updated: Booking) -> Result<(), RepositoryError> {
        self.0.update_booking(current, updated)
    }

    fn fetch_booking(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        self.0.fetch_booking(id)
    }

    fn bookings_for_premises(&self, premises: &PremisesId) -> Result<Vec<Booking>, RepositoryError> {
        self.0.bookings_for_premises(premises)
    }

    fn bookings_overlapping(&self, range: DateRange) -> Result<Vec<Booking>, RepositoryError> {
        self.0.bookings_overlapping(range)
    }

    fn insert_out_of_service(
        &self,
        period: OutOfServicePeriod,
    ) -> Result<OutOfServicePeriod, RepositoryError> {
        self.0.insert_out_of_service(period)
    }

    fn update_out_of_service(&self, period: OutOfServicePeriod) -> Result<(), RepositoryError> {
        self.0.update_out_of_service(period)
    }

    fn fetch_out_of_service(
        &self,
        id: &OutOfServiceId,
    ) -> Result<Option<OutOfServicePeriod>, RepositoryError> {
        self.0.fetch_out_of_service(id)
    }

    fn out_of_service_overlapping(
        &self,
        range: DateRange,
    ) -> Result<Vec<OutOfServicePeriod>, RepositoryError> {
        self.0.out_of_service_overlapping(range)
    }
}

impl ApplicationRepository for FailingTreeWrites {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        self.0.insert_application(application)
    }

    fn mark_submitted(
        &self,
        id: &ApplicationId,
        submitted_on: NaiveDate,
    ) -> Result<Application, RepositoryError> {
        self.0.mark_submitted(id, submitted_on)
    }

    fn application_tree(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationTree>, RepositoryError> {
        self.0.application_tree(id)
    }

    fn save_tree(
        &self,
        _snapshot: &ApplicationTree,
        _updated: ApplicationTree,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("write rejected".to_string()))
    }

    fn owning_application(
        &self,
        entity: &EntityRef,
    ) -> Result<Option<ApplicationId>, RepositoryError> {
        self.0.owning_application(entity)
    }
}

/// Serves one booking as it looked before another writer changed it.
pub(super) struct StaleBookingReads {
    pub(super) store: Arc<InMemoryStore>,
    pub(super) stale: Booking,
}

impl EstateRepository for StaleBookingReads {
    fn inventory(&self, service: ServiceName) -> Result<Vec<PremisesInventory>, RepositoryError> {
        self.store.inventory(service)
    }

    fn premises(&self, id: &PremisesId) -> Result<Option<PremisesInventory>, RepositoryError> {
        self.store.premises(id)
    }

    fn postcode_district(
        &self,
        outcode: &str,
    ) -> Result<Option<PostcodeDistrict>, RepositoryError> {
        self.store.postcode_district(outcode)
    }

    fn upsert_premises(&self, inventory: PremisesInventory) -> Result<(), RepositoryError> {
        self.store.upsert_premises(inventory)
    }

    fn upsert_postcode_district(&self, district: PostcodeDistrict) -> Result<(), RepositoryError> {
        self.store.upsert_postcode_district(district)
    }
}

impl BookingRepository for StaleBookingReads {
    fn insert_booking(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        self.store.insert_booking(booking)
    }

    fn update_booking(&self, current: &Booking, updated: Booking) -> Result<(), RepositoryError> {
        self.store.update_booking(current, updated)
    }

    fn fetch_booking(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        if *id == self.stale.id {
            return Ok(Some(self.stale.clone()));
        }
        self.store.fetch_booking(id)
    }

    fn bookings_for_premises(&self, premises: &PremisesId) -> Result<Vec<Booking>, RepositoryError> {
        self.store.bookings_for_premises(premises)
    }

    fn bookings_overlapping(&self, range: DateRange) -> Result<Vec<Booking>, RepositoryError> {
        self.store.bookings_overlapping(range)
    }

    fn insert_out_of_service(
        &self,
        period: OutOfServicePeriod,
    ) -> Result<OutOfServicePeriod, RepositoryError> {
        self.store.insert_out_of_service(period)
    }

    fn update_out_of_service(&self, period: OutOfServicePeriod) -> Result<(), RepositoryError> {
        self.store.update_out_of_service(period)
    }

    fn fetch_out_of_service(
        &self,
        id: &OutOfServiceId,
    ) -> Result<Option<OutOfServicePeriod>, RepositoryError> {
        self.store.fetch_out_of_service(id)
    }

    fn out_of_service_overlapping(
        &self,
        range: DateRange,
    ) -> Result<Vec<OutOfServicePeriod>, RepositoryError> {
        self.store.out_of_service_overlapping(range)
    }
}
