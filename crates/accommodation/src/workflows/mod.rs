pub mod applications;
pub mod bed_search;
pub mod bookings;
pub mod estate;
pub mod memory;
pub mod repository;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::Router;

use crate::config::SearchConfig;
use repository::{ApplicationRepository, BookingRepository, EstateRepository};

/// Every workflow router mounted over one shared repository.
pub fn api_router<R>(repository: Arc<R>, config: SearchConfig) -> Router
where
    R: EstateRepository + BookingRepository + ApplicationRepository + 'static,
{
    let estate = estate::EstateService::new(Arc::clone(&repository), config);
    let bookings = bookings::BookingService::new(Arc::clone(&repository), config);
    let search = bed_search::BedSearchService::new(Arc::clone(&repository), config);
    let applications = applications::ApplicationService::new(repository, config);

    Router::new()
        .merge(estate::premises_router(Arc::new(estate)))
        .merge(bookings::booking_router(Arc::new(bookings)))
        .merge(bed_search::bed_search_router(Arc::new(search)))
        .merge(applications::application_router(Arc::new(applications)))
}
