//! Page slicing for list endpoints, reported through `X-Pagination-*` headers.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

pub const CURRENT_PAGE_HEADER: &str = "x-pagination-currentpage";
pub const TOTAL_PAGES_HEADER: &str = "x-pagination-totalpages";
pub const TOTAL_RESULTS_HEADER: &str = "x-pagination-totalresults";
pub const PAGE_SIZE_HEADER: &str = "x-pagination-pagesize";

/// Query parameters accepted by paginated endpoints. Without `page` every result is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCriteria {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageCriteria {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_results: usize,
    pub page_size: u32,
}

impl PaginationMetadata {
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let values = [
            (CURRENT_PAGE_HEADER, self.current_page.to_string()),
            (TOTAL_PAGES_HEADER, self.total_pages.to_string()),
            (TOTAL_RESULTS_HEADER, self.total_results.to_string()),
            (PAGE_SIZE_HEADER, self.page_size.to_string()),
        ];
        for (name, value) in values {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
        headers
    }
}

/// One page of results plus the metadata describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub metadata: Option<PaginationMetadata>,
}

pub fn paginate<T>(items: Vec<T>, criteria: PageCriteria, default_page_size: u32) -> Page<T> {
    let Some(requested_page) = criteria.page else {
        return Page {
            items,
            metadata: None,
        };
    };

    let current_page = requested_page.max(1);
    let page_size = criteria.per_page.unwrap_or(default_page_size).max(1);
    let total_results = items.len();
    let total_pages = total_results.div_ceil(page_size as usize) as u32;

    let skip = (current_page as usize - 1).saturating_mul(page_size as usize);
    let items = items
        .into_iter()
        .skip(skip)
        .take(page_size as usize)
        .collect();

    Page {
        items,
        metadata: Some(PaginationMetadata {
            current_page,
            total_pages,
            total_results,
            page_size,
        }),
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let headers = self
            .metadata
            .map(|metadata| metadata.headers())
            .unwrap_or_default();
        (headers, Json(self.items)).into_response()
    }
}
