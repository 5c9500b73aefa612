use std::sync::Arc;

use axum::http::{header, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;

use crate::workflows::api_router;
use crate::workflows::bookings::ArrivalRequest;
use crate::workflows::estate::PremisesId;

#[tokio::test]
async fn bed_search_returns_nearest_beds_first() {
    let app = router(seeded_store());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/beds/search",
            json!({
                "serviceName": "approved-premises",
                "postcodeDistrict": "LS1",
                "maxDistanceMiles": 10,
                "startDate": "2024-06-10",
                "durationDays": 7
            }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["serviceName"], json!("approved-premises"));
    assert_eq!(body["resultsBedCount"], json!(3));
    assert_eq!(body["results"][0]["bed"]["id"], json!("ap-leeds-b1"));
    assert_eq!(body["results"][2]["premises"]["id"], json!("ap-bradford"));
}

#[tokio::test]
async fn invalid_search_returns_problem_with_invalid_params() {
    let app = router(seeded_store());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/beds/search",
            json!({
                "serviceName": "temporary-accommodation",
                "probationDeliveryUnits": [],
                "startDate": "2024-06-10",
                "durationDays": 0
            }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).expect("content type"),
        "application/problem+json"
    );
    let body = read_json_body(response).await;
    let params = body["invalid-params"].as_array().expect("invalid params");
    assert!(params.contains(&json!({
        "propertyName": "$.probationDeliveryUnits",
        "errorType": "empty"
    })));
    assert!(params.contains(&json!({
        "propertyName": "$.durationDays",
        "errorType": "mustBePositive"
    })));
}

#[tokio::test]
async fn unknown_postcode_district_is_not_found() {
    let app = router(seeded_store());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/beds/search",
            json!({
                "serviceName": "approved-premises",
                "postcodeDistrict": "ZZ99",
                "startDate": "2024-06-10",
                "durationDays": 7
            }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn premises_listing_is_paginated() {
    let app = router(seeded_store());
    let response = app
        .oneshot(get_request(
            "/api/v1/premises?service=approved-premises&page=1&perPage=2",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("X-Pagination-CurrentPage").expect("page"), "1");
    assert_eq!(headers.get("X-Pagination-TotalPages").expect("pages"), "3");
    assert_eq!(headers.get("X-Pagination-TotalResults").expect("results"), "6");
    assert_eq!(headers.get("X-Pagination-PageSize").expect("size"), "2");

    let body = read_json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn unknown_premises_is_not_found() {
    let app = router(seeded_store());
    let response = app
        .oneshot(get_request("/api/v1/premises/nowhere"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], json!(404));
}

#[tokio::test]
async fn double_booking_a_bed_conflicts() {
    let app = router(seeded_store());
    let booking = json!({
        "crn": "X320741",
        "bedId": "ap-leeds-b1",
        "arrivalDate": "2024-06-10",
        "departureDate": "2024-06-24"
    });

    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/premises/ap-leeds/bookings",
            booking.clone(),
        ))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json_body(created).await;
    assert_eq!(body["status"], json!("awaiting_arrival"));

    let clash = app
        .oneshot(json_request(
            "POST",
            "/api/v1/premises/ap-leeds/bookings",
            booking,
        ))
        .await
        .expect("response");
    assert_eq!(clash.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn withdrawing_arrived_booking_is_a_bad_request() {
    let store = seeded_store();
    let placed = placed_application(&application_service(&store));
    booking_service(&store)
        .record_arrival(
            &PremisesId("ap-leeds".to_string()),
            &placed.booking.id,
            ArrivalRequest {
                arrival_date: search_start(),
                expected_departure_date: date(2024, 7, 8),
                notes: None,
            },
        )
        .expect("arrival");

    let response = router(Arc::clone(&store))
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/bookings/{}/withdrawal", placed.booking.id),
            json!({ "reason": "booked_in_error" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = booking_service(&store)
        .booking(&PremisesId("ap-leeds".to_string()), &placed.booking.id)
        .expect("booking");
    assert!(stored.cancellation.is_none());
}

#[tokio::test]
async fn withdrawing_application_over_http_reports_outcome() {
    let store = seeded_store();
    let placed = placed_application(&application_service(&store));

    let response = router(Arc::clone(&store))
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/applications/{}/withdrawal", placed.application_id),
            json!({ "reason": "change_in_circumstances", "notes": "moved area" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    assert_eq!(body["root"]["type"], json!("application"));
    let withdrawn = body["withdrawn"].as_array().expect("withdrawn list");
    assert!(withdrawn.contains(&json!({ "type": "booking", "id": placed.booking.id.0 })));
}

#[tokio::test]
async fn duplicate_submission_over_http_is_rejected() {
    let store = seeded_store();
    let app = router(Arc::clone(&store));

    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/applications",
            json!({ "crn": "X320741" }),
        ))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = read_json_body(created).await["id"]
        .as_str()
        .expect("application id")
        .to_string();

    let uri = format!("/api/v1/applications/{id}/submission");
    let first = app
        .clone()
        .oneshot(json_request("POST", &uri, json!({})))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(json_request("POST", &uri, json!({})))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repository_outage_is_an_internal_error() {
    let app = api_router(Arc::new(UnavailableStore), config());
    let response = app
        .oneshot(get_request("/api/v1/premises"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert_eq!(body["title"], json!("Internal Server Error"));
}
