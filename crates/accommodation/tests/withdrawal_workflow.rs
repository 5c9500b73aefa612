use std::path::PathBuf;
use std::sync::Arc;

use accommodation::config::SearchConfig;
use accommodation::workflows::api_router;
use accommodation::workflows::estate::{EstateImporter, PostcodeDistrictImporter};
use accommodation::workflows::memory::InMemoryStore;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn app() -> Router {
    let store = InMemoryStore::new();
    let estate = EstateImporter::from_path(fixture("estate.csv")).expect("estate fixture");
    EstateImporter::load_into(&store, estate).expect("load estate");
    let districts = PostcodeDistrictImporter::from_path(fixture("postcode_districts.csv"))
        .expect("district fixture");
    PostcodeDistrictImporter::load_into(&store, districts).expect("load districts");
    api_router(Arc::new(store), SearchConfig::default())
}

async fn send(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json")
    };
    (status, payload)
}

fn string(value: &Value) -> String {
    value.as_str().expect("string value").to_string()
}

async fn search_leeds(app: &Router, start: &str) -> Vec<String> {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/beds/search",
        json!({
            "serviceName": "approved-premises",
            "postcodeDistrict": "LS1",
            "maxDistanceMiles": 5,
            "startDate": start,
            "durationDays": 14
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["results"]
        .as_array()
        .expect("results")
        .iter()
        .map(|result| string(&result["bed"]["id"]))
        .collect()
}

#[tokio::test]
async fn application_withdrawal_cancels_pending_bookings_and_frees_beds() {
    let app = app();

    let (status, application) = send(
        &app,
        "POST",
        "/api/v1/applications",
        json!({ "crn": "X320741" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let application_id = string(&application["id"]);

    let (status, tree) = send(
        &app,
        "POST",
        &format!("/api/v1/applications/{application_id}/submission"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let assessment_id = string(&tree["assessments"][0]["id"]);

    let (status, tree) = send(
        &app,
        "POST",
        &format!("/api/v1/assessments/{assessment_id}/acceptance"),
        json!({ "expectedArrival": "2030-03-01", "durationDays": 14 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let first_request = string(&tree["placementRequests"][0]["id"]);

    let (status, first_booking) = send(
        &app,
        "POST",
        &format!("/api/v1/placement-requests/{first_request}/booking"),
        json!({
            "premisesId": "ap-leeds",
            "bedId": "ap-leeds-b1",
            "arrivalDate": "2030-03-01",
            "departureDate": "2030-03-15"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_booking_id = string(&first_booking["id"]);

    let (status, arrived) = send(
        &app,
        "POST",
        &format!("/api/v1/premises/ap-leeds/bookings/{first_booking_id}/arrivals"),
        json!({ "arrivalDate": "2030-03-01", "expectedDepartureDate": "2030-03-15" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(arrived["status"], json!("arrived"));

    let (status, placement) = send(
        &app,
        "POST",
        "/api/v1/placement-applications",
        json!({ "applicationId": application_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let placement_id = string(&placement["id"]);

    let (status, tree) = send(
        &app,
        "POST",
        &format!("/api/v1/placement-applications/{placement_id}/decision"),
        json!({
            "decision": "accepted",
            "placementDates": { "expectedArrival": "2030-05-01", "durationDays": 14 }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second_request = tree["placementRequests"]
        .as_array()
        .expect("placement requests")
        .iter()
        .find(|request| request["placementApplicationId"] == json!(placement_id))
        .map(|request| string(&request["id"]))
        .expect("request raised by placement application");

    let (status, second_booking) = send(
        &app,
        "POST",
        &format!("/api/v1/placement-requests/{second_request}/booking"),
        json!({
            "premisesId": "ap-leeds",
            "bedId": "ap-leeds-b2",
            "arrivalDate": "2030-05-01",
            "departureDate": "2030-05-15"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_booking_id = string(&second_booking["id"]);
    assert!(!search_leeds(&app, "2030-05-01").await.contains(&"ap-leeds-b2".to_string()));

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/api/v1/applications/{application_id}/withdrawal"),
        json!({ "reason": "alternative_provision_identified" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(outcome["withdrawn"]
        .as_array()
        .expect("withdrawn")
        .contains(&json!({ "type": "booking", "id": second_booking_id })));
    assert_eq!(
        outcome["skipped"],
        json!([{
            "entity": { "type": "booking", "id": first_booking_id },
            "reason": "arrival_recorded"
        }])
    );

    let (_, first) = send(
        &app,
        "GET",
        &format!("/api/v1/premises/ap-leeds/bookings/{first_booking_id}"),
        Value::Null,
    )
    .await;
    assert_eq!(first["status"], json!("arrived"));
    let (_, second) = send(
        &app,
        "GET",
        &format!("/api/v1/premises/ap-leeds/bookings/{second_booking_id}"),
        Value::Null,
    )
    .await;
    assert_eq!(second["status"], json!("cancelled"));
    assert_eq!(
        second["cancellation"]["reason"],
        json!("related_placement_request_withdrawn")
    );

    assert!(search_leeds(&app, "2030-05-01").await.contains(&"ap-leeds-b2".to_string()));

    let (status, withdrawables) = send(
        &app,
        "GET",
        &format!("/api/v1/applications/{application_id}/withdrawables"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(withdrawables, json!([]));
}

#[tokio::test]
async fn concurrent_submissions_over_http_accept_one() {
    let app = app();
    let (_, application) = send(
        &app,
        "POST",
        "/api/v1/applications",
        json!({ "crn": "X320741" }),
    )
    .await;
    let uri = format!("/api/v1/applications/{}/submission", string(&application["id"]));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let app = app.clone();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move {
            send(&app, "POST", &uri, Value::Null).await.0
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.expect("task"));
    }
    assert_eq!(
        statuses.iter().filter(|status| **status == StatusCode::OK).count(),
        1
    );
    assert!(statuses
        .iter()
        .all(|status| *status == StatusCode::OK || *status == StatusCode::BAD_REQUEST));
}
