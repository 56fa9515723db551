use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::api::{AppointmentBookingService, AppointmentStore, SupabaseAppointmentStore};
use appointment_cell::models::{
    AppointmentError, AppointmentSearchQuery, AppointmentStatus, BookAppointmentRequest, CalendarScope,
    ConflictCandidate,
};
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestClock, TestConfig};

fn store_for(server: &MockServer) -> SupabaseAppointmentStore {
    let config = TestConfig::with_database_url(&server.uri()).to_app_config();
    SupabaseAppointmentStore::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn test_window_query_filters_scope_status_and_bounds() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let exclude_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("status", "eq.scheduled"))
        .and(query_param("scheduled_at", "lt.2030-06-03T10:00:00Z"))
        .and(query_param("ends_at", "gt.2030-06-03T09:00:00Z"))
        .and(query_param("id", format!("neq.{}", exclude_id)))
        .and(query_param("order", "scheduled_at.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &doctor_id.to_string(),
                &Uuid::new_v4().to_string(),
                TestClock::at(9, 30),
                30,
                "scheduled",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let found = store
        .scheduled_in_window(
            CalendarScope::Doctor(doctor_id),
            TestClock::at(9, 0),
            TestClock::at(10, 0),
            Some(exclude_id),
        )
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].doctor_id, doctor_id);
    assert_eq!(found[0].ends_at(), TestClock::at(10, 0));
}

#[tokio::test]
async fn test_patient_scope_uses_patient_column() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let found = store_for(&mock_server)
        .scheduled_in_window(CalendarScope::Patient(patient_id), TestClock::at(9, 0), TestClock::at(10, 0), None)
        .await
        .unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn test_search_translates_day_bounds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "*"))
        .and(query_param("status", "eq.no-show"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = AppointmentSearchQuery {
        status: Some(AppointmentStatus::NoShow),
        from_date: NaiveDate::from_ymd_opt(2030, 6, 3),
        to_date: NaiveDate::from_ymd_opt(2030, 6, 9),
        ..AppointmentSearchQuery::default()
    };

    let rows = store_for(&mock_server).search(&query).await.unwrap();
    assert!(rows.is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    let url = requests[0].url.as_str();
    assert!(url.contains("scheduled_at=gte.2030-06-03T00%3A00%3A00Z"));
    assert!(url.contains("scheduled_at=lt.2030-06-10T00%3A00%3A00Z"));
}

#[tokio::test]
async fn test_exclusion_violation_maps_to_scheduling_conflict() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    // The window read sees nothing; a concurrent writer from another
    // process wins and the database rejects our insert.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "doctor_id": doctor_id,
            "status": "scheduled",
            "ends_at": "2030-06-03T09:30:00Z"
        })))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::exclusion_violation()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();
    let store = Arc::new(store_for(&mock_server));
    let service = AppointmentBookingService::new(store, &config);

    let result = service
        .book_appointment(
            BookAppointmentRequest {
                doctor_id,
                patient_id: Uuid::new_v4(),
                scheduled_at: TestClock::at(9, 0),
                duration_minutes: Some(30),
                appointment_type: None,
                reason: None,
                notes: None,
                consultation_fee: None,
            },
            TestClock::now(),
        )
        .await;

    assert_matches!(result, Err(AppointmentError::SchedulingConflict));
}

#[tokio::test]
async fn test_existing_overlap_blocks_before_insert() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &doctor_id.to_string(),
                &Uuid::new_v4().to_string(),
                TestClock::at(9, 0),
                30,
                "scheduled",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();
    let service = AppointmentBookingService::new(Arc::new(store_for(&mock_server)), &config);

    let result = service
        .book_appointment(
            BookAppointmentRequest {
                doctor_id,
                patient_id: Uuid::new_v4(),
                scheduled_at: TestClock::at(9, 15),
                duration_minutes: Some(30),
                appointment_type: None,
                reason: None,
                notes: None,
                consultation_fee: None,
            },
            TestClock::now(),
        )
        .await;

    assert_matches!(result, Err(AppointmentError::SchedulingConflict));
}

#[tokio::test]
async fn test_update_with_no_rows_is_not_found() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let row = MockSupabaseResponses::appointment_response(
        &doctor_id.to_string(),
        &Uuid::new_v4().to_string(),
        TestClock::at(9, 0),
        30,
        "scheduled",
    );
    let appointment: appointment_cell::Appointment = serde_json::from_value(row).unwrap();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    assert_matches!(store.update(appointment.clone()).await, Err(AppointmentError::NotFound));
    assert_matches!(store.delete(appointment.id).await, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn test_server_error_maps_to_database_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("Internal server error", "500"),
        ))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server).get(Uuid::new_v4()).await;
    assert_matches!(result, Err(AppointmentError::DatabaseError(_)));
}

#[tokio::test]
async fn test_sub_second_starts_keep_full_precision() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let start = TestClock::at(9, 30) + Duration::milliseconds(500);

    let stored = MockSupabaseResponses::appointment_response(
        &doctor_id.to_string(),
        &Uuid::new_v4().to_string(),
        start,
        30,
        "scheduled",
    );

    // A slot starting at 10:00:00.200 still overlaps the stored row, which
    // ends at 10:00:00.500.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("scheduled_at", "lt.2030-06-03T10:30:00.200Z"))
        .and(query_param("ends_at", "gt.2030-06-03T10:00:00.200Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored.clone()])))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("ends_at", "gt.2030-06-03T09:30:00.500Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "doctor_id": doctor_id,
            "ends_at": "2030-06-03T10:00:00.500Z"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([stored])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();
    let service = AppointmentBookingService::new(Arc::new(store_for(&mock_server)), &config);

    service
        .book_appointment(
            BookAppointmentRequest {
                doctor_id,
                patient_id: Uuid::new_v4(),
                scheduled_at: start,
                duration_minutes: Some(30),
                appointment_type: None,
                reason: None,
                notes: None,
                consultation_fee: None,
            },
            TestClock::now(),
        )
        .await
        .unwrap();

    let late = ConflictCandidate::new(
        CalendarScope::Doctor(doctor_id),
        TestClock::at(10, 0) + Duration::milliseconds(200),
        30,
    );
    let response = service.check_conflicts(late).await.unwrap();
    assert!(response.has_conflict);
}
