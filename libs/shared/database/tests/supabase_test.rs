use assert_matches::assert_matches;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "anon-key".to_string(),
        supabase_service_role_key: "service-key".to_string(),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_request_sends_keys_and_decodes_rows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let rows: Vec<Value> = client
        .request(Method::GET, "/rest/v1/appointments", None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], 1);
}

#[tokio::test]
async fn test_writes_ask_for_representation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 2 }])))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let rows: Vec<Value> = client
        .request(Method::POST, "/rest/v1/appointments", Some(json!({ "id": 2 })))
        .await
        .unwrap();

    assert_eq!(rows[0]["id"], 2);
}

#[tokio::test]
async fn test_conflict_status_is_typed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23P01",
            "message": "conflicting key value violates exclusion constraint"
        })))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let result = client
        .request::<Value>(Method::POST, "/rest/v1/appointments", Some(json!({})))
        .await;

    assert_matches!(result, Err(DatabaseError::Conflict(body)) if body.contains("23P01"));
}

#[tokio::test]
async fn test_other_statuses_map_to_their_variants() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));

    let forbidden = client.request::<Value>(Method::GET, "/rest/v1/forbidden", None).await;
    assert_matches!(forbidden, Err(DatabaseError::Auth(_)));

    let broken = client.request::<Value>(Method::GET, "/rest/v1/broken", None).await;
    assert_matches!(broken, Err(DatabaseError::Api { status, .. }) if status.as_u16() == 500);
}
