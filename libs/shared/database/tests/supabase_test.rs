use assert_matches::assert_matches;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "unused".to_string(),
        slot_capacity: 3,
        server_port: 3000,
    }
}

#[tokio::test]
async fn test_request_sends_api_key_and_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", "eq.7"))
        .and(header("apikey", "test-anon-key"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 7 }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let rows: Vec<Value> = client
        .request(Method::GET, "/rest/v1/doctors?id=eq.7", Some("user-token"), None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], 7);
}

#[tokio::test]
async fn test_rpc_posts_arguments_to_function_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment"))
        .and(body_json(json!({ "p_capacity": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let result: Value = client
        .rpc("book_appointment", None, json!({ "p_capacity": 3 }))
        .await
        .unwrap();

    assert_eq!(result["ok"], true);
}

#[tokio::test]
async fn test_unique_violation_surfaces_as_typed_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_unique_patient_slot\"",
            "details": null,
            "hint": null
        })))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let err = client
        .rpc::<Value>("book_appointment", None, json!({}))
        .await
        .unwrap_err();

    assert!(err.is_unique_violation());
    assert_matches!(err, SupabaseError::Api { status: 409, .. });
}

#[tokio::test]
async fn test_auth_failure_maps_to_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "JWT expired" })))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let err = client
        .request::<Vec<Value>>(Method::GET, "/rest/v1/appointments", Some("stale"), None)
        .await
        .unwrap_err();

    assert_matches!(err, SupabaseError::Auth(message) if message == "JWT expired");
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let config = AppConfig {
        supabase_url: "http://127.0.0.1:1".to_string(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "unused".to_string(),
        slot_capacity: 3,
        server_port: 3000,
    };

    let client = SupabaseClient::new(&config);
    let err = client
        .request::<Vec<Value>>(Method::GET, "/rest/v1/doctors", None, None)
        .await
        .unwrap_err();

    assert!(err.is_transport());
}
