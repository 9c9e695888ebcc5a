use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_liveness() {
        let app = create_router(TestConfig::default().to_arc());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"Clinic scheduling API is running!");
    }

    #[tokio::test]
    async fn test_doctor_routes_are_public() {
        let mock_server = MockServer::start().await;
        let doctor_id = "6f1c2a4e-8d3b-4c59-9a7e-1b2c3d4e5f60";
        Mock::given(method("GET"))
            .and(path("/rest/v1/doctors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::doctor_response(doctor_id, "Dr. Rao", "FRIDAY - 10:00AM TO 11:00AM", 300.0)
            ])))
            .mount(&mock_server)
            .await;

        let app = create_router(Arc::new(TestConfig::with_supabase_url(&mock_server.uri())));
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/doctors/{}/slots", doctor_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["slots"][0]["day"], "FRIDAY");
        assert_eq!(body["slots"][0]["slots"], json!(["10:00 AM", "10:30 AM"]));
    }

    #[tokio::test]
    async fn test_appointment_routes_require_a_token() {
        let app = create_router(TestConfig::default().to_arc());

        let response = app
            .oneshot(Request::builder().uri("/appointments/mine").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
