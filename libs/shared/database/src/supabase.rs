use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

/// Postgres `unique_violation`, passed through by PostgREST in the `code` field.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Invalid header value: {0}")]
    Header(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SupabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, SupabaseError::Api { code: Some(code), .. } if code == UNIQUE_VIOLATION)
    }

    /// Message raised by a database function (`raise exception '...'`).
    pub fn raised_message(&self) -> Option<&str> {
        match self {
            SupabaseError::Api { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// True when the request never produced a definitive answer from the database.
    pub fn is_transport(&self) -> bool {
        matches!(self, SupabaseError::Transport(_))
    }
}

/// PostgREST error body: `{"code": "...", "message": "...", "details": ..., "hint": ...}`.
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        let apikey = HeaderValue::from_str(&self.anon_key)
            .map_err(|e| SupabaseError::Header(e.to_string()))?;
        headers.insert("apikey", apikey);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| SupabaseError::Header(e.to_string()))?;
            headers.insert(AUTHORIZATION, bearer);
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T, SupabaseError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, SupabaseError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(classify_error(status, error_text));
        }

        let bytes = response.bytes().await?;
        let data = serde_json::from_slice::<T>(&bytes)?;
        Ok(data)
    }

    /// Call a database function through PostgREST (`POST /rest/v1/rpc/{function}`).
    /// The function body runs inside a single transaction.
    pub async fn rpc<T>(&self, function: &str, auth_token: Option<&str>, args: Value)
                        -> Result<T, SupabaseError>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, auth_token, Some(args)).await
    }
}

fn classify_error(status: StatusCode, error_text: String) -> SupabaseError {
    let parsed: Option<PostgrestErrorBody> = serde_json::from_str(&error_text).ok();
    let (code, message) = match parsed {
        Some(body) => (body.code, body.message.unwrap_or_else(|| error_text.clone())),
        None => (None, error_text),
    };

    match status.as_u16() {
        401 | 403 => {
            warn!("Supabase rejected credentials ({}): {}", status, message);
            SupabaseError::Auth(message)
        }
        404 => SupabaseError::NotFound(message),
        // Constraint violations and raised exceptions are expected outcomes for callers.
        400 | 409 => {
            debug!("Supabase request refused ({}): {:?} {}", status, code, message);
            SupabaseError::Api { status: status.as_u16(), code, message }
        }
        _ => {
            error!("API error ({}): {}", status, message);
            SupabaseError::Api { status: status.as_u16(), code, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_is_recognised_from_postgrest_body() {
        let err = classify_error(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":null,"hint":null}"#.to_string(),
        );

        assert!(err.is_unique_violation());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_raised_exception_message_is_kept() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"P0001","message":"slot_full"}"#.to_string(),
        );

        assert!(!err.is_unique_violation());
        assert_eq!(err.raised_message(), Some("slot_full"));
    }

    #[test]
    fn test_non_json_error_body_is_used_as_message() {
        let err = classify_error(StatusCode::BAD_GATEWAY, "upstream down".to_string());

        match err {
            SupabaseError::Api { status, code, message } => {
                assert_eq!(status, 502);
                assert!(code.is_none());
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_auth_statuses_map_to_auth_error() {
        assert!(matches!(
            classify_error(StatusCode::UNAUTHORIZED, "{}".to_string()),
            SupabaseError::Auth(_)
        ));
        assert!(matches!(
            classify_error(StatusCode::NOT_FOUND, "missing".to_string()),
            SupabaseError::NotFound(_)
        ));
    }
}
