use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::User;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
    Other,
}

impl Role {
    pub fn from_claim(role: Option<&str>) -> Self {
        match role.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("patient") => Role::Patient,
            Some("doctor") => Role::Doctor,
            Some("admin") => Role::Admin,
            _ => Role::Other,
        }
    }
}

/// Who is calling, resolved once per request from the validated bearer token.
///
/// Scheduling code receives this explicitly instead of looking identity up on its own.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    pub role: Role,
    pub auth_token: String,
}

impl SessionContext {
    pub fn from_user(user: &User, auth_token: &str) -> Self {
        Self {
            user_id: user.id.clone(),
            role: Role::from_claim(user.role.as_deref()),
            auth_token: auth_token.to_string(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The caller's patient id; only patients can book for themselves.
    pub fn patient_id(&self) -> Result<Uuid, AppError> {
        if self.role != Role::Patient {
            return Err(AppError::Forbidden("Only patients can book appointments".to_string()));
        }
        self.user_uuid()
    }

    /// Doctors see their own bookings; admins see any doctor's.
    pub fn ensure_can_view_doctor(&self, doctor_id: Uuid) -> Result<(), AppError> {
        if self.is_admin() {
            return Ok(());
        }
        if self.role == Role::Doctor && self.user_uuid()? == doctor_id {
            return Ok(());
        }
        Err(AppError::Forbidden("Not authorized to view this doctor's appointments".to_string()))
    }

    fn user_uuid(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.user_id)
            .map_err(|_| AppError::Auth("Session subject is not a valid user id".to_string()))
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))?;

        let TypedHeader(auth) = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Auth("Missing bearer token".to_string()))?;

        Ok(SessionContext::from_user(&user, auth.token()))
    }
}
