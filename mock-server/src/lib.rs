use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MAX_DISPLAY_NAME: usize = 32;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: String,
}

#[derive(Deserialize)]
pub struct CreateProfile {
    pub display_name: String,
}

#[derive(Deserialize)]
pub struct UpdateProfile {
    pub display_name: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Profile>>>;

type ApiError = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/health", get(health))
        .route("/text", get(text))
        .route("/binary", get(binary))
        .route("/malformed", get(malformed))
        .route("/slow/{ms}", get(slow))
        .route("/status/{code}", get(status))
        .route("/echo", any(echo))
        .route("/secure", get(secure))
        .route("/profiles", get(list_profiles).post(create_profile))
        .route(
            "/profiles/{id}",
            get(get_profile).patch(update_profile).delete(delete_profile),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "message": message.into() })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn text() -> &'static str {
    "ok"
}

async fn binary() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![0u8, 1, 2, 3, 255],
    )
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "not json")
}

async fn slow(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "slept_ms": ms }))
}

async fn status(Path(code): Path<u16>) -> Result<ApiError, ApiError> {
    let status = StatusCode::from_u16(code)
        .map_err(|_| error(StatusCode::BAD_REQUEST, format!("invalid status code {code}")))?;
    Ok(error(status, format!("status {code}")))
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: HashMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn secure(headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer ") && value.len() > "Bearer ".len());
    if authorized {
        Ok(Json(json!({ "user": "me" })))
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "missing bearer token"))
    }
}

fn validate_display_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_DISPLAY_NAME {
        return Err(error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("display name must be 1-{MAX_DISPLAY_NAME} characters"),
        ));
    }
    Ok(name.to_string())
}

async fn list_profiles(State(db): State<Db>) -> Json<Vec<Profile>> {
    let profiles = db.read().await;
    Json(profiles.values().cloned().collect())
}

async fn create_profile(
    State(db): State<Db>,
    Json(input): Json<CreateProfile>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let profile = Profile {
        id: Uuid::new_v4(),
        display_name: validate_display_name(&input.display_name)?,
    };
    db.write().await.insert(profile.id, profile.clone());
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_profile(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError> {
    let profiles = db.read().await;
    profiles
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "profile not found"))
}

async fn update_profile(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProfile>,
) -> Result<Json<Profile>, ApiError> {
    let display_name = input
        .display_name
        .as_deref()
        .map(validate_display_name)
        .transpose()?;
    let mut profiles = db.write().await;
    let profile = profiles
        .get_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "profile not found"))?;
    if let Some(display_name) = display_name {
        profile.display_name = display_name;
    }
    Ok(Json(profile.clone()))
}

async fn delete_profile(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut profiles = db.write().await;
    profiles
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "profile not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_serializes_to_json() {
        let profile = Profile {
            id: Uuid::nil(),
            display_name: "Ada".to_string(),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["display_name"], "Ada");
    }

    #[test]
    fn create_profile_rejects_missing_name() {
        let result: Result<CreateProfile, _> = serde_json::from_str(r#"{}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_profile_fields_optional() {
        let input: UpdateProfile = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.display_name.is_none());
    }

    #[test]
    fn display_name_is_trimmed_and_bounded() {
        assert_eq!(validate_display_name("  Ada  ").unwrap(), "Ada");
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(MAX_DISPLAY_NAME)).is_ok());
        assert!(validate_display_name(&"x".repeat(MAX_DISPLAY_NAME + 1)).is_err());
    }
}
