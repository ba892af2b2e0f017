use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "PetConnect API is running" }))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
