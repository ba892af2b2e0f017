use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path,
        rejection::{JsonRejection, PathRejection},
    },
    handler::Handler,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use petconnect_core::{CommentId, PetId};

use crate::app::dto::CreateCommentRequest;
use crate::app::errors::ServiceError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;
use crate::middleware::{self, AuthState};

pub fn router(auth: AuthState) -> Router {
    let guard = || axum::middleware::from_fn_with_state(auth.clone(), middleware::auth_middleware);

    // `/:id` is a listing id for GET and a comment id for DELETE.
    Router::new()
        .route("/", post(add_comment.layer(guard())))
        .route("/:id", get(list_comments).delete(delete_comment.layer(guard())))
}

pub async fn add_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(body) = body?;
    let pet_id: PetId = body.pet_id.parse()?;
    let comment = services.add_comment(&principal, pet_id, &body.text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(pet_id) = path?;
    let pet_id: PetId = pet_id.parse()?;
    Ok(Json(services.list_comments(pet_id).await?))
}

pub async fn delete_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = path?;
    let id: CommentId = id.parse()?;
    services.delete_comment(id, principal.user_id()).await?;
    Ok(Json(json!({ "message": "Comment deleted" })))
}
