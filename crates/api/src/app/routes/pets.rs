use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, FromRequest, Multipart, Path, Query, Request,
        multipart::MultipartRejection,
        rejection::{PathRejection, QueryRejection},
    },
    handler::Handler,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, put},
};
use serde_json::json;

use petconnect_core::PetId;
use petconnect_listings::{ListingFilter, OwnerScope};

use crate::app::dto::{ListPetsQuery, MyPostsQuery, PetFields, PetForm};
use crate::app::errors::ServiceError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;
use crate::middleware::{self, AuthState};

pub fn router(auth: AuthState) -> Router {
    let guard = || axum::middleware::from_fn_with_state(auth.clone(), middleware::auth_middleware);

    Router::new()
        .route("/", get(list_pets).post(create_pet.layer(guard())))
        .route("/my-posts", get(my_posts.layer(guard())))
        .route(
            "/:id",
            get(get_pet)
                .put(update_pet.layer(guard()))
                .delete(delete_pet.layer(guard())),
        )
        .route("/:id/share", put(share_pet))
}

pub async fn list_pets(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<ListPetsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Query(q) = query?;
    let filter = ListingFilter::from_query(
        q.city.as_deref(),
        q.species.as_deref(),
        q.status.as_deref(),
        q.search.as_deref(),
    )?;
    Ok(Json(services.list_pets(&filter).await?))
}

pub async fn my_posts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<MyPostsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Query(q) = query?;
    let scope: OwnerScope = q.state.as_deref().unwrap_or("").parse()?;
    Ok(Json(services.my_posts(principal.user_id(), scope).await?))
}

pub async fn get_pet(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = path?;
    let id: PetId = id.parse()?;
    Ok(Json(services.view_pet(id).await?))
}

pub async fn create_pet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let form = PetForm::read(multipart?).await?;
    let draft = form.fields.into_new_listing()?;
    let pet = services.create_pet(&principal, draft, form.image).await?;
    Ok((StatusCode::CREATED, Json(pet)))
}

/// Accepts either a multipart form (optionally with a new image) or a JSON body.
pub async fn update_pet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    path: Result<Path<String>, PathRejection>,
    req: Request,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = path?;
    let id: PetId = id.parse()?;

    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (fields, image) = if is_multipart {
        let multipart = Multipart::from_request(req, &()).await?;
        let form = PetForm::read(multipart).await?;
        (form.fields, form.image)
    } else {
        let Json(fields) = Json::<PetFields>::from_request(req, &()).await?;
        (fields, None)
    };

    let pet = services
        .update_pet(id, &principal, fields.into_patch()?, image)
        .await?;
    Ok(Json(pet))
}

pub async fn delete_pet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = path?;
    let id: PetId = id.parse()?;
    services.delete_pet(id, principal.user_id()).await?;
    Ok(Json(json!({ "message": "Pet post deleted" })))
}

pub async fn share_pet(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = path?;
    let id: PetId = id.parse()?;
    let shares = services.share_pet(id).await?;
    Ok(Json(json!({ "shares": shares })))
}
