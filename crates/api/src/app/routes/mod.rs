use axum::Router;

use crate::middleware::AuthState;

pub mod comments;
pub mod pets;
pub mod system;

/// Router for everything under `/api`. Mutating routes carry the auth guard
/// individually; reads are public.
pub fn router(auth: AuthState) -> Router {
    Router::new()
        .nest("/pets", pets::router(auth.clone()))
        .nest("/comments", comments::router(auth))
}
