//! `petconnect-auth`: token validation and ownership checks.
//!
//! This crate is intentionally decoupled from HTTP and storage: the API layer
//! extracts the bearer token, this crate turns it into a [`Principal`], and
//! services call [`authorize_owner`] before every mutation.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod principal;

pub use authorize::{AuthzError, authorize_owner};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator, TokenError};
pub use principal::Principal;
