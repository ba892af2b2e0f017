use petconnect_core::UserId;

use crate::JwtClaims;

/// The authenticated user behind a request.
///
/// `display_name` is snapshotted onto listings and comments at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub display_name: String,
}

impl Principal {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

impl From<JwtClaims> for Principal {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            display_name: claims.name,
        }
    }
}
