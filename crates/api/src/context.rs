use petconnect_auth::Principal;
use petconnect_core::UserId;

/// Authenticated caller attached to a request by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    display_name: String,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl From<Principal> for PrincipalContext {
    fn from(principal: Principal) -> Self {
        Self::new(principal.user_id, principal.display_name)
    }
}
