use thiserror::Error;

use petconnect_core::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authorized")]
    NotOwner,
}

/// Ownership check performed before every mutating operation.
///
/// Listings and comments are exclusively owned by their creator; there is no
/// policy engine beyond this equality.
pub fn authorize_owner(requester: UserId, owner: UserId) -> Result<(), AuthzError> {
    if requester == owner {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_authorized() {
        let id = UserId::new();
        assert_eq!(authorize_owner(id, id), Ok(()));
    }

    #[test]
    fn other_user_is_rejected() {
        assert_eq!(
            authorize_owner(UserId::new(), UserId::new()),
            Err(AuthzError::NotOwner)
        );
    }
}
