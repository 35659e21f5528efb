use crate::error::AuthorityError;
use super::{
    principal::Principal,
    user::User,
};

/// The authentication/authorization collaborator consulted before any
/// approval step is granted.
pub trait Authority: Send + Sync {
    fn principal_has_permission(
        &self,
        principal: &Principal,
        permission: &str,
    ) -> Result<bool, AuthorityError>;

    fn principal_is(
        &self,
        principal: &Principal,
        user_id: i64,
    ) -> bool {
        matches!(principal, Principal::User(User { id, .. }) if *id == user_id)
    }
}
