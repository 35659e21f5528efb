use std::fmt::{
    Display,
    Formatter,
    Result,
};

use crate::ac::user::User;
use super::Principal;

impl Display for Principal {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Principal::Anonymous => write!(f, "<Principal:Anonymous>"),
            Principal::User(User { name, .. }) => write!(f, "<User:{name}>"),
        }
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Principal {
        Principal::User(user)
    }
}

impl From<&Principal> for Option<i64> {
    fn from(principal: &Principal) -> Self {
        match principal {
            Principal::Anonymous => None,
            Principal::User(User { id, .. }) => Some(*id),
        }
    }
}

impl Principal {
    pub fn user_id(&self) -> Option<i64> {
        self.into()
    }

    /// The subject string used by policy enforcers; anonymous maps to `-`.
    pub fn subject(&self) -> &str {
        match self {
            Principal::Anonymous => "-",
            Principal::User(User { name, .. }) => name,
        }
    }
}
