use serde::{Deserialize, Serialize};

/// Grants `permission` to `subject`, which may be a user name or a group.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Permit {
    pub subject: String,
    pub permission: String,
}

/// Places the named user into a group.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Membership {
    pub user: String,
    pub group: String,
}

impl Permit {
    pub fn new(subject: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            permission: permission.into(),
        }
    }
}

impl Membership {
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
        }
    }
}
