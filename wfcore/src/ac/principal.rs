use serde::{Deserialize, Serialize};
use super::user::User;

/// The party acting on a workflow object.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub enum Principal {
    #[default]
    Anonymous,
    User(User),
}

mod impls;
