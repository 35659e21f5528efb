use wfcore::error::{
    AuthorityError,
    BackendError,
    ConfigurationError,
    ConsistencyError,
    ValueError,
};
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error(transparent)]
    Authority(#[from] AuthorityError),
    #[error(transparent)]
    Value(#[from] ValueError),
    /// More than one destination is available and none was chosen.
    #[error("ambiguous transition from state {state_id}: candidates {candidates:?}")]
    AmbiguousTransition {
        state_id: i64,
        candidates: Vec<i64>,
    },
    #[error("state {state_id} is not an available next state: available {available:?}")]
    InvalidNextState {
        state_id: i64,
        available: Vec<i64>,
    },
    #[error("unknown state: {0}")]
    UnknownState(String),
    #[error("no workflow registered for {0}.{1}")]
    UnknownWorkflow(String, String),
    #[error("object {1} is not registered with workflow {0}")]
    UnknownObject(i64, String),
}

#[non_exhaustive]
#[derive(Debug, Error, PartialEq)]
pub enum PermissionError {
    #[error("anonymous principals may not transact approvals")]
    Anonymous,
    #[error("no approval available to {0}")]
    NoAvailableApproval(String),
}
