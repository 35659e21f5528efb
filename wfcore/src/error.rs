use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    #[cfg(feature = "sqlx")]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    /// The write was based on a stale read of the row it touches.
    #[error("conflicting write: {0}")]
    Conflict(String),
    /// Denotes custom application invariant; generally informative.
    #[error("application invariant violated: {0}")]
    AppInvariantViolation(String),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    #[error("unknown error")]
    Unknown,
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ValueError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("uninitialized value")]
    Uninitialized,
    #[error("unsupported value: {0}")]
    Unsupported(String),
}

/// Malformed workflow definitions, reported at registration.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("workflow declares no initial state")]
    NoInitialState,
    #[error("workflow declares multiple initial states: {0:?}")]
    MultipleInitialStates(Vec<String>),
    #[error("state declared more than once: {0}")]
    DuplicateState(String),
    #[error("unknown state: {0}")]
    UnknownState(String),
    #[error("transition {0} -> {1} declared more than once")]
    DuplicateTransition(String, String),
    #[error("transition {0} -> {1} declares no approval steps")]
    NoApprovalSteps(String, String),
    #[error("transition {from} -> {to} has duplicate priority {priority}")]
    DuplicatePriority {
        from: String,
        to: String,
        priority: i64,
    },
    #[error("step {priority} of transition {from} -> {to} lists permission {permission} more than once")]
    DuplicatePermission {
        from: String,
        to: String,
        priority: i64,
        permission: String,
    },
    #[error("step {priority} of transition {from} -> {to} lists user {user} more than once")]
    DuplicateUser {
        from: String,
        to: String,
        priority: i64,
        user: i64,
    },
    #[error("workflow already registered for {0}.{1}")]
    DuplicateWorkflow(String, String),
    #[error("transition meta {transition_meta_id} does not belong to workflow {workflow_id}")]
    ForeignTransitionMeta {
        workflow_id: i64,
        transition_meta_id: i64,
    },
    #[error("approval meta {approval_meta_id} references transition meta {transition_meta_id} outside of workflow {workflow_id}")]
    ForeignApprovalMeta {
        workflow_id: i64,
        approval_meta_id: i64,
        transition_meta_id: i64,
    },
}

/// Historical rows that cannot be mapped between representations.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq)]
pub enum ConsistencyError {
    #[error("approval {id} has unmappable status {value}")]
    UnmappableStatus {
        id: i64,
        value: String,
    },
    #[error("approval {id} references missing transition {transition_id}")]
    MissingTransition {
        id: i64,
        transition_id: i64,
    },
    #[error("{table} {id} references missing transition meta {transition_meta_id}")]
    MissingTransitionMeta {
        table: &'static str,
        id: i64,
        transition_meta_id: i64,
    },
    #[error("{table} {id} matches {count} transition metas for states {source_state_id} -> {destination_state_id}")]
    AmbiguousStatePair {
        table: &'static str,
        id: i64,
        source_state_id: i64,
        destination_state_id: i64,
        count: usize,
    },
    #[error("{table} {id} has no transition meta for states {source_state_id} -> {destination_state_id}")]
    UnmatchedStatePair {
        table: &'static str,
        id: i64,
        source_state_id: i64,
        destination_state_id: i64,
    },
    #[error("approval {id} references missing approval meta {approval_meta_id}")]
    MissingApprovalMeta {
        id: i64,
        approval_meta_id: i64,
    },
    #[error("approval {id} lacks an iteration")]
    MissingIteration {
        id: i64,
    },
    #[error("unrecognized schema: {0}")]
    UnrecognizedSchema(String),
}

/// Failure reported by the authority collaborator.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("authority unavailable: {0}")]
    Unavailable(String),
}
