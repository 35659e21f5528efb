use num_enum::{
    IntoPrimitive,
    TryFromPrimitive,
};
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq,
    Deserialize, Serialize,
    IntoPrimitive, TryFromPrimitive,
)]
#[serde(rename_all = "lowercase")]
#[repr(i64)]
pub enum ApprovalStatus {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
    Cancelled = 3,
}

/// A concrete approval instance of one step, for one object, at one
/// iteration.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Approval {
    pub id: i64,
    pub workflow_id: i64,
    pub workflow_object_id: i64,
    pub approval_meta_id: i64,
    pub transition_id: i64,
    pub transition_meta_id: i64,
    pub iteration: i64,
    pub status: ApprovalStatus,
    pub transactioner: Option<i64>,
    pub transaction_ts: Option<i64>,
    pub previous_id: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Approvals(Vec<Approval>);

/// Instance of a transition meta for one object; reused across cycles.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Transition {
    pub id: i64,
    pub workflow_id: i64,
    pub workflow_object_id: i64,
    pub transition_meta_id: i64,
}

/// The persisted business object a workflow is attached to.  `version`
/// is bumped on every applied commit.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WorkflowObject {
    pub id: i64,
    pub workflow_id: i64,
    pub object_id: String,
    pub state_id: i64,
    pub version: i64,
    pub created_ts: i64,
}

/// An approval row to be created unless one already exists for the same
/// object, approval meta and iteration.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct NewApproval {
    pub transition_meta_id: i64,
    pub approval_meta_id: i64,
    pub iteration: i64,
}

/// A status change, applied only if the row still has the `expected`
/// status.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ApprovalUpdate {
    pub id: i64,
    pub expected: ApprovalStatus,
    pub status: ApprovalStatus,
    pub transactioner: Option<i64>,
    pub transaction_ts: Option<i64>,
    pub previous_id: Option<i64>,
}

/// Everything a single approve or reject call writes, applied atomically
/// against the object `version` it was planned from.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Commit {
    pub workflow_id: i64,
    pub workflow_object_id: i64,
    pub expected_version: i64,
    pub state_id: Option<i64>,
    pub updates: Vec<ApprovalUpdate>,
    pub materialize: Vec<NewApproval>,
}

mod impls;
pub mod traits;
