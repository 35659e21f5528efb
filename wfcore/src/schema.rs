use serde::{Deserialize, Serialize};
use crate::{
    approval::Transition,
    workflow::TransitionMeta,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum StatusEncoding {
    /// `pending`, `approved`, `rejected`, `cancelled`
    Symbolic,
    /// `0`, `1`, `2`, `3`
    Integer,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum TransitionRefForm {
    /// Rows reference transition and transition meta ids.
    Meta,
    /// Rows carry the source and destination state ids directly.
    StatePair,
}

/// The representation currently used by persisted approval rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ApprovalSchema {
    pub status: StatusEncoding,
    pub iteration: bool,
    pub transition_ref: TransitionRefForm,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum StatusValue {
    Symbolic(String),
    Integer(i64),
}

/// Reference from an approval (meta) row to its transition (meta).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum TransitionLink {
    Id(i64),
    States {
        source_state_id: i64,
        destination_state_id: i64,
    },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ApprovalMetaRecord {
    pub id: i64,
    pub workflow_id: i64,
    /// `TransitionLink::Id` holds a transition meta id.
    pub link: TransitionLink,
    pub priority: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ApprovalRecord {
    pub id: i64,
    pub workflow_id: i64,
    pub workflow_object_id: i64,
    pub approval_meta_id: i64,
    /// `TransitionLink::Id` holds a transition id.
    pub link: TransitionLink,
    pub status: StatusValue,
    pub iteration: Option<i64>,
    pub transactioner: Option<i64>,
    pub transaction_ts: Option<i64>,
    pub previous_id: Option<i64>,
}

/// Every row a reconciliation may rewrite, in the shape described by
/// `schema`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RecordSet {
    pub schema: ApprovalSchema,
    pub transition_metas: Vec<TransitionMeta>,
    pub transitions: Vec<Transition>,
    pub approval_metas: Vec<ApprovalMetaRecord>,
    pub approvals: Vec<ApprovalRecord>,
}

mod impls;
pub mod traits;
