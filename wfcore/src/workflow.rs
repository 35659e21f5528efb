use serde::{Deserialize, Serialize};

/// A workflow attached to one field of one content type.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Workflow {
    pub id: i64,
    pub content_type: String,
    pub field_name: String,
    pub initial_state_id: i64,
    pub created_ts: i64,
}

/// A directed edge between two states of a workflow.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct TransitionMeta {
    pub id: i64,
    pub workflow_id: i64,
    pub source_state_id: i64,
    pub destination_state_id: i64,
}

/// One step of the ordered approval chain gating a transition meta.
///
/// A step with neither permissions nor users may be granted by any
/// authenticated principal.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ApprovalMeta {
    pub id: i64,
    pub workflow_id: i64,
    pub transition_meta_id: i64,
    pub priority: i64,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub users: Vec<i64>,
}

/// Declarative form of a workflow, as loaded from configuration.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WorkflowDef {
    pub content_type: String,
    pub field_name: String,
    pub states: Vec<StateDef>,
    pub transitions: Vec<TransitionDef>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StateDef {
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub initial: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TransitionDef {
    pub source: String,
    pub destination: String,
    pub approvals: Vec<ApprovalDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ApprovalDef {
    /// Defaults to the position of the step within its transition.
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub users: Vec<i64>,
}

pub mod graph;
mod impls;
pub mod iteration;
pub mod traits;

pub use graph::WorkflowGraph;
