use serde::{Deserialize, Serialize};

/// A node of a workflow graph.  States are global and may be shared by
/// more than one workflow.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct State {
    pub id: i64,
    pub label: String,
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct States(Vec<State>);

mod impls;
pub mod traits;
