use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::Arc,
};
use wfcore::workflow::WorkflowGraph;

/// Workflow graphs already loaded from the backend, keyed by workflow id.
///
/// Definitions are immutable once registered, so a loaded graph never
/// needs to be refreshed.
#[derive(Default)]
pub(crate) struct GraphRegistry {
    graphs: RwLock<HashMap<i64, Arc<WorkflowGraph>>>,
}

impl GraphRegistry {
    pub(crate) fn get(&self, workflow_id: i64) -> Option<Arc<WorkflowGraph>> {
        self.graphs.read().get(&workflow_id).cloned()
    }

    /// Inserts the graph unless one is already present, returning the
    /// graph that is kept.
    pub(crate) fn insert(&self, graph: WorkflowGraph) -> Arc<WorkflowGraph> {
        let mut graphs = self.graphs.write();
        graphs.entry(graph.workflow().id)
            .or_insert_with(|| Arc::new(graph))
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.graphs.read().len()
    }
}
