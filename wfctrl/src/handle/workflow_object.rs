use std::sync::Arc;
use wfcore::{
    approval::{
        Approvals,
        WorkflowObject,
    },
    workflow::WorkflowGraph,
};

use crate::platform::Platform;

/// A workflow object together with its graph and approvals, as read at
/// `object.version`.  Every approve or reject is planned against that
/// read and refreshes it once committed.
pub struct WorkflowObjectCtrl<'p> {
    pub(crate) platform: &'p Platform,
    pub(crate) graph: Arc<WorkflowGraph>,
    pub(crate) object: WorkflowObject,
    pub(crate) approvals: Approvals,
}

mod impls;
