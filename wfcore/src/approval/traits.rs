use async_trait::async_trait;
use crate::error::BackendError;
use super::{
    ApprovalStatus,
    Approvals,
    Commit,
    NewApproval,
    Transition,
    WorkflowObject,
};

#[async_trait]
pub trait WorkflowObjectBackend {
    /// Registers the object in `state_id` with the given approvals.  If the
    /// object is already registered the existing row is returned and
    /// nothing is written.
    async fn create_workflow_object(
        &self,
        workflow_id: i64,
        object_id: &str,
        state_id: i64,
        materialize: &[NewApproval],
    ) -> Result<WorkflowObject, BackendError>;
    async fn get_workflow_object(
        &self,
        workflow_id: i64,
        object_id: &str,
    ) -> Result<Option<WorkflowObject>, BackendError>;
    async fn get_workflow_object_by_id(
        &self,
        id: i64,
    ) -> Result<WorkflowObject, BackendError>;
    async fn list_workflow_objects(
        &self,
        workflow_id: i64,
    ) -> Result<Vec<WorkflowObject>, BackendError>;
    async fn list_transitions(
        &self,
        workflow_object_id: i64,
    ) -> Result<Vec<Transition>, BackendError>;
    /// Approvals of the object, ordered by id.
    async fn list_approvals(
        &self,
        workflow_object_id: i64,
    ) -> Result<Approvals, BackendError>;
    async fn list_approvals_by_status(
        &self,
        workflow_id: i64,
        status: ApprovalStatus,
    ) -> Result<Approvals, BackendError>;
    /// Applies the commit atomically.  Fails with `BackendError::Conflict`
    /// when the object version or any expected approval status no longer
    /// holds.
    async fn apply_commit(
        &self,
        commit: &Commit,
    ) -> Result<WorkflowObject, BackendError>;
}
