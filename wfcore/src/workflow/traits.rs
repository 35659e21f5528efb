use async_trait::async_trait;
use crate::error::BackendError;
use super::{
    ApprovalMeta,
    TransitionMeta,
    Workflow,
    WorkflowDef,
};

#[async_trait]
pub trait WorkflowBackend {
    /// Stores the states, the workflow, its transition metas and their
    /// approval metas together; nothing is stored on failure.
    async fn add_workflow_definition(
        &self,
        def: &WorkflowDef,
    ) -> Result<i64, BackendError>;
    async fn get_workflow_by_id(
        &self,
        id: i64,
    ) -> Result<Workflow, BackendError>;
    async fn get_workflow_for_field(
        &self,
        content_type: &str,
        field_name: &str,
    ) -> Result<Option<Workflow>, BackendError>;
    async fn list_workflows(
        &self,
    ) -> Result<Vec<Workflow>, BackendError>;
    async fn list_transition_metas(
        &self,
        workflow_id: i64,
    ) -> Result<Vec<TransitionMeta>, BackendError>;
    async fn list_approval_metas(
        &self,
        workflow_id: i64,
    ) -> Result<Vec<ApprovalMeta>, BackendError>;
}
