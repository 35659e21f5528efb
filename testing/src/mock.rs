use async_trait::async_trait;
use mockall::mock;
use wfcore::{
    approval::{
        ApprovalStatus,
        Approvals,
        Commit,
        NewApproval,
        Transition,
        WorkflowObject,
        traits::WorkflowObjectBackend,
    },
    error::BackendError,
    platform::{
        DefaultWFPlatform,
        PlatformUrl,
    },
    state::{
        State,
        States,
        traits::StateBackend,
    },
    workflow::{
        ApprovalMeta,
        TransitionMeta,
        Workflow,
        WorkflowDef,
        traits::WorkflowBackend,
    },
};

mock! {
    pub Platform {}

    #[async_trait]
    impl StateBackend for Platform {
        async fn ensure_state(
            &self,
            label: &str,
            description: &str,
        ) -> Result<i64, BackendError>;
        async fn get_state_by_id(
            &self,
            id: i64,
        ) -> Result<State, BackendError>;
        async fn get_state_by_label(
            &self,
            label: &str,
        ) -> Result<Option<State>, BackendError>;
        async fn list_states(
            &self,
        ) -> Result<States, BackendError>;
    }

    #[async_trait]
    impl WorkflowBackend for Platform {
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

    #[async_trait]
    impl WorkflowObjectBackend for Platform {
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
        async fn list_approvals(
            &self,
            workflow_object_id: i64,
        ) -> Result<Approvals, BackendError>;
        async fn list_approvals_by_status(
            &self,
            workflow_id: i64,
            status: ApprovalStatus,
        ) -> Result<Approvals, BackendError>;
        async fn apply_commit(
            &self,
            commit: &Commit,
        ) -> Result<WorkflowObject, BackendError>;
    }
}

impl PlatformUrl for MockPlatform {
    fn url(&self) -> &str {
        "mock://"
    }
}

impl DefaultWFPlatform for MockPlatform {}
