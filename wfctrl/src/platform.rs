use futures::future;
use std::{
    collections::{
        BTreeSet,
        HashSet,
    },
    sync::Arc,
};
use wfcore::{
    ac::{
        Principal,
        traits::Authority,
    },
    approval::ApprovalStatus,
    error::ConfigurationError,
    platform::WFPlatform,
    workflow::{
        Workflow,
        WorkflowDef,
        WorkflowGraph,
    },
};

use crate::{
    error::Error,
    handle::WorkflowObjectCtrl,
    materializer,
    policy::{
        BranchPolicy,
        RejectionPolicy,
    },
    registry::GraphRegistry,
};

mod builder;

pub use builder::Builder;

pub struct Platform {
    wf_platform: Arc<dyn WFPlatform>,
    authority: Arc<dyn Authority>,
    branch_policy: BranchPolicy,
    rejection_policy: RejectionPolicy,
    graphs: GraphRegistry,
}

impl Platform {
    pub fn wf_platform(&self) -> &dyn WFPlatform {
        self.wf_platform.as_ref()
    }

    pub fn authority(&self) -> &dyn Authority {
        self.authority.as_ref()
    }

    pub fn branch_policy(&self) -> BranchPolicy {
        self.branch_policy
    }

    pub fn rejection_policy(&self) -> RejectionPolicy {
        self.rejection_policy
    }
}

// Workflow definitions.
impl Platform {
    /// Validates and persists the definition, returning the new workflow
    /// id.  A field may only carry one workflow.
    pub async fn register_workflow(
        &self,
        def: &WorkflowDef,
    ) -> Result<i64, Error> {
        def.validate()?;
        if self.wf_platform
            .get_workflow_for_field(&def.content_type, &def.field_name)
            .await?
            .is_some()
        {
            Err(ConfigurationError::DuplicateWorkflow(
                def.content_type.clone(),
                def.field_name.clone(),
            ))?
        }

        let workflow_id = self.wf_platform.add_workflow_definition(def).await?;
        log::info!(
            "registered workflow {workflow_id} for {}.{} with {} transition(s)",
            def.content_type,
            def.field_name,
            def.transitions.len(),
        );
        self.get_graph(workflow_id).await?;
        Ok(workflow_id)
    }

    pub async fn list_workflows(&self) -> Result<Vec<Workflow>, Error> {
        Ok(self.wf_platform.list_workflows().await?)
    }

    /// The graph of the workflow, loaded once and shared afterwards.
    pub async fn get_graph(
        &self,
        workflow_id: i64,
    ) -> Result<Arc<WorkflowGraph>, Error> {
        if let Some(graph) = self.graphs.get(workflow_id) {
            return Ok(graph);
        }
        let workflow = self.wf_platform.get_workflow_by_id(workflow_id).await?;
        let transition_metas = self.wf_platform
            .list_transition_metas(workflow_id)
            .await?;
        let approval_metas = self.wf_platform
            .list_approval_metas(workflow_id)
            .await?;
        let used = transition_metas.iter()
            .flat_map(|meta| [meta.source_state_id, meta.destination_state_id])
            .chain([workflow.initial_state_id])
            .collect::<HashSet<_>>();
        let states = self.wf_platform.list_states()
            .await?
            .into_iter()
            .filter(|state| used.contains(&state.id))
            .collect::<Vec<_>>();
        let graph = WorkflowGraph::new(
            workflow,
            states.into(),
            transition_metas,
            approval_metas,
        )?;
        log::debug!("loaded graph for workflow {workflow_id}");
        let graph = self.graphs.insert(graph);
        log::trace!("{} graph(s) loaded", self.graphs.len());
        Ok(graph)
    }

    pub async fn get_graph_for_field(
        &self,
        content_type: &str,
        field_name: &str,
    ) -> Result<Arc<WorkflowGraph>, Error> {
        let workflow = self.wf_platform
            .get_workflow_for_field(content_type, field_name)
            .await?
            .ok_or_else(|| Error::UnknownWorkflow(
                content_type.to_string(),
                field_name.to_string(),
            ))?;
        self.get_graph(workflow.id).await
    }
}

// Workflow objects.
impl Platform {
    /// Attaches the object to the workflow in its initial state, with the
    /// approvals for everything reachable from it.  Registering an object
    /// twice returns the existing one.
    pub async fn register_object<'p>(
        &'p self,
        workflow_id: i64,
        object_id: &str,
    ) -> Result<WorkflowObjectCtrl<'p>, Error> {
        let graph = self.get_graph(workflow_id).await?;
        let materialize = materializer::initial(&graph);
        let object = self.wf_platform.create_workflow_object(
            workflow_id,
            object_id,
            graph.initial_state().id,
            &materialize,
        ).await?;
        log::debug!(
            "object {object_id} registered with workflow {workflow_id} as {}",
            object.id,
        );
        WorkflowObjectCtrl::load(self, graph, object).await
    }

    pub async fn get_object<'p>(
        &'p self,
        workflow_id: i64,
        object_id: &str,
    ) -> Result<WorkflowObjectCtrl<'p>, Error> {
        let object = self.wf_platform
            .get_workflow_object(workflow_id, object_id)
            .await?
            .ok_or_else(|| Error::UnknownObject(workflow_id, object_id.to_string()))?;
        let graph = self.get_graph(workflow_id).await?;
        WorkflowObjectCtrl::load(self, graph, object).await
    }

    pub async fn get_object_by_id<'p>(
        &'p self,
        id: i64,
    ) -> Result<WorkflowObjectCtrl<'p>, Error> {
        let object = self.wf_platform.get_workflow_object_by_id(id).await?;
        let graph = self.get_graph(object.workflow_id).await?;
        WorkflowObjectCtrl::load(self, graph, object).await
    }

    /// Objects of the workflow with an approval the principal may act on.
    pub async fn get_on_approval_objects<'p>(
        &'p self,
        workflow_id: i64,
        principal: &Principal,
    ) -> Result<Vec<WorkflowObjectCtrl<'p>>, Error> {
        let pending = self.wf_platform
            .list_approvals_by_status(workflow_id, ApprovalStatus::Pending)
            .await?;
        let ids = pending.iter()
            .map(|approval| approval.workflow_object_id)
            .collect::<BTreeSet<_>>();
        let ctrls = future::try_join_all(
            ids.into_iter().map(|id| self.get_object_by_id(id))
        ).await?;
        let mut result = Vec::new();
        for ctrl in ctrls.into_iter() {
            if !ctrl.available_approvals(principal)?.is_empty() {
                result.push(ctrl);
            }
        }
        Ok(result)
    }
}
