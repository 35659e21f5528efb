use std::sync::Arc;
use wfcore::{
    ac::Principal,
    approval::{
        Approval,
        Approvals,
        Commit,
        Transition,
        WorkflowObject,
    },
    state::State,
    workflow::WorkflowGraph,
};

use crate::{
    chrono::Utc,
    error::Error,
    executor::{
        EdgeProgress,
        ObjectStatus,
        Plan,
    },
    handle::WorkflowObjectCtrl,
    platform::Platform,
};

impl<'p> WorkflowObjectCtrl<'p> {
    pub(crate) async fn load(
        platform: &'p Platform,
        graph: Arc<WorkflowGraph>,
        object: WorkflowObject,
    ) -> Result<Self, Error> {
        let approvals = platform.wf_platform()
            .list_approvals(object.id)
            .await?;
        Ok(Self { platform, graph, object, approvals })
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn object(&self) -> &WorkflowObject {
        &self.object
    }

    pub fn approvals(&self) -> &Approvals {
        &self.approvals
    }

    pub fn state(&self) -> Option<&State> {
        self.graph.state(self.object.state_id)
    }

    /// Resolves a state label of this object's workflow.
    pub fn state_id(&self, label: &str) -> Result<i64, Error> {
        self.graph.state_by_label(label)
            .map(|state| state.id)
            .ok_or_else(|| Error::UnknownState(label.to_string()))
    }

    fn plan(&self) -> Plan<'_> {
        Plan::new(&self.graph, &self.object, &self.approvals)
    }

    /// Rereads the object and its approvals.
    pub async fn refresh(&mut self) -> Result<(), Error> {
        let wf_platform = self.platform.wf_platform();
        self.object = wf_platform.get_workflow_object_by_id(self.object.id).await?;
        self.approvals = wf_platform.list_approvals(self.object.id).await?;
        Ok(())
    }

    async fn commit(&mut self, commit: Commit) -> Result<(), Error> {
        let wf_platform = self.platform.wf_platform();
        self.object = wf_platform.apply_commit(&commit).await?;
        self.approvals = wf_platform.list_approvals(self.object.id).await?;
        Ok(())
    }

    /// Grants the awaiting step the principal is authorized for, moving
    /// the object to `next_state` when it was the last step.  The next
    /// state is required whenever more than one transition could be
    /// advanced, unless the platform was built with
    /// `BranchPolicy::FirstAvailable`.
    pub async fn approve(
        &mut self,
        principal: &Principal,
        next_state: Option<i64>,
    ) -> Result<(), Error> {
        let commit = self.plan().approve(
            self.platform.authority(),
            principal,
            next_state,
            self.platform.branch_policy(),
            Utc::now().timestamp(),
        )?;
        let from = self.object.state_id;
        self.commit(commit).await?;
        if from != self.object.state_id {
            log::info!(
                "{principal} moved object {} from state {from} to {}",
                self.object.object_id,
                self.object.state_id,
            );
        }
        Ok(())
    }

    /// Rejects the awaiting step the principal is authorized for.
    pub async fn reject(
        &mut self,
        principal: &Principal,
        next_state: Option<i64>,
    ) -> Result<(), Error> {
        let commit = self.plan().reject(
            self.platform.authority(),
            principal,
            next_state,
            self.platform.branch_policy(),
            self.platform.rejection_policy(),
            Utc::now().timestamp(),
        )?;
        self.commit(commit).await?;
        log::info!(
            "{principal} rejected a transition of object {}",
            self.object.object_id,
        );
        Ok(())
    }

    pub fn progress(&self) -> Vec<EdgeProgress<'_>> {
        self.plan().progress()
    }

    pub fn available_approvals(
        &self,
        principal: &Principal,
    ) -> Result<Vec<&Approval>, Error> {
        Ok(self.plan().available_approvals(self.platform.authority(), principal)?)
    }

    pub fn available_states(
        &self,
        principal: &Principal,
    ) -> Result<Vec<&State>, Error> {
        Ok(self.plan()
            .available_states(self.platform.authority(), principal)?
            .into_iter()
            .filter_map(|id| self.graph.state(id))
            .collect())
    }

    pub fn next_approvals(&self) -> Vec<&Approval> {
        self.plan().next_approvals()
    }

    pub fn recent_approval(&self) -> Option<&Approval> {
        self.plan().recent_approval()
    }

    pub fn is_initial(&self) -> bool {
        self.graph.initial_state().id == self.object.state_id
    }

    pub fn is_final(&self) -> bool {
        self.graph.is_final(self.object.state_id)
    }

    pub fn status(&self) -> ObjectStatus {
        self.plan().status()
    }

    pub async fn transitions(&self) -> Result<Vec<Transition>, Error> {
        Ok(self.platform.wf_platform()
            .list_transitions(self.object.id)
            .await?)
    }
}
