//! Plans approve and reject requests for one workflow object.
//!
//! Planning is pure: it reads the graph and the object's approvals and
//! produces a `Commit`, which the backend applies atomically against the
//! object version the plan was made from.

use std::collections::{
    BTreeMap,
    HashSet,
};
use wfcore::{
    ac::{
        Principal,
        traits::Authority,
    },
    approval::{
        Approval,
        ApprovalStatus,
        ApprovalUpdate,
        Approvals,
        Commit,
        NewApproval,
        WorkflowObject,
    },
    error::AuthorityError,
    workflow::{
        ApprovalMeta,
        TransitionMeta,
        WorkflowGraph,
    },
};

use crate::{
    error::{
        Error,
        PermissionError,
    },
    materializer,
    policy::{
        BranchPolicy,
        RejectionPolicy,
    },
};

/// Where the approval chain of one transition leaving the current state
/// stands.  Only the latest iteration of the chain is considered.
#[derive(Clone, Debug, PartialEq)]
pub enum Progress<'a> {
    /// No approvals exist for the transition.
    Idle,
    /// `step` is the lowest priority pending approval; `remaining` counts
    /// the pending approvals including it.
    Awaiting {
        iteration: i64,
        step: &'a Approval,
        remaining: usize,
    },
    Complete {
        iteration: i64,
    },
    /// A step was rejected or cancelled.
    Halted {
        iteration: i64,
        status: ApprovalStatus,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeProgress<'a> {
    pub transition_meta: &'a TransitionMeta,
    pub progress: Progress<'a>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObjectStatus {
    /// At least one transition awaits approval.
    Active,
    /// Nothing leaving the current state can be approved.
    Blocked,
    /// The current state has no outgoing transitions.
    Final,
}

/// Whether the principal may grant the step.  A step naming neither
/// permissions nor users is open to every authenticated principal.
pub fn authorized(
    authority: &dyn Authority,
    principal: &Principal,
    meta: &ApprovalMeta,
) -> Result<bool, AuthorityError> {
    if matches!(principal, Principal::Anonymous) {
        return Ok(false);
    }
    if meta.permissions.is_empty() && meta.users.is_empty() {
        return Ok(true);
    }
    if meta.users.iter().any(|user_id| authority.principal_is(principal, *user_id)) {
        return Ok(true);
    }
    for permission in meta.permissions.iter() {
        if authority.principal_has_permission(principal, permission)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The approvals of one object read against its workflow graph.
pub struct Plan<'a> {
    pub graph: &'a WorkflowGraph,
    pub object: &'a WorkflowObject,
    pub approvals: &'a Approvals,
}

struct Candidate<'a> {
    meta: &'a TransitionMeta,
    iteration: i64,
    step: &'a Approval,
    remaining: usize,
}

impl<'a> Plan<'a> {
    pub fn new(
        graph: &'a WorkflowGraph,
        object: &'a WorkflowObject,
        approvals: &'a Approvals,
    ) -> Self {
        Self { graph, object, approvals }
    }

    fn priority(&self, approval: &Approval) -> i64 {
        self.graph.approval_meta(approval.approval_meta_id)
            .map(|meta| meta.priority)
            .unwrap_or(i64::MAX)
    }

    fn chain_progress(&self, meta: &TransitionMeta) -> Progress<'a> {
        let approvals: &'a Approvals = self.approvals;
        let Some((iteration, mut chain)) = approvals.latest_chain(meta.id) else {
            return Progress::Idle;
        };
        chain.sort_by_key(|a| (self.priority(a), a.id));
        let halted = [ApprovalStatus::Rejected, ApprovalStatus::Cancelled]
            .into_iter()
            .find(|status| chain.iter().any(|a| a.status == *status));
        if let Some(status) = halted {
            return Progress::Halted { iteration, status };
        }
        let mut pending = chain.into_iter()
            .filter(|a| a.status == ApprovalStatus::Pending);
        match pending.next() {
            None => Progress::Complete { iteration },
            Some(step) => Progress::Awaiting {
                iteration,
                step,
                remaining: 1 + pending.count(),
            },
        }
    }

    /// Progress of every transition leaving the current state, ordered by
    /// transition meta id.
    pub fn progress(&self) -> Vec<EdgeProgress<'a>> {
        let graph: &'a WorkflowGraph = self.graph;
        graph.transitions_from(self.object.state_id)
            .map(|transition_meta| EdgeProgress {
                transition_meta,
                progress: self.chain_progress(transition_meta),
            })
            .collect()
    }

    /// The step awaiting approval on each transition leaving the current
    /// state, regardless of who may grant it.
    pub fn next_approvals(&self) -> Vec<&'a Approval> {
        self.progress()
            .into_iter()
            .filter_map(|edge| match edge.progress {
                Progress::Awaiting { step, .. } => Some(step),
                _ => None,
            })
            .collect()
    }

    /// The most recently granted approval of the object.
    pub fn recent_approval(&self) -> Option<&'a Approval> {
        let approvals: &'a Approvals = self.approvals;
        approvals.iter()
            .filter(|a| a.status == ApprovalStatus::Approved)
            .max_by_key(|a| (a.transaction_ts, a.id))
    }

    pub fn status(&self) -> ObjectStatus {
        if self.graph.is_final(self.object.state_id) {
            ObjectStatus::Final
        } else if self.next_approvals().is_empty() {
            ObjectStatus::Blocked
        } else {
            ObjectStatus::Active
        }
    }

    fn candidates(
        &self,
        authority: &dyn Authority,
        principal: &Principal,
    ) -> Result<Vec<Candidate<'a>>, AuthorityError> {
        let mut result = Vec::new();
        for edge in self.progress() {
            let Progress::Awaiting { iteration, step, remaining } = edge.progress else {
                continue;
            };
            let Some(meta) = self.graph.approval_meta(step.approval_meta_id) else {
                continue;
            };
            if authorized(authority, principal, meta)? {
                result.push(Candidate {
                    meta: edge.transition_meta,
                    iteration,
                    step,
                    remaining,
                });
            }
        }
        Ok(result)
    }

    /// Steps the principal may act on right now.
    pub fn available_approvals(
        &self,
        authority: &dyn Authority,
        principal: &Principal,
    ) -> Result<Vec<&'a Approval>, AuthorityError> {
        Ok(self.candidates(authority, principal)?
            .into_iter()
            .map(|candidate| candidate.step)
            .collect())
    }

    /// Destination state ids the principal may move the object towards.
    pub fn available_states(
        &self,
        authority: &dyn Authority,
        principal: &Principal,
    ) -> Result<Vec<i64>, AuthorityError> {
        Ok(self.candidates(authority, principal)?
            .into_iter()
            .map(|candidate| candidate.meta.destination_state_id)
            .collect())
    }

    fn select(
        &self,
        authority: &dyn Authority,
        principal: &Principal,
        next_state: Option<i64>,
        branch_policy: BranchPolicy,
    ) -> Result<Candidate<'a>, Error> {
        if matches!(principal, Principal::Anonymous) {
            Err(PermissionError::Anonymous)?
        }
        let candidates = self.candidates(authority, principal)?;
        if candidates.is_empty() {
            Err(PermissionError::NoAvailableApproval(principal.to_string()))?
        }
        let available = candidates.iter()
            .map(|c| c.meta.destination_state_id)
            .collect::<Vec<_>>();
        let mut candidates = match next_state {
            Some(state_id) => {
                let matched = candidates.into_iter()
                    .filter(|c| c.meta.destination_state_id == state_id)
                    .collect::<Vec<_>>();
                if matched.is_empty() {
                    return Err(Error::InvalidNextState { state_id, available });
                }
                matched
            }
            None if candidates.len() > 1 && branch_policy == BranchPolicy::Explicit => {
                return Err(Error::AmbiguousTransition {
                    state_id: self.object.state_id,
                    candidates: available,
                });
            }
            None => candidates,
        };
        Ok(candidates.remove(0))
    }

    fn update(
        &self,
        approval: &Approval,
        status: ApprovalStatus,
        principal: &Principal,
        timestamp: i64,
    ) -> ApprovalUpdate {
        ApprovalUpdate {
            id: approval.id,
            expected: approval.status,
            status,
            transactioner: principal.user_id(),
            transaction_ts: Some(timestamp),
            previous_id: self.recent_approval().map(|a| a.id),
        }
    }

    fn cancel(approval: &Approval) -> ApprovalUpdate {
        ApprovalUpdate {
            id: approval.id,
            expected: ApprovalStatus::Pending,
            status: ApprovalStatus::Cancelled,
            transactioner: approval.transactioner,
            transaction_ts: approval.transaction_ts,
            previous_id: approval.previous_id,
        }
    }

    fn pending_at(&self, meta_id: i64, iteration: i64) -> impl Iterator<Item = &'a Approval> {
        let approvals: &'a Approvals = self.approvals;
        approvals.iter()
            .filter(move |a| a.transition_meta_id == meta_id
                && a.iteration == iteration
                && a.status == ApprovalStatus::Pending)
    }

    /// Pending approvals that can no longer be reached once the object
    /// moves along `chosen`: the other transitions leaving the current
    /// state, and what only their destinations lead on to.
    fn impossible_future(&self, chosen: &Candidate<'a>) -> Vec<&'a Approval> {
        let graph: &'a WorkflowGraph = self.graph;
        let reachable = graph.levels_from(
            chosen.meta.destination_state_id,
            chosen.iteration + 1,
        )
            .into_iter()
            .flat_map(|(meta, level)| self.pending_at(meta.id, level))
            .map(|a| a.id)
            .collect::<HashSet<_>>();
        let mut result = Vec::new();
        for sibling in graph.transitions_from(self.object.state_id) {
            if sibling.id == chosen.meta.id {
                continue;
            }
            let Some((iteration, chain)) = self.approvals.latest_chain(sibling.id) else {
                continue;
            };
            result.extend(chain.into_iter()
                .filter(|a| a.status == ApprovalStatus::Pending));
            if sibling.destination_state_id == chosen.meta.destination_state_id {
                continue;
            }
            result.extend(graph.levels_from(sibling.destination_state_id, iteration + 1)
                .into_iter()
                .flat_map(|(meta, level)| self.pending_at(meta.id, level))
                .filter(|a| !reachable.contains(&a.id)));
        }
        result
    }

    /// Plans granting the awaiting step of a transition the principal is
    /// authorized for.  Granting the last step also moves the object.
    pub fn approve(
        &self,
        authority: &dyn Authority,
        principal: &Principal,
        next_state: Option<i64>,
        branch_policy: BranchPolicy,
        timestamp: i64,
    ) -> Result<Commit, Error> {
        let chosen = self.select(authority, principal, next_state, branch_policy)?;
        let mut updates = BTreeMap::new();
        updates.insert(
            chosen.step.id,
            self.update(chosen.step, ApprovalStatus::Approved, principal, timestamp),
        );
        log::debug!(
            "{principal} approves step {} of transition meta {} at iteration {}",
            chosen.step.approval_meta_id,
            chosen.meta.id,
            chosen.iteration,
        );
        let mut commit = Commit {
            workflow_id: self.object.workflow_id,
            workflow_object_id: self.object.id,
            expected_version: self.object.version,
            .. Default::default()
        };

        if chosen.remaining == 1 {
            for approval in self.impossible_future(&chosen) {
                updates.entry(approval.id)
                    .or_insert_with(|| Self::cancel(approval));
            }
            let destination = chosen.meta.destination_state_id;
            let mut approvals = self.approvals.clone();
            approvals.apply(&updates.values().cloned().collect::<Vec<_>>());
            let history = materializer::history(self.graph, approvals.iter());
            let materialize = materializer::on_entry(
                self.graph,
                &history,
                destination,
                chosen.iteration,
            );
            // earlier chains of the transitions just minted are superseded
            for new in materialize.iter() {
                for approval in approvals.iter().filter(|a| {
                    a.approval_meta_id == new.approval_meta_id
                        && a.iteration < new.iteration
                        && a.status == ApprovalStatus::Pending
                }) {
                    updates.entry(approval.id)
                        .or_insert_with(|| Self::cancel(approval));
                }
            }
            log::info!(
                "workflow object {} moves from state {} to {destination}, minting {} approval(s)",
                self.object.id,
                self.object.state_id,
                materialize.len(),
            );
            commit.state_id = Some(destination);
            commit.materialize = materialize;
        }
        commit.updates = updates.into_values().collect();
        Ok(commit)
    }

    /// Plans rejecting the awaiting step of a transition the principal is
    /// authorized for.  The rest of that chain is cancelled; with
    /// `RejectionPolicy::Retry` a fresh chain is minted for the transition.
    pub fn reject(
        &self,
        authority: &dyn Authority,
        principal: &Principal,
        next_state: Option<i64>,
        branch_policy: BranchPolicy,
        rejection_policy: RejectionPolicy,
        timestamp: i64,
    ) -> Result<Commit, Error> {
        let chosen = self.select(authority, principal, next_state, branch_policy)?;
        let mut updates = vec![
            self.update(chosen.step, ApprovalStatus::Rejected, principal, timestamp),
        ];
        updates.extend(self.pending_at(chosen.meta.id, chosen.iteration)
            .filter(|a| a.id != chosen.step.id)
            .map(Self::cancel));
        log::debug!(
            "{principal} rejects step {} of transition meta {} at iteration {}",
            chosen.step.approval_meta_id,
            chosen.meta.id,
            chosen.iteration,
        );
        let materialize: Vec<NewApproval> = match rejection_policy {
            RejectionPolicy::Block => Vec::new(),
            RejectionPolicy::Retry => {
                let mut approvals = self.approvals.clone();
                approvals.apply(&updates);
                let history = materializer::history(self.graph, approvals.iter());
                materializer::retry(self.graph, &history, chosen.meta)
            }
        };
        Ok(Commit {
            workflow_id: self.object.workflow_id,
            workflow_object_id: self.object.id,
            expected_version: self.object.version,
            state_id: None,
            updates,
            materialize,
        })
    }
}
