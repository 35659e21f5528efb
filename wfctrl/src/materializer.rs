//! Computes the approvals an object needs as it enters states.
//!
//! Nothing here writes; the resulting `NewApproval`s are handed to the
//! backend as part of a `Commit` (or object creation), where inserting an
//! approval that already exists is a no-op.

use std::collections::HashSet;
use wfcore::{
    approval::{
        Approval,
        ApprovalStatus,
        NewApproval,
    },
    workflow::{
        TransitionMeta,
        WorkflowGraph,
        iteration::{
            self,
            HistoryEntry,
        },
    },
};

/// Reduces the approvals of one object to iteration history, resolving
/// the states of each transition meta through the graph.
pub fn history<'a>(
    graph: &WorkflowGraph,
    approvals: impl IntoIterator<Item = &'a Approval>,
) -> Vec<HistoryEntry> {
    approvals.into_iter()
        .filter_map(|approval| {
            let Some(meta) = graph.transition_meta(approval.transition_meta_id) else {
                log::warn!(
                    "approval {} references transition meta {} outside of workflow {}",
                    approval.id,
                    approval.transition_meta_id,
                    graph.workflow().id,
                );
                return None;
            };
            Some(HistoryEntry {
                id: approval.id,
                workflow_object_id: approval.workflow_object_id,
                approval_meta_id: approval.approval_meta_id,
                source_state_id: meta.source_state_id,
                destination_state_id: meta.destination_state_id,
                status: approval.status,
                iteration: approval.iteration,
            })
        })
        .collect()
}

fn steps_of<'a>(
    graph: &'a WorkflowGraph,
    meta: &'a TransitionMeta,
    iteration: i64,
) -> impl Iterator<Item = NewApproval> + 'a {
    graph.approval_metas_of(meta.id)
        .iter()
        .map(move |step| NewApproval {
            transition_meta_id: meta.id,
            approval_meta_id: step.id,
            iteration,
        })
}

fn batch(
    graph: &WorkflowGraph,
    history: &[HistoryEntry],
    state_id: i64,
    base: i64,
) -> Vec<NewApproval> {
    let existing = history.iter()
        .map(|entry| (entry.approval_meta_id, entry.iteration))
        .collect::<HashSet<_>>();
    graph.levels_from(state_id, base)
        .into_iter()
        .flat_map(|(meta, level)| steps_of(graph, meta, level))
        .filter(|new| !existing.contains(&(new.approval_meta_id, new.iteration)))
        .collect()
}

/// Approvals for a freshly registered object: the whole graph reachable
/// from the initial state, each edge at its depth.
pub fn initial(graph: &WorkflowGraph) -> Vec<NewApproval> {
    batch(graph, &[], graph.initial_state().id, 0)
}

/// Approvals for an object that just entered `state_id` by completing a
/// transition at `done_iteration`.
///
/// Nothing is minted while an approval leaving the state is still
/// pending, as the batch that reached the state already covers it.
/// Otherwise (typically the state was left before, so the object went
/// around a cycle) a new batch is walked from the state.
pub fn on_entry(
    graph: &WorkflowGraph,
    history: &[HistoryEntry],
    state_id: i64,
    done_iteration: i64,
) -> Vec<NewApproval> {
    if graph.is_final(state_id) {
        return Vec::new();
    }
    let pending = history.iter()
        .any(|entry| entry.source_state_id == state_id
            && entry.status == ApprovalStatus::Pending);
    if pending {
        return Vec::new();
    }
    if iteration::has_cycled(history, state_id) {
        log::debug!("state {state_id} re-entered after completing a cycle");
    }
    let depths = graph.levels_from(state_id, 0)
        .into_iter()
        .map(|(meta, depth)| ((meta.source_state_id, meta.destination_state_id), depth))
        .collect::<Vec<_>>();
    let base = iteration::cycle_iteration(done_iteration)
        .max(iteration::batch_base(history, state_id, &depths));
    log::trace!("minting batch from state {state_id} at base {base}");
    batch(graph, history, state_id, base)
}

/// A fresh chain for one transition meta, above everything it has seen.
pub fn retry(
    graph: &WorkflowGraph,
    history: &[HistoryEntry],
    meta: &TransitionMeta,
) -> Vec<NewApproval> {
    let iteration = iteration::retry_iteration(
        history,
        meta.source_state_id,
        meta.destination_state_id,
    );
    steps_of(graph, meta, iteration).collect()
}

#[cfg(test)]
mod tests {
    use test_wf::fixtures;
    use crate::testing::graph;
    use super::*;

    fn pairs(approvals: &[NewApproval]) -> Vec<(i64, i64)> {
        approvals.iter()
            .map(|a| (a.approval_meta_id, a.iteration))
            .collect()
    }

    fn entry(
        id: i64,
        new: &NewApproval,
        graph: &WorkflowGraph,
        status: ApprovalStatus,
    ) -> HistoryEntry {
        let meta = graph.transition_meta(new.transition_meta_id).expect("meta");
        HistoryEntry {
            id,
            workflow_object_id: 1,
            approval_meta_id: new.approval_meta_id,
            source_state_id: meta.source_state_id,
            destination_state_id: meta.destination_state_id,
            status,
            iteration: new.iteration,
        }
    }

    #[test]
    fn initial_branching() {
        let g = graph(&fixtures::branching());
        assert_eq!(pairs(&initial(&g)), [(1, 0), (2, 1), (3, 1), (4, 1)]);
    }

    #[test]
    fn initial_cycle_with_tributary() {
        let g = graph(&fixtures::cycle_with_tributary());
        assert_eq!(
            pairs(&initial(&g)),
            [(1, 0), (2, 1), (3, 1), (4, 2), (5, 2)],
        );
    }

    #[test]
    fn on_entry_waits_for_pending() {
        let g = graph(&fixtures::branching());
        let minted = initial(&g);
        let history = minted.iter()
            .enumerate()
            .map(|(n, new)| entry(n as i64 + 1, new, &g, if n == 0 {
                ApprovalStatus::Approved
            } else {
                ApprovalStatus::Pending
            }))
            .collect::<Vec<_>>();
        assert!(on_entry(&g, &history, 2, 0).is_empty());
        // final states never mint
        assert!(on_entry(&g, &history, 3, 1).is_empty());
    }

    #[test]
    fn on_entry_after_cycle() {
        let g = graph(&fixtures::cycle_with_tributary());
        let minted = initial(&g);
        // everything in the loop approved, the tributary cancelled
        let history = minted.iter()
            .enumerate()
            .map(|(n, new)| entry(n as i64 + 1, new, &g, if new.approval_meta_id == 5 {
                ApprovalStatus::Cancelled
            } else {
                ApprovalStatus::Approved
            }))
            .collect::<Vec<_>>();
        assert_eq!(
            pairs(&on_entry(&g, &history, 1, 2)),
            [(1, 3), (2, 4), (3, 4), (4, 5), (5, 5)],
        );
        // repeated invocation against the same history is stable, and
        // once minted nothing new is produced
        let again = on_entry(&g, &history, 1, 2);
        assert_eq!(pairs(&again), pairs(&on_entry(&g, &history, 1, 2)));
        let mut history = history;
        history.extend(again.iter()
            .enumerate()
            .map(|(n, new)| entry(10 + n as i64, new, &g, ApprovalStatus::Pending)));
        assert!(on_entry(&g, &history, 1, 2).is_empty());
    }

    #[test]
    fn retry_above_rejected() {
        let g = graph(&fixtures::self_loop());
        let minted = initial(&g);
        assert_eq!(pairs(&minted), [(1, 0), (2, 0)]);
        let history = vec![
            entry(1, &minted[0], &g, ApprovalStatus::Pending),
            entry(2, &minted[1], &g, ApprovalStatus::Rejected),
        ];
        let meta = g.transition_meta(2).expect("meta");
        assert_eq!(pairs(&retry(&g, &history, meta)), [(2, 1)]);
    }

    #[test]
    fn history_skips_foreign() {
        let g = graph(&fixtures::self_loop());
        let approval = |id, transition_meta_id| Approval {
            id,
            workflow_id: 1,
            workflow_object_id: 1,
            approval_meta_id: 1,
            transition_id: 1,
            transition_meta_id,
            iteration: 0,
            status: ApprovalStatus::Pending,
            transactioner: None,
            transaction_ts: None,
            previous_id: None,
        };
        let approvals = [approval(1, 1), approval(2, 9)];
        let entries = history(&g, approvals.iter());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_state_id, 1);
        assert_eq!(entries[0].destination_state_id, 1);
    }
}
