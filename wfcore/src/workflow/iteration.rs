//! Iteration bookkeeping for cyclic workflows.
//!
//! Approvals are created in batches.  A batch is the breadth first walk
//! from one state (see `WorkflowGraph::levels_from`), where every edge
//! receives `base + depth`.  The base of a batch is chosen so that every
//! edge in it lands strictly above all earlier iterations of that edge,
//! and strictly above the iteration of the latest approved step entering
//! the start state.  The same rule is applied when the batch is minted
//! live and when iterations are reassessed from history alone, which
//! keeps the two in agreement.

use std::collections::{
    HashMap,
    HashSet,
};
use crate::approval::ApprovalStatus;

/// One approval row reduced to what iteration bookkeeping needs.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub workflow_object_id: i64,
    pub approval_meta_id: i64,
    pub source_state_id: i64,
    pub destination_state_id: i64,
    pub status: ApprovalStatus,
    pub iteration: i64,
}

type Edge = (i64, i64);

#[derive(Debug, Default)]
struct Floors {
    edge_max: HashMap<Edge, i64>,
    entered_max: HashMap<i64, i64>,
}

impl Floors {
    fn record(&mut self, entry: &HistoryEntry, iteration: i64) {
        let edge = (entry.source_state_id, entry.destination_state_id);
        let max = self.edge_max.entry(edge).or_insert(iteration);
        *max = (*max).max(iteration);
        if entry.status == ApprovalStatus::Approved {
            let max = self.entered_max
                .entry(entry.destination_state_id)
                .or_insert(iteration);
            *max = (*max).max(iteration);
        }
    }

    fn base(&self, start_state_id: i64, batch: &[(Edge, i64)]) -> i64 {
        let entered = self.entered_max.get(&start_state_id)
            .map(|i| i + 1)
            .unwrap_or(0);
        batch.iter()
            .filter_map(|(edge, depth)| self.edge_max.get(edge)
                .map(|i| i + 1 - depth))
            .fold(entered, i64::max)
    }
}

impl<'a> FromIterator<&'a HistoryEntry> for Floors {
    fn from_iter<I: IntoIterator<Item = &'a HistoryEntry>>(iter: I) -> Self {
        let mut floors = Floors::default();
        for entry in iter {
            floors.record(entry, entry.iteration);
        }
        floors
    }
}

/// True when the state has been left before and nothing leaving it is
/// still awaiting a decision, meaning re-entering it starts a new cycle.
pub fn has_cycled(history: &[HistoryEntry], state_id: i64) -> bool {
    let mut leaving = history.iter()
        .filter(|e| e.source_state_id == state_id)
        .peekable();
    if leaving.peek().is_none() {
        return false;
    }
    let (mut done, mut pending) = (false, false);
    for entry in leaving {
        match entry.status {
            ApprovalStatus::Approved => done = true,
            ApprovalStatus::Pending => pending = true,
            _ => (),
        }
    }
    done && !pending
}

/// The least base for a batch minted on re-entry of a state through a
/// transition completed at `done_iteration`.
pub fn cycle_iteration(done_iteration: i64) -> i64 {
    done_iteration + 1
}

/// The base for a batch starting at `start_state_id` whose edges sit at
/// the given depths.
pub fn batch_base(
    history: &[HistoryEntry],
    start_state_id: i64,
    batch: &[(Edge, i64)],
) -> i64 {
    history.iter()
        .collect::<Floors>()
        .base(start_state_id, batch)
}

/// The iteration for a fresh chain of a single edge.
pub fn retry_iteration(
    history: &[HistoryEntry],
    source_state_id: i64,
    destination_state_id: i64,
) -> i64 {
    batch_base(
        history,
        source_state_id,
        &[((source_state_id, destination_state_id), 0)],
    )
}

/// Derives iterations for historical rows whose iteration is unknown.
///
/// Rows of each object are taken in id order.  A row opens a new batch
/// when its approval meta already occurs in the current batch or its
/// source state was not reached by it; otherwise it continues the walk,
/// sitting one level below the state it leaves.  The `iteration` field of
/// the input is ignored.  Returns the derived iteration keyed by row id.
pub fn assess(entries: &[HistoryEntry]) -> HashMap<i64, i64> {
    let mut by_object = HashMap::<i64, Vec<&HistoryEntry>>::new();
    for entry in entries {
        by_object.entry(entry.workflow_object_id)
            .or_default()
            .push(entry);
    }
    let mut result = HashMap::with_capacity(entries.len());
    for (_, mut rows) in by_object.into_iter() {
        rows.sort_by_key(|e| e.id);
        assess_object(&rows, &mut result);
    }
    result
}

fn assess_object(rows: &[&HistoryEntry], result: &mut HashMap<i64, i64>) {
    let mut floors = Floors::default();
    let mut batch = Vec::<(&HistoryEntry, i64)>::new();
    let mut metas = HashSet::<i64>::new();
    let mut depths = HashMap::<i64, i64>::new();

    let mut flush = |batch: &mut Vec<(&HistoryEntry, i64)>, floors: &mut Floors| {
        let Some((first, _)) = batch.first() else { return };
        let edges = batch.iter()
            .map(|(e, depth)| ((e.source_state_id, e.destination_state_id), *depth))
            .collect::<Vec<_>>();
        let base = floors.base(first.source_state_id, &edges);
        for (entry, depth) in batch.drain(..) {
            result.insert(entry.id, base + depth);
            floors.record(entry, base + depth);
        }
    };

    for entry in rows.iter() {
        if !batch.is_empty() && (
            metas.contains(&entry.approval_meta_id)
            || !depths.contains_key(&entry.source_state_id)
        ) {
            flush(&mut batch, &mut floors);
        }
        if batch.is_empty() {
            metas.clear();
            depths.clear();
            depths.insert(entry.source_state_id, 0);
        }
        let depth = depths[&entry.source_state_id];
        depths.entry(entry.destination_state_id).or_insert(depth + 1);
        metas.insert(entry.approval_meta_id);
        batch.push((entry, depth));
    }
    flush(&mut batch, &mut floors);
}
