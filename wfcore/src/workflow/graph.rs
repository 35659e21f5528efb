use std::collections::{
    HashMap,
    HashSet,
};
use crate::{
    error::ConfigurationError,
    state::{
        State,
        States,
    },
};
use super::{
    ApprovalMeta,
    TransitionMeta,
    Workflow,
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StateIx(usize);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EdgeIx(usize);

/// Arena representation of a registered workflow.
///
/// States and edges are stored in flat vectors and addressed by index;
/// the adjacency lists hold edge indices ordered by transition meta id,
/// and the approval steps of every edge are ordered by priority.
#[derive(Clone, Debug)]
pub struct WorkflowGraph {
    workflow: Workflow,
    states: Vec<State>,
    state_ix: HashMap<i64, StateIx>,
    edges: Vec<TransitionMeta>,
    edge_ix: HashMap<i64, EdgeIx>,
    outgoing: Vec<Vec<EdgeIx>>,
    incoming: Vec<Vec<EdgeIx>>,
    steps: Vec<Vec<ApprovalMeta>>,
    initial: StateIx,
}

impl WorkflowGraph {
    pub fn new(
        workflow: Workflow,
        states: States,
        mut transition_metas: Vec<TransitionMeta>,
        mut approval_metas: Vec<ApprovalMeta>,
    ) -> Result<Self, ConfigurationError> {
        let states = states.into_iter().collect::<Vec<_>>();
        let state_ix = states.iter()
            .enumerate()
            .map(|(n, state)| (state.id, StateIx(n)))
            .collect::<HashMap<_, _>>();
        let lookup = |id: i64| state_ix.get(&id)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownState(id.to_string()));
        let initial = lookup(workflow.initial_state_id)?;

        transition_metas.sort_by_key(|meta| meta.id);
        let mut outgoing = vec![Vec::new(); states.len()];
        let mut incoming = vec![Vec::new(); states.len()];
        let mut edge_ix = HashMap::new();
        for (n, meta) in transition_metas.iter().enumerate() {
            if meta.workflow_id != workflow.id {
                return Err(ConfigurationError::ForeignTransitionMeta {
                    workflow_id: workflow.id,
                    transition_meta_id: meta.id,
                });
            }
            let source = lookup(meta.source_state_id)?;
            let destination = lookup(meta.destination_state_id)?;
            outgoing[source.0].push(EdgeIx(n));
            incoming[destination.0].push(EdgeIx(n));
            edge_ix.insert(meta.id, EdgeIx(n));
        }

        approval_metas.sort_by_key(|meta| (meta.transition_meta_id, meta.priority));
        let mut steps = vec![Vec::<ApprovalMeta>::new(); transition_metas.len()];
        for meta in approval_metas.into_iter() {
            let ix = match edge_ix.get(&meta.transition_meta_id) {
                Some(ix) if meta.workflow_id == workflow.id => *ix,
                _ => return Err(ConfigurationError::ForeignApprovalMeta {
                    workflow_id: workflow.id,
                    approval_meta_id: meta.id,
                    transition_meta_id: meta.transition_meta_id,
                }),
            };
            if steps[ix.0].last().map(|last| last.priority) == Some(meta.priority) {
                let edge = &transition_metas[ix.0];
                return Err(ConfigurationError::DuplicatePriority {
                    from: states[state_ix[&edge.source_state_id].0].label.clone(),
                    to: states[state_ix[&edge.destination_state_id].0].label.clone(),
                    priority: meta.priority,
                });
            }
            steps[ix.0].push(meta);
        }

        Ok(Self {
            workflow,
            states,
            state_ix,
            edges: transition_metas,
            edge_ix,
            outgoing,
            incoming,
            steps,
            initial,
        })
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn initial_state(&self) -> &State {
        &self.states[self.initial.0]
    }

    pub fn state(&self, id: i64) -> Option<&State> {
        self.state_ix.get(&id).map(|ix| &self.states[ix.0])
    }

    pub fn state_by_label(&self, label: &str) -> Option<&State> {
        self.states.iter().find(|state| state.label == label)
    }

    /// A state without outgoing transitions.
    pub fn is_final(&self, state_id: i64) -> bool {
        self.state_ix.get(&state_id)
            .map(|ix| self.outgoing[ix.0].is_empty())
            .unwrap_or(false)
    }

    pub fn transition_meta(&self, id: i64) -> Option<&TransitionMeta> {
        self.edge_ix.get(&id).map(|ix| &self.edges[ix.0])
    }

    pub fn transition_metas(&self) -> &[TransitionMeta] {
        &self.edges
    }

    pub fn transition_meta_between(
        &self,
        source_state_id: i64,
        destination_state_id: i64,
    ) -> Option<&TransitionMeta> {
        self.transitions_from(source_state_id)
            .find(|meta| meta.destination_state_id == destination_state_id)
    }

    /// Transition metas leaving the state, ordered by id.
    pub fn transitions_from(
        &self,
        state_id: i64,
    ) -> impl Iterator<Item = &TransitionMeta> {
        self.adjacent(&self.outgoing, state_id)
    }

    /// Transition metas entering the state, ordered by id.
    pub fn transitions_into(
        &self,
        state_id: i64,
    ) -> impl Iterator<Item = &TransitionMeta> {
        self.adjacent(&self.incoming, state_id)
    }

    fn adjacent<'a>(
        &'a self,
        lists: &'a [Vec<EdgeIx>],
        state_id: i64,
    ) -> impl Iterator<Item = &'a TransitionMeta> {
        self.state_ix.get(&state_id)
            .into_iter()
            .flat_map(move |ix| lists[ix.0].iter())
            .map(move |ix| &self.edges[ix.0])
    }

    /// Approval steps of the transition meta, ordered by priority.
    pub fn approval_metas_of(&self, transition_meta_id: i64) -> &[ApprovalMeta] {
        self.edge_ix.get(&transition_meta_id)
            .map(|ix| self.steps[ix.0].as_slice())
            .unwrap_or(&[])
    }

    pub fn approval_meta(&self, id: i64) -> Option<&ApprovalMeta> {
        self.steps.iter()
            .flatten()
            .find(|meta| meta.id == id)
    }

    /// Breadth first walk from `state_id`, assigning every reachable edge
    /// the level `base + depth` of the frontier its source was first
    /// reached in.  Each edge is visited at most once, so cycles terminate
    /// at the first edge seen again.  The result is in visiting order.
    pub fn levels_from(
        &self,
        state_id: i64,
        base: i64,
    ) -> Vec<(&TransitionMeta, i64)> {
        let mut result = Vec::new();
        let Some(start) = self.state_ix.get(&state_id).copied() else {
            return result;
        };
        let mut visited = HashSet::<EdgeIx>::new();
        let mut seen = HashSet::<StateIx>::from([start]);
        let mut frontier = vec![start];
        let mut level = base;
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for state in frontier.into_iter() {
                for edge in self.outgoing[state.0].iter() {
                    if !visited.insert(*edge) {
                        continue;
                    }
                    let meta = &self.edges[edge.0];
                    result.push((meta, level));
                    let destination = self.state_ix[&meta.destination_state_id];
                    if seen.insert(destination) {
                        next.push(destination);
                    }
                }
            }
            frontier = next;
            level += 1;
        }
        log::trace!(
            "levels_from state {state_id} at base {base}: {} edge(s)",
            result.len(),
        );
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn graph(
        labels: &[&str],
        edges: &[(&str, &str)],
    ) -> WorkflowGraph {
        let states = labels.iter()
            .enumerate()
            .map(|(n, label)| State {
                id: n as i64 + 1,
                label: label.to_string(),
                description: String::new(),
            })
            .collect::<Vec<_>>();
        let id = |label: &str| states.iter()
            .find(|s| s.label == label)
            .map(|s| s.id)
            .expect("label defined");
        let transition_metas = edges.iter()
            .enumerate()
            .map(|(n, (src, dst))| TransitionMeta {
                id: n as i64 + 1,
                workflow_id: 1,
                source_state_id: id(src),
                destination_state_id: id(dst),
            })
            .collect::<Vec<_>>();
        let approval_metas = transition_metas.iter()
            .map(|t| ApprovalMeta {
                id: t.id,
                workflow_id: 1,
                transition_meta_id: t.id,
                priority: 0,
                permissions: vec![],
                users: vec![],
            })
            .collect();
        WorkflowGraph::new(
            Workflow {
                id: 1,
                content_type: "ticket".into(),
                field_name: "status".into(),
                initial_state_id: 1,
                created_ts: 0,
            },
            states.into(),
            transition_metas,
            approval_metas,
        ).expect("valid graph")
    }

    fn labelled(g: &WorkflowGraph, levels: Vec<(&TransitionMeta, i64)>) -> Vec<(String, i64)> {
        levels.into_iter()
            .map(|(meta, level)| (format!(
                "{}>{}",
                g.state(meta.source_state_id).expect("state").label,
                g.state(meta.destination_state_id).expect("state").label,
            ), level))
            .collect()
    }

    #[test]
    fn levels_linear_branch() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("b", "d")]);
        assert_eq!(labelled(&g, g.levels_from(1, 0)), [
            ("a>b".to_string(), 0),
            ("b>c".to_string(), 1),
            ("b>d".to_string(), 1),
        ]);
        assert!(g.is_final(3));
        assert!(!g.is_final(2));
        assert_eq!(g.transitions_from(2).count(), 2);
        assert_eq!(g.transitions_into(2).count(), 1);
    }

    #[test]
    fn levels_cycle_excludes_visited_edges() {
        let g = graph(
            &["open", "in_progress", "resolved", "re_opened", "closed", "final"],
            &[
                ("open", "in_progress"),
                ("in_progress", "resolved"),
                ("resolved", "re_opened"),
                ("resolved", "closed"),
                ("re_opened", "in_progress"),
                ("closed", "final"),
            ],
        );
        assert_eq!(labelled(&g, g.levels_from(1, 0)), [
            ("open>in_progress".to_string(), 0),
            ("in_progress>resolved".to_string(), 1),
            ("resolved>re_opened".to_string(), 2),
            ("resolved>closed".to_string(), 2),
            ("re_opened>in_progress".to_string(), 3),
            ("closed>final".to_string(), 3),
        ]);
        assert_eq!(labelled(&g, g.levels_from(2, 4)), [
            ("in_progress>resolved".to_string(), 4),
            ("resolved>re_opened".to_string(), 5),
            ("resolved>closed".to_string(), 5),
            ("re_opened>in_progress".to_string(), 6),
            ("closed>final".to_string(), 6),
        ]);
    }

    #[test]
    fn levels_self_loop() {
        let g = graph(&["a", "b"], &[("a", "a"), ("a", "b")]);
        assert_eq!(labelled(&g, g.levels_from(1, 3)), [
            ("a>a".to_string(), 3),
            ("a>b".to_string(), 3),
        ]);
    }

    #[test]
    fn validation() {
        let g = graph(&["a", "b"], &[("a", "b")]);
        let workflow = g.workflow().clone();
        let states: States = vec![
            g.state(1).expect("state").clone(),
            g.state(2).expect("state").clone(),
        ].into();
        let edge = TransitionMeta {
            id: 1,
            workflow_id: 1,
            source_state_id: 1,
            destination_state_id: 2,
        };
        let step = |id, priority| ApprovalMeta {
            id,
            workflow_id: 1,
            transition_meta_id: 1,
            priority,
            permissions: vec![],
            users: vec![],
        };

        assert_eq!(
            WorkflowGraph::new(
                workflow.clone(),
                states.clone(),
                vec![TransitionMeta { workflow_id: 2, ..edge.clone() }],
                vec![],
            ).unwrap_err(),
            ConfigurationError::ForeignTransitionMeta {
                workflow_id: 1,
                transition_meta_id: 1,
            },
        );
        assert_eq!(
            WorkflowGraph::new(
                workflow.clone(),
                states.clone(),
                vec![TransitionMeta { destination_state_id: 9, ..edge.clone() }],
                vec![],
            ).unwrap_err(),
            ConfigurationError::UnknownState("9".into()),
        );
        assert_eq!(
            WorkflowGraph::new(
                workflow.clone(),
                states.clone(),
                vec![edge.clone()],
                vec![ApprovalMeta { transition_meta_id: 2, ..step(1, 0) }],
            ).unwrap_err(),
            ConfigurationError::ForeignApprovalMeta {
                workflow_id: 1,
                approval_meta_id: 1,
                transition_meta_id: 2,
            },
        );
        assert_eq!(
            WorkflowGraph::new(
                workflow.clone(),
                states.clone(),
                vec![edge.clone()],
                vec![step(1, 0), step(2, 0)],
            ).unwrap_err(),
            ConfigurationError::DuplicatePriority {
                from: "a".into(),
                to: "b".into(),
                priority: 0,
            },
        );

        let g = WorkflowGraph::new(
            workflow,
            states,
            vec![edge],
            vec![step(2, 5), step(1, 1)],
        ).expect("valid graph");
        let priorities = g.approval_metas_of(1).iter()
            .map(|m| m.id)
            .collect::<Vec<_>>();
        assert_eq!(priorities, [1, 2]);
    }
}
