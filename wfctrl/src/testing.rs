use wfcore::{
    state::State,
    workflow::{
        ApprovalMeta,
        TransitionMeta,
        Workflow,
        WorkflowDef,
        WorkflowGraph,
    },
};

/// Builds the graph the way the backend would number it: states,
/// transition metas and approval metas in declaration order from 1.
pub(crate) fn graph(def: &WorkflowDef) -> WorkflowGraph {
    let states = def.states.iter()
        .enumerate()
        .map(|(n, s)| State {
            id: n as i64 + 1,
            label: s.label.clone(),
            description: s.description.clone(),
        })
        .collect::<Vec<_>>();
    let id = |label: &str| states.iter()
        .find(|s| s.label == label)
        .map(|s| s.id)
        .expect("declared state");
    let mut metas = Vec::new();
    let mut steps = Vec::new();
    for (n, t) in def.transitions.iter().enumerate() {
        let meta = TransitionMeta {
            id: n as i64 + 1,
            workflow_id: 1,
            source_state_id: id(&t.source),
            destination_state_id: id(&t.destination),
        };
        for (priority, step) in t.steps() {
            steps.push(ApprovalMeta {
                id: steps.len() as i64 + 1,
                workflow_id: 1,
                transition_meta_id: meta.id,
                priority,
                permissions: step.permissions.clone(),
                users: step.users.clone(),
            });
        }
        metas.push(meta);
    }
    let initial = def.initial_state().expect("initial state");
    WorkflowGraph::new(
        Workflow {
            id: 1,
            content_type: def.content_type.clone(),
            field_name: def.field_name.clone(),
            initial_state_id: id(&initial.label),
            created_ts: 0,
        },
        states.into(),
        metas,
        steps,
    ).expect("valid graph")
}
