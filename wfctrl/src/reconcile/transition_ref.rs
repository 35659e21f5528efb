use std::collections::HashMap;
use wfcore::{
    approval::Transition,
    error::ConsistencyError,
    schema::{
        ApprovalMetaRecord,
        ApprovalRecord,
        ApprovalSchema,
        RecordSet,
        TransitionLink,
        TransitionRefForm,
    },
    workflow::TransitionMeta,
};

type StatePair = (i64, i64);

fn pair_of(meta: &TransitionMeta) -> StatePair {
    (meta.source_state_id, meta.destination_state_id)
}

fn state_link((source_state_id, destination_state_id): StatePair) -> TransitionLink {
    TransitionLink::States { source_state_id, destination_state_id }
}

/// Lookup of the transition rows of a record set by id.
pub(crate) struct Index<'a> {
    transition_metas: HashMap<i64, &'a TransitionMeta>,
    transitions: HashMap<i64, &'a Transition>,
}

impl<'a> Index<'a> {
    pub(crate) fn new(records: &'a RecordSet) -> Self {
        Self {
            transition_metas: records.transition_metas.iter()
                .map(|meta| (meta.id, meta))
                .collect(),
            transitions: records.transitions.iter()
                .map(|transition| (transition.id, transition))
                .collect(),
        }
    }

    fn transition_meta(
        &self,
        table: &'static str,
        id: i64,
        transition_meta_id: i64,
    ) -> Result<&'a TransitionMeta, ConsistencyError> {
        self.transition_metas.get(&transition_meta_id)
            .copied()
            .ok_or(ConsistencyError::MissingTransitionMeta {
                table,
                id,
                transition_meta_id,
            })
    }

    pub(crate) fn meta_pair(
        &self,
        meta: &ApprovalMetaRecord,
    ) -> Result<StatePair, ConsistencyError> {
        match meta.link {
            TransitionLink::Id(transition_meta_id) => self
                .transition_meta("approval_meta", meta.id, transition_meta_id)
                .map(pair_of),
            TransitionLink::States { source_state_id, destination_state_id } => {
                Ok((source_state_id, destination_state_id))
            }
        }
    }

    /// The states an approval moves between.
    pub(crate) fn approval_pair(
        &self,
        approval: &ApprovalRecord,
    ) -> Result<StatePair, ConsistencyError> {
        match approval.link {
            TransitionLink::Id(transition_id) => {
                let transition = self.transitions.get(&transition_id)
                    .ok_or(ConsistencyError::MissingTransition {
                        id: approval.id,
                        transition_id,
                    })?;
                self.transition_meta("transition", transition.id, transition.transition_meta_id)
                    .map(pair_of)
            }
            TransitionLink::States { source_state_id, destination_state_id } => {
                Ok((source_state_id, destination_state_id))
            }
        }
    }
}

/// Replaces transition (meta) references with the states they connect.
/// Transition rows are kept so the move can be undone.
pub fn to_state_pair(records: RecordSet) -> Result<RecordSet, ConsistencyError> {
    let index = Index::new(&records);
    let meta_links = records.approval_metas.iter()
        .map(|meta| index.meta_pair(meta).map(state_link))
        .collect::<Result<Vec<_>, _>>()?;
    let approval_links = records.approvals.iter()
        .map(|approval| index.approval_pair(approval).map(state_link))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecordSet {
        schema: ApprovalSchema {
            transition_ref: TransitionRefForm::StatePair,
            .. records.schema
        },
        approval_metas: records.approval_metas
            .into_iter()
            .zip(meta_links)
            .map(|(meta, link)| ApprovalMetaRecord { link, .. meta })
            .collect(),
        approvals: records.approvals
            .into_iter()
            .zip(approval_links)
            .map(|(approval, link)| ApprovalRecord { link, .. approval })
            .collect(),
        .. records
    })
}

/// Resolves state pairs back into transition (meta) references, reusing
/// the rows that match and creating the ones that are missing.
pub fn to_meta(records: RecordSet) -> Result<RecordSet, ConsistencyError> {
    let RecordSet {
        schema,
        mut transition_metas,
        mut transitions,
        approval_metas,
        approvals,
    } = records;

    let mut metas_by_pair = HashMap::<(i64, StatePair), Vec<i64>>::new();
    for meta in transition_metas.iter() {
        metas_by_pair.entry((meta.workflow_id, pair_of(meta)))
            .or_default()
            .push(meta.id);
    }
    let mut next_meta_id = transition_metas.iter()
        .map(|meta| meta.id)
        .max()
        .unwrap_or(0) + 1;

    let mut meta_of = HashMap::new();
    let mut relinked_metas = Vec::with_capacity(approval_metas.len());
    for meta in approval_metas.into_iter() {
        let transition_meta_id = match meta.link {
            TransitionLink::Id(id) => id,
            TransitionLink::States { source_state_id, destination_state_id } => {
                let key = (meta.workflow_id, (source_state_id, destination_state_id));
                match metas_by_pair.get(&key).map(Vec::as_slice) {
                    Some([id]) => *id,
                    Some(ids) if ids.len() > 1 => {
                        return Err(ConsistencyError::AmbiguousStatePair {
                            table: "approval_meta",
                            id: meta.id,
                            source_state_id,
                            destination_state_id,
                            count: ids.len(),
                        });
                    }
                    _ => {
                        let id = next_meta_id;
                        next_meta_id += 1;
                        log::debug!(
                            "creating transition meta {id} for states \
                            {source_state_id} -> {destination_state_id}"
                        );
                        transition_metas.push(TransitionMeta {
                            id,
                            workflow_id: meta.workflow_id,
                            source_state_id,
                            destination_state_id,
                        });
                        metas_by_pair.insert(key, vec![id]);
                        id
                    }
                }
            }
        };
        meta_of.insert(meta.id, transition_meta_id);
        relinked_metas.push(ApprovalMetaRecord {
            link: TransitionLink::Id(transition_meta_id),
            .. meta
        });
    }

    let pairs = transition_metas.iter()
        .map(|meta| (meta.id, pair_of(meta)))
        .collect::<HashMap<_, _>>();
    let mut transitions_by_meta = HashMap::<(i64, i64), Vec<i64>>::new();
    for transition in transitions.iter() {
        transitions_by_meta
            .entry((transition.workflow_object_id, transition.transition_meta_id))
            .or_default()
            .push(transition.id);
    }
    let mut next_transition_id = transitions.iter()
        .map(|transition| transition.id)
        .max()
        .unwrap_or(0) + 1;

    let mut relinked = Vec::with_capacity(approvals.len());
    for approval in approvals.into_iter() {
        let transition_id = match approval.link {
            TransitionLink::Id(id) => id,
            TransitionLink::States { source_state_id, destination_state_id } => {
                let transition_meta_id = *meta_of.get(&approval.approval_meta_id)
                    .ok_or(ConsistencyError::MissingApprovalMeta {
                        id: approval.id,
                        approval_meta_id: approval.approval_meta_id,
                    })?;
                if pairs.get(&transition_meta_id) != Some(&(source_state_id, destination_state_id)) {
                    return Err(ConsistencyError::UnmatchedStatePair {
                        table: "approval",
                        id: approval.id,
                        source_state_id,
                        destination_state_id,
                    });
                }
                let key = (approval.workflow_object_id, transition_meta_id);
                match transitions_by_meta.get(&key).map(Vec::as_slice) {
                    Some([id]) => *id,
                    Some(ids) if ids.len() > 1 => {
                        return Err(ConsistencyError::AmbiguousStatePair {
                            table: "approval",
                            id: approval.id,
                            source_state_id,
                            destination_state_id,
                            count: ids.len(),
                        });
                    }
                    _ => {
                        let id = next_transition_id;
                        next_transition_id += 1;
                        transitions.push(Transition {
                            id,
                            workflow_id: approval.workflow_id,
                            workflow_object_id: approval.workflow_object_id,
                            transition_meta_id,
                        });
                        transitions_by_meta.insert(key, vec![id]);
                        id
                    }
                }
            }
        };
        relinked.push(ApprovalRecord {
            link: TransitionLink::Id(transition_id),
            .. approval
        });
    }

    Ok(RecordSet {
        schema: ApprovalSchema {
            transition_ref: TransitionRefForm::Meta,
            .. schema
        },
        transition_metas,
        transitions,
        approval_metas: relinked_metas,
        approvals: relinked,
    })
}

#[cfg(test)]
mod tests {
    use crate::reconcile::testing;
    use super::*;

    #[test]
    fn state_pairs() -> anyhow::Result<()> {
        let records = to_state_pair(testing::self_loop())?;
        assert_eq!(records.schema.transition_ref, TransitionRefForm::StatePair);
        assert_eq!(records.approval_metas[1].link, state_link((1, 2)));
        assert_eq!(records.approvals[4].link, state_link((1, 1)));
        assert_eq!(records.transitions.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_rows() {
        let mut records = testing::self_loop();
        records.transitions.pop();
        assert_eq!(
            to_state_pair(records).err(),
            Some(ConsistencyError::MissingTransition { id: 2, transition_id: 2 }),
        );
        let mut records = testing::self_loop();
        records.transition_metas.remove(0);
        assert_eq!(
            to_state_pair(records).err(),
            Some(ConsistencyError::MissingTransitionMeta {
                table: "approval_meta",
                id: 1,
                transition_meta_id: 1,
            }),
        );
    }

    #[test]
    fn renormalize_creates_rows() -> anyhow::Result<()> {
        let mut records = to_state_pair(testing::self_loop())?;
        records.transition_metas.clear();
        records.transitions.clear();
        assert_eq!(to_meta(records)?, testing::self_loop());
        Ok(())
    }

    #[test]
    fn renormalize_ambiguous() -> anyhow::Result<()> {
        let mut records = to_state_pair(testing::self_loop())?;
        records.transition_metas.push(TransitionMeta {
            id: 3,
            workflow_id: 1,
            source_state_id: 1,
            destination_state_id: 1,
        });
        assert_eq!(
            to_meta(records).err(),
            Some(ConsistencyError::AmbiguousStatePair {
                table: "approval_meta",
                id: 1,
                source_state_id: 1,
                destination_state_id: 1,
                count: 2,
            }),
        );
        Ok(())
    }

    #[test]
    fn renormalize_unmatched() -> anyhow::Result<()> {
        let mut records = to_state_pair(testing::self_loop())?;
        records.approvals[0].link = state_link((1, 2));
        assert_eq!(
            to_meta(records).err(),
            Some(ConsistencyError::UnmatchedStatePair {
                table: "approval",
                id: 1,
                source_state_id: 1,
                destination_state_id: 2,
            }),
        );
        Ok(())
    }
}
