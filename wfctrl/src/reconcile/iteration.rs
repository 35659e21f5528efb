use wfcore::{
    error::ConsistencyError,
    schema::{
        ApprovalRecord,
        ApprovalSchema,
        RecordSet,
    },
    workflow::iteration::{
        self,
        HistoryEntry,
    },
};

use super::{
    status::decode,
    transition_ref::Index,
};

/// Derives the iteration of every approval from the order the approvals
/// of each object were created in.
pub fn assessed(records: RecordSet) -> Result<RecordSet, ConsistencyError> {
    let index = Index::new(&records);
    let entries = records.approvals.iter()
        .map(|approval| -> Result<HistoryEntry, ConsistencyError> {
            let (source_state_id, destination_state_id) = index.approval_pair(approval)?;
            Ok(HistoryEntry {
                id: approval.id,
                workflow_object_id: approval.workflow_object_id,
                approval_meta_id: approval.approval_meta_id,
                source_state_id,
                destination_state_id,
                status: decode(approval)?,
                iteration: approval.iteration.unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let assessed = iteration::assess(&entries);
    log::debug!("assessed iterations of {} approval(s)", assessed.len());
    Ok(RecordSet {
        schema: ApprovalSchema {
            iteration: true,
            .. records.schema
        },
        approvals: records.approvals
            .into_iter()
            .map(|approval| ApprovalRecord {
                iteration: assessed.get(&approval.id).copied(),
                .. approval
            })
            .collect(),
        .. records
    })
}

pub fn dropped(records: RecordSet) -> RecordSet {
    RecordSet {
        schema: ApprovalSchema {
            iteration: false,
            .. records.schema
        },
        approvals: records.approvals
            .into_iter()
            .map(|approval| ApprovalRecord {
                iteration: None,
                .. approval
            })
            .collect(),
        .. records
    }
}
