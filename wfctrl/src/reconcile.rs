//! Moves persisted approval rows between representations.
//!
//! Every reconciliation is a pure rewrite of a `RecordSet`; the schema
//! platform loads the record set and stores the rewritten one in a single
//! transaction.  Reconciling towards a representation that is already in
//! place leaves the store untouched.

use wfcore::{
    error::ConsistencyError,
    platform::SchemaPlatform,
    schema::{
        ApprovalSchema,
        RecordSet,
        StatusEncoding,
        TransitionRefForm,
    },
};

use crate::error::Error;

pub mod iteration;
pub mod status;
pub mod transition_ref;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IterationTarget {
    /// Derive iterations for every approval from its history.
    Assessed,
    Dropped,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reconciliation {
    StatusEncoding(StatusEncoding),
    Iteration(IterationTarget),
    TransitionReference(TransitionRefForm),
}

impl Reconciliation {
    pub const ALL: [Reconciliation; 6] = [
        Reconciliation::StatusEncoding(StatusEncoding::Integer),
        Reconciliation::StatusEncoding(StatusEncoding::Symbolic),
        Reconciliation::Iteration(IterationTarget::Assessed),
        Reconciliation::Iteration(IterationTarget::Dropped),
        Reconciliation::TransitionReference(TransitionRefForm::Meta),
        Reconciliation::TransitionReference(TransitionRefForm::StatePair),
    ];

    /// Whether the schema already has the representation this targets.
    pub fn is_active(&self, schema: &ApprovalSchema) -> bool {
        match self {
            Self::StatusEncoding(encoding) => schema.status == *encoding,
            Self::Iteration(IterationTarget::Assessed) => schema.iteration,
            Self::Iteration(IterationTarget::Dropped) => !schema.iteration,
            Self::TransitionReference(form) => schema.transition_ref == *form,
        }
    }

    pub fn apply(&self, records: RecordSet) -> Result<RecordSet, ConsistencyError> {
        if self.is_active(&records.schema) {
            return Ok(records);
        }
        match self {
            Self::StatusEncoding(encoding) => status::encode(records, *encoding),
            Self::Iteration(IterationTarget::Assessed) => iteration::assessed(records),
            Self::Iteration(IterationTarget::Dropped) => Ok(iteration::dropped(records)),
            Self::TransitionReference(TransitionRefForm::StatePair) => {
                transition_ref::to_state_pair(records)
            }
            Self::TransitionReference(TransitionRefForm::Meta) => {
                transition_ref::to_meta(records)
            }
        }
    }
}

/// Brings the store to the representation targeted, returning the schema
/// in place afterwards.
pub async fn reconcile(
    platform: &dyn SchemaPlatform,
    target: Reconciliation,
) -> Result<ApprovalSchema, Error> {
    let schema = platform.introspect().await?;
    if target.is_active(&schema) {
        log::info!("{target} is already in place ({schema})");
        return Ok(schema);
    }
    let records = platform.load_records().await?;
    log::info!(
        "reconciling {} approval(s) from ({schema}) to {target}",
        records.approvals.len(),
    );
    let records = target.apply(records)?;
    platform.store_records(&records).await?;
    log::info!("schema is now ({})", records.schema);
    Ok(records.schema)
}

mod impls;
