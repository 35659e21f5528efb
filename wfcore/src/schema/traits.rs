use async_trait::async_trait;
use crate::error::BackendError;
use super::{
    ApprovalSchema,
    RecordSet,
};

#[async_trait]
pub trait SchemaBackend {
    /// Detects the representation of the persisted approval rows.
    async fn introspect(
        &self,
    ) -> Result<ApprovalSchema, BackendError>;
    async fn load_records(
        &self,
    ) -> Result<RecordSet, BackendError>;
    /// Replaces the approval (meta) tables with the record set in its own
    /// representation, creating any transition (meta) rows it introduces.
    /// All or nothing.
    async fn store_records(
        &self,
        records: &RecordSet,
    ) -> Result<(), BackendError>;
}
