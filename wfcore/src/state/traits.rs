use async_trait::async_trait;
use crate::error::BackendError;
use super::{
    State,
    States,
};

#[async_trait]
pub trait StateBackend {
    /// Returns the id of the state with the label, creating it if absent.
    async fn ensure_state(
        &self,
        label: &str,
        description: &str,
    ) -> Result<i64, BackendError>;
    async fn get_state_by_id(
        &self,
        id: i64,
    ) -> Result<State, BackendError>;
    async fn get_state_by_label(
        &self,
        label: &str,
    ) -> Result<Option<State>, BackendError>;
    async fn list_states(
        &self,
    ) -> Result<States, BackendError>;
}
