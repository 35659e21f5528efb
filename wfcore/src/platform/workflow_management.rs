use async_trait::async_trait;
use crate::{
    platform::PlatformUrl,
    approval::traits::WorkflowObjectBackend,
    state::traits::StateBackend,
    workflow::traits::WorkflowBackend,
};

/// WFPlatform - Workflow Platform
///
/// This platform persists workflow definitions together with the
/// objects, transitions and approvals that track their progress.
///
/// This trait is applicable to everything that correctly implements the
/// relevant backends that compose this trait.
#[async_trait]
pub trait WFPlatform: StateBackend
    + WorkflowBackend
    + WorkflowObjectBackend

    + PlatformUrl

    + Send
    + Sync
{
    fn as_dyn(&self) -> &dyn WFPlatform;
}

pub trait DefaultWFPlatform: WFPlatform {}

impl<P: StateBackend
    + WorkflowBackend
    + WorkflowObjectBackend

    + PlatformUrl

    + DefaultWFPlatform

    + Send
    + Sync
> WFPlatform for P {
    fn as_dyn(&self) -> &dyn WFPlatform {
        self
    }
}
