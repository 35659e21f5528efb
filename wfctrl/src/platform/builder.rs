use std::sync::Arc;
use wfcore::{
    ac::traits::Authority,
    platform::WFPlatform,
};

use crate::{
    policy::{
        BranchPolicy,
        RejectionPolicy,
    },
    registry::GraphRegistry,
};
use super::Platform;

#[derive(Default)]
pub struct Builder {
    wf_platform: Option<Arc<dyn WFPlatform>>,
    authority: Option<Arc<dyn Authority>>,
    branch_policy: BranchPolicy,
    rejection_policy: RejectionPolicy,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wf_platform(mut self, val: impl WFPlatform + 'static) -> Self {
        self.wf_platform = Some(Arc::new(val));
        self
    }

    pub fn boxed_wf_platform(mut self, val: Box<dyn WFPlatform>) -> Self {
        self.wf_platform = Some(val.into());
        self
    }

    /// Shares a platform already handed out by `wfdb::Backend`.
    pub fn arc_wf_platform(mut self, val: Arc<dyn WFPlatform>) -> Self {
        self.wf_platform = Some(val);
        self
    }

    pub fn authority(mut self, val: impl Authority + 'static) -> Self {
        self.authority = Some(Arc::new(val));
        self
    }

    pub fn boxed_authority(mut self, val: Box<dyn Authority>) -> Self {
        self.authority = Some(val.into());
        self
    }

    pub fn branch_policy(mut self, val: BranchPolicy) -> Self {
        self.branch_policy = val;
        self
    }

    pub fn rejection_policy(mut self, val: RejectionPolicy) -> Self {
        self.rejection_policy = val;
        self
    }

    pub fn build(self) -> Platform {
        Platform {
            wf_platform: self.wf_platform
                .expect("missing required argument wf_platform"),
            authority: self.authority
                .expect("missing required argument authority"),
            branch_policy: self.branch_policy,
            rejection_policy: self.rejection_policy,
            graphs: GraphRegistry::default(),
        }
    }
}
