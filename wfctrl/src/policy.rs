use serde::{Deserialize, Serialize};

/// What `approve` does when more than one destination is available and
/// no next state was given.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "bin", derive(clap::ValueEnum))]
pub enum BranchPolicy {
    /// Fail with `Error::AmbiguousTransition`.
    #[default]
    Explicit,
    /// Pick the transition declared first.
    FirstAvailable,
}

/// What happens to a transition after one of its steps is rejected.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "bin", derive(clap::ValueEnum))]
pub enum RejectionPolicy {
    /// The transition stays halted; the object is blocked once nothing
    /// else leaving its state awaits approval.
    #[default]
    Block,
    /// A fresh approval chain is minted for the transition.
    Retry,
}
