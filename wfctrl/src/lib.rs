//! Drives workflow objects through their workflow graphs: registers
//! definitions, materializes approvals, executes approve and reject
//! requests, and reconciles historical approval rows.

pub mod error;
pub mod executor;
pub mod handle;
pub mod materializer;
pub mod platform;
pub mod policy;
pub mod reconcile;
pub(crate) mod registry;

pub(crate) mod chrono {
    #[cfg(not(test))]
    pub use ::chrono::Utc;
    #[cfg(test)]
    pub use test_wf::chrono::Utc;
}
#[cfg(test)]
mod testing;
