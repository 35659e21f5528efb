//! Authority implementations answering whether a principal holds a
//! permission, either through direct permits or group membership.

mod builder;
#[cfg(feature = "casbin")]
pub mod casbin;
pub mod error;
pub mod simple;

pub use builder::{
    AuthorityRecords,
    Builder,
};
