pub mod ac;
pub mod approval;
pub mod error;
pub mod platform;
pub mod schema;
pub mod state;
pub mod workflow;
