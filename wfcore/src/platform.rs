mod connector;
mod schema_management;
mod workflow_management;
pub use connector::{
    ConnectorOption,
    PlatformConnector,
};
pub use schema_management::{DefaultSchemaPlatform, SchemaPlatform};
pub use workflow_management::{DefaultWFPlatform, WFPlatform};

pub trait PlatformUrl {
    fn url(&self) -> &str;
}
