use async_trait::async_trait;
use crate::{
    platform::PlatformUrl,
    schema::traits::SchemaBackend,
};

/// SchemaPlatform - Schema Platform
///
/// Offline access to the persisted approval rows, used to move them
/// between representations.
#[async_trait]
pub trait SchemaPlatform: SchemaBackend
    + PlatformUrl

    + Send
    + Sync
{
    fn as_dyn(&self) -> &dyn SchemaPlatform;
}

pub trait DefaultSchemaPlatform: SchemaPlatform {}

impl<P: SchemaBackend
    + PlatformUrl

    + DefaultSchemaPlatform

    + Send
    + Sync
> SchemaPlatform for P {
    fn as_dyn(&self) -> &dyn SchemaPlatform {
        self
    }
}
