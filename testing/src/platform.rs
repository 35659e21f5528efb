use wfcore::{
    ac::permit::{
        Membership,
        Permit,
    },
    platform::PlatformConnector,
    workflow::WorkflowDef,
};
use wfctrl::platform::{
    Builder,
    Platform,
};
use wfdb_sqlite::SqliteBackend;
use wfrbac::Builder as AuthorityBuilder;

/// Permits used by the scenario workflows; `admin` (user 1) holds every
/// permission while `editor` (user 2) may only edit.
pub fn authority_builder() -> AuthorityBuilder {
    AuthorityBuilder::new()
        .permit(Permit::new("staff", "*"))
        .membership(Membership::new("admin", "staff"))
        .permit(Permit::new("editor", "article.edit"))
        .permit(Permit::new("editor", "issue.work"))
}

pub async fn create_sqlite_platform(
    builder: Builder,
) -> anyhow::Result<Platform> {
    let backend = SqliteBackend::wf("sqlite::memory:".into())
        .await
        .map_err(anyhow::Error::from_boxed)?;
    let platform = builder
        .wf_platform(backend)
        .boxed_authority(authority_builder().build().await?)
        .build();
    Ok(platform)
}

/// A sqlite platform with the workflow registered, returning its id.
pub async fn create_sqlite_platform_with(
    builder: Builder,
    def: &WorkflowDef,
) -> anyhow::Result<(Platform, i64)> {
    let platform = create_sqlite_platform(builder).await?;
    let workflow_id = platform.register_workflow(def).await?;
    Ok((platform, workflow_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[async_std::test]
    async fn smoke_test_create_platform() -> anyhow::Result<()> {
        let (platform, id) = create_sqlite_platform_with(
            Builder::new(),
            &fixtures::linear_branch(),
        ).await?;
        assert!(crate::is_send_sync(&platform));
        assert_eq!(platform.get_graph(id).await?.workflow().id, id);
        Ok(())
    }
}
