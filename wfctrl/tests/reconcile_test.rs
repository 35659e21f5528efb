use std::time::{
    Duration,
    Instant,
};
use tempfile::TempDir;
use wfcore::{
    error::ConsistencyError,
    platform::{
        ConnectorOption,
        PlatformConnector,
    },
    schema::{
        ApprovalSchema,
        StatusEncoding,
        StatusValue,
        TransitionRefForm,
        traits::SchemaBackend,
    },
    workflow::WorkflowDef,
};
use wfctrl::{
    error::Error,
    platform::{
        Builder,
        Platform,
    },
    reconcile::{
        reconcile,
        IterationTarget,
        Reconciliation,
    },
};
use wfdb_sqlite::SqliteBackend;
use test_wf::{
    fixtures::{
        self,
        user,
    },
    platform::authority_builder,
};

fn connector(tempdir: &TempDir) -> ConnectorOption {
    ConnectorOption::new()
        .url(format!("sqlite://{}/wf.db", tempdir.path().display()))
        .auto_create_db(true)
}

async fn create_platform(
    tempdir: &TempDir,
    def: &WorkflowDef,
) -> anyhow::Result<(Platform, i64)> {
    let backend = SqliteBackend::wf(connector(tempdir))
        .await
        .map_err(anyhow::Error::from_boxed)?;
    let platform = Builder::new()
        .wf_platform(backend)
        .boxed_authority(authority_builder().build().await?)
        .build();
    let id = platform.register_workflow(def).await?;
    Ok((platform, id))
}

async fn schema_backend(tempdir: &TempDir) -> anyhow::Result<SqliteBackend> {
    Ok(SqliteBackend::connect(connector(tempdir)).await?)
}

/// Drives one object around the cycle once and one object into the
/// tributary.
async fn populate_cycle(platform: &Platform, id: i64) -> anyhow::Result<()> {
    let admin = user(1, "admin");
    let mut ctrl = platform.register_object(id, "article-1").await?;
    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, Some(ctrl.state_id("cycle_state_1")?)).await?;
    ctrl.approve(&admin, None).await?;

    let mut ctrl = platform.register_object(id, "article-2").await?;
    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, Some(ctrl.state_id("off_the_cycle_state")?)).await?;
    Ok(())
}

#[async_std::test]
async fn test_reconcile_current_is_noop() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let (platform, id) = create_platform(&tempdir, &fixtures::cycle_with_tributary()).await?;
    populate_cycle(&platform, id).await?;
    let backend = schema_backend(&tempdir).await?;
    assert_eq!(backend.introspect().await?, ApprovalSchema::CURRENT);
    let before = backend.load_records().await?;
    for target in [
        Reconciliation::StatusEncoding(StatusEncoding::Symbolic),
        Reconciliation::Iteration(IterationTarget::Assessed),
        Reconciliation::TransitionReference(TransitionRefForm::Meta),
    ] {
        assert_eq!(reconcile(&backend, target).await?, ApprovalSchema::CURRENT);
    }
    assert_eq!(backend.load_records().await?, before);
    Ok(())
}

#[async_std::test]
async fn test_reconcile_round_trips() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let (platform, id) = create_platform(&tempdir, &fixtures::cycle_with_tributary()).await?;
    populate_cycle(&platform, id).await?;
    let backend = schema_backend(&tempdir).await?;
    let before = backend.load_records().await?;

    let schema = reconcile(
        &backend,
        Reconciliation::StatusEncoding(StatusEncoding::Integer),
    ).await?;
    assert_eq!(schema.status, StatusEncoding::Integer);
    assert_eq!(backend.introspect().await?, schema);
    let records = backend.load_records().await?;
    assert!(records.approvals
        .iter()
        .all(|approval| matches!(approval.status, StatusValue::Integer(0..=3))));
    reconcile(&backend, Reconciliation::StatusEncoding(StatusEncoding::Symbolic)).await?;
    assert_eq!(backend.load_records().await?, before);

    reconcile(&backend, Reconciliation::Iteration(IterationTarget::Dropped)).await?;
    assert!(!backend.introspect().await?.iteration);
    reconcile(&backend, Reconciliation::Iteration(IterationTarget::Assessed)).await?;
    assert_eq!(backend.load_records().await?, before);

    reconcile(
        &backend,
        Reconciliation::TransitionReference(TransitionRefForm::StatePair),
    ).await?;
    assert_eq!(
        backend.introspect().await?.transition_ref,
        TransitionRefForm::StatePair,
    );
    reconcile(&backend, Reconciliation::TransitionReference(TransitionRefForm::Meta)).await?;
    assert_eq!(backend.load_records().await?, before);
    assert_eq!(backend.introspect().await?, ApprovalSchema::CURRENT);

    // the live platform carries on from the reconciled rows
    let mut ctrl = platform.get_object(id, "article-1").await?;
    ctrl.approve(&user(1, "admin"), None).await?;
    assert_eq!(ctrl.state().map(|state| state.label.as_str()), Some("cycle_state_2"));
    Ok(())
}

#[async_std::test]
async fn test_reconcile_assess_advanced_cycle() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let (platform, id) = create_platform(&tempdir, &fixtures::advanced_cycle()).await?;
    let admin = user(1, "admin");
    let mut ctrl = platform.register_object(id, "issue-1").await?;
    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, Some(ctrl.state_id("re_opened")?)).await?;
    ctrl.approve(&admin, None).await?;
    assert_eq!(ctrl.state().map(|state| state.label.as_str()), Some("in_progress"));

    let backend = schema_backend(&tempdir).await?;
    reconcile(&backend, Reconciliation::Iteration(IterationTarget::Dropped)).await?;
    assert!(!backend.introspect().await?.iteration);
    assert!(backend.load_records().await?.approvals
        .iter()
        .all(|approval| approval.iteration.is_none()));

    reconcile(&backend, Reconciliation::Iteration(IterationTarget::Assessed)).await?;
    let mut pairs = backend.load_records().await?.approvals
        .iter()
        .map(|approval| (approval.approval_meta_id, approval.iteration))
        .collect::<Vec<_>>();
    pairs.sort();
    // approval metas follow declaration order: open -> in_progress (1),
    // in_progress -> resolved (2), resolved -> re_opened (3),
    // re_opened -> in_progress (4), resolved -> closed (5), closed -> final (6)
    assert_eq!(pairs, [
        (1, Some(0)),
        (2, Some(1)), (2, Some(4)),
        (3, Some(2)), (3, Some(5)),
        (4, Some(3)), (4, Some(6)),
        (5, Some(2)), (5, Some(5)),
        (6, Some(3)), (6, Some(6)),
    ]);
    Ok(())
}

#[async_std::test]
async fn test_reconcile_unmappable_status() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let (platform, id) = create_platform(&tempdir, &fixtures::self_loop()).await?;
    platform.register_object(id, "page-1").await?;
    let backend = schema_backend(&tempdir).await?;
    let mut records = backend.load_records().await?;
    records.approvals[1].status = StatusValue::Symbolic("withdrawn".into());
    backend.store_records(&records).await?;

    let result = reconcile(
        &backend,
        Reconciliation::StatusEncoding(StatusEncoding::Integer),
    ).await;
    assert!(matches!(
        result,
        Err(Error::Consistency(ConsistencyError::UnmappableStatus { id: 2, .. })),
    ));
    // nothing was written
    assert_eq!(backend.introspect().await?, ApprovalSchema::CURRENT);
    assert_eq!(backend.load_records().await?, records);
    Ok(())
}

#[async_std::test]
async fn test_reconcile_many_objects() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let (platform, id) = create_platform(&tempdir, &fixtures::self_loop()).await?;
    let admin = user(1, "admin");
    for n in 0..250 {
        let mut ctrl = platform.register_object(id, &format!("page-{n}")).await?;
        let draft = ctrl.state_id("draft")?;
        for _ in 0..(n % 3) {
            ctrl.approve(&admin, Some(draft)).await?;
        }
    }
    let backend = schema_backend(&tempdir).await?;
    let before = backend.load_records().await?;

    let started = Instant::now();
    for target in [
        Reconciliation::StatusEncoding(StatusEncoding::Integer),
        Reconciliation::Iteration(IterationTarget::Dropped),
        Reconciliation::TransitionReference(TransitionRefForm::StatePair),
        Reconciliation::TransitionReference(TransitionRefForm::Meta),
        Reconciliation::Iteration(IterationTarget::Assessed),
        Reconciliation::StatusEncoding(StatusEncoding::Symbolic),
    ] {
        reconcile(&backend, target).await?;
    }
    assert!(started.elapsed() < Duration::from_secs(300));
    assert_eq!(backend.load_records().await?, before);
    Ok(())
}
