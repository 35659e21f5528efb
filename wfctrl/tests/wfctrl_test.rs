use wfcore::{
    ac::Principal,
    approval::ApprovalStatus,
    error::{
        BackendError,
        ConfigurationError,
    },
    workflow::ApprovalDef,
};
use wfctrl::{
    error::{
        Error,
        PermissionError,
    },
    executor::ObjectStatus,
    handle::WorkflowObjectCtrl,
    platform::Builder,
    policy::{
        BranchPolicy,
        RejectionPolicy,
    },
};
use test_wf::{
    fixtures::{
        self,
        user,
    },
    platform::{
        create_sqlite_platform,
        create_sqlite_platform_with,
    },
};

fn pairs(ctrl: &WorkflowObjectCtrl<'_>) -> Vec<(i64, i64)> {
    ctrl.approvals()
        .iter()
        .map(|a| (a.approval_meta_id, a.iteration))
        .collect()
}

fn label<'a>(ctrl: &'a WorkflowObjectCtrl<'_>) -> &'a str {
    ctrl.state()
        .map(|state| state.label.as_str())
        .unwrap_or_default()
}

#[async_std::test]
async fn test_register_workflow() -> anyhow::Result<()> {
    let platform = create_sqlite_platform(Builder::new()).await?;
    let id = platform.register_workflow(&fixtures::linear_branch()).await?;
    let graph = platform.get_graph_for_field("ticket", "status").await?;
    assert_eq!(graph.workflow().id, id);
    assert_eq!(graph.transition_metas().len(), 4);
    assert_eq!(graph.initial_state().label, "open");

    assert!(matches!(
        platform.register_workflow(&fixtures::linear_branch()).await,
        Err(Error::Configuration(ConfigurationError::DuplicateWorkflow(..))),
    ));
    assert!(matches!(
        platform.get_graph_for_field("ticket", "priority").await,
        Err(Error::UnknownWorkflow(..)),
    ));

    // states are shared by label across workflows
    platform.register_workflow(&fixtures::advanced_cycle()).await?;
    assert_eq!(platform.list_workflows().await?.len(), 2);
    Ok(())
}

#[async_std::test]
async fn test_register_repeated_approver() -> anyhow::Result<()> {
    let platform = create_sqlite_platform(Builder::new()).await?;
    let mut def = fixtures::branching();
    def.transitions[0].approvals[0] = ApprovalDef::open()
        .permission("document.review")
        .permission("document.review");
    assert!(matches!(
        platform.register_workflow(&def).await,
        Err(Error::Configuration(ConfigurationError::DuplicatePermission { .. })),
    ));
    assert!(platform.list_workflows().await?.is_empty());
    assert!(platform.wf_platform().list_states().await?.is_empty());

    // the field is still free for a valid definition
    let id = platform.register_workflow(&fixtures::branching()).await?;
    assert_eq!(platform.get_graph_for_field("document", "status").await?.workflow().id, id);
    Ok(())
}

#[async_std::test]
async fn test_register_object() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new(),
        &fixtures::branching(),
    ).await?;
    let ctrl = platform.register_object(id, "doc-1").await?;
    assert!(ctrl.is_initial());
    assert_eq!(ctrl.status(), ObjectStatus::Active);
    assert_eq!(pairs(&ctrl), [(1, 0), (2, 1), (3, 1), (4, 1)]);
    assert_eq!(ctrl.next_approvals().len(), 1);

    // registering again returns the same object without new approvals
    let again = platform.register_object(id, "doc-1").await?;
    assert_eq!(again.object().id, ctrl.object().id);
    assert_eq!(pairs(&again), pairs(&ctrl));

    assert!(matches!(
        platform.get_object(id, "doc-2").await,
        Err(Error::UnknownObject(_, _)),
    ));
    Ok(())
}

#[async_std::test]
async fn test_cycle_with_tributary() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new(),
        &fixtures::cycle_with_tributary(),
    ).await?;
    let admin = user(1, "admin");
    let mut ctrl = platform.register_object(id, "article-1").await?;

    ctrl.approve(&admin, None).await?;
    assert_eq!(label(&ctrl), "cycle_state_2");
    ctrl.approve(&admin, None).await?;
    assert_eq!(label(&ctrl), "cycle_state_2");
    ctrl.approve(&admin, None).await?;
    assert_eq!(label(&ctrl), "cycle_state_3");

    assert!(matches!(
        ctrl.approve(&admin, None).await,
        Err(Error::AmbiguousTransition { .. }),
    ));
    let states = ctrl.available_states(&admin)?
        .into_iter()
        .map(|state| state.label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(states, ["cycle_state_1", "off_the_cycle_state"]);

    let next_state = ctrl.state_id("cycle_state_1")?;
    ctrl.approve(&admin, Some(next_state)).await?;
    assert_eq!(label(&ctrl), "cycle_state_1");
    assert!(ctrl.is_initial());
    assert_eq!(ctrl.object().version, 4);
    assert_eq!(pairs(&ctrl), [
        (1, 0), (2, 1), (3, 1), (4, 2), (5, 2),
        (1, 3), (2, 4), (3, 4), (4, 5), (5, 5),
    ]);
    let tributary = ctrl.approvals()
        .iter()
        .filter(|a| a.approval_meta_id == 5)
        .map(|a| (a.iteration, a.status))
        .collect::<Vec<_>>();
    assert_eq!(tributary, [
        (2, ApprovalStatus::Cancelled),
        (5, ApprovalStatus::Pending),
    ]);
    // transitions are reused by every cycle
    assert_eq!(ctrl.transitions().await?.len(), 4);

    let recent = ctrl.recent_approval().expect("an approved row");
    assert_eq!(recent.approval_meta_id, 4);
    assert_eq!(recent.transactioner, Some(1));

    // a fresh read agrees with the handle
    let reread = platform.get_object(id, "article-1").await?;
    assert_eq!(reread.object(), ctrl.object());
    assert_eq!(reread.approvals(), ctrl.approvals());
    Ok(())
}

#[async_std::test]
async fn test_advanced_cycle() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new(),
        &fixtures::advanced_cycle(),
    ).await?;
    let admin = user(1, "admin");
    let mut ctrl = platform.register_object(id, "issue-1").await?;
    assert_eq!(pairs(&ctrl), [(1, 0), (2, 1), (3, 2), (5, 2), (4, 3), (6, 3)]);

    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, None).await?;
    assert_eq!(label(&ctrl), "resolved");
    ctrl.approve(&admin, Some(ctrl.state_id("re_opened")?)).await?;
    ctrl.approve(&admin, None).await?;
    assert_eq!(label(&ctrl), "in_progress");
    assert_eq!(pairs(&ctrl), [
        (1, 0), (2, 1), (3, 2), (5, 2), (4, 3), (6, 3),
        (2, 4), (3, 5), (5, 5), (4, 6), (6, 6),
    ]);

    ctrl.approve(&admin, None).await?;
    ctrl.approve(&admin, Some(ctrl.state_id("closed")?)).await?;
    ctrl.approve(&admin, None).await?;
    assert_eq!(label(&ctrl), "final");
    assert!(ctrl.is_final());
    assert_eq!(ctrl.status(), ObjectStatus::Final);
    assert!(ctrl.next_approvals().is_empty());
    assert!(ctrl.approvals()
        .iter()
        .all(|a| a.status != ApprovalStatus::Pending));
    Ok(())
}

#[async_std::test]
async fn test_self_loop() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new(),
        &fixtures::self_loop(),
    ).await?;
    let admin = user(1, "admin");
    let mut ctrl = platform.register_object(id, "page-1").await?;
    let draft = ctrl.state_id("draft")?;
    for _ in 0..2 {
        ctrl.approve(&admin, Some(draft)).await?;
        assert_eq!(label(&ctrl), "draft");
    }
    let revisions = ctrl.approvals()
        .iter()
        .filter(|a| a.approval_meta_id == 1)
        .map(|a| (a.iteration, a.status))
        .collect::<Vec<_>>();
    assert_eq!(revisions, [
        (0, ApprovalStatus::Approved),
        (1, ApprovalStatus::Approved),
        (2, ApprovalStatus::Pending),
    ]);
    assert_eq!(ctrl.transitions().await?.len(), 2);
    assert_eq!(ctrl.object().version, 2);
    Ok(())
}

#[async_std::test]
async fn test_first_available() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new().branch_policy(BranchPolicy::FirstAvailable),
        &fixtures::self_loop(),
    ).await?;
    let mut ctrl = platform.register_object(id, "page-1").await?;
    ctrl.approve(&user(1, "admin"), None).await?;
    assert_eq!(label(&ctrl), "draft");
    Ok(())
}

#[async_std::test]
async fn test_permissions() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new(),
        &fixtures::cycle_with_tributary(),
    ).await?;
    let editor = user(2, "editor");
    let mut ctrl = platform.register_object(id, "article-1").await?;

    assert!(matches!(
        ctrl.approve(&Principal::Anonymous, None).await,
        Err(Error::Permission(PermissionError::Anonymous)),
    ));
    assert!(matches!(
        ctrl.approve(&editor, Some(ctrl.state_id("cycle_state_3")?)).await,
        Err(Error::InvalidNextState { .. }),
    ));
    assert!(matches!(
        ctrl.state_id("nowhere"),
        Err(Error::UnknownState(_)),
    ));

    ctrl.approve(&editor, None).await?;
    ctrl.approve(&editor, None).await?;
    // the review step is beyond the editor
    assert!(ctrl.available_approvals(&editor)?.is_empty());
    assert!(matches!(
        ctrl.approve(&editor, None).await,
        Err(Error::Permission(PermissionError::NoAvailableApproval(_))),
    ));
    assert_eq!(ctrl.available_approvals(&user(1, "admin"))?.len(), 1);
    assert_eq!(label(&ctrl), "cycle_state_2");
    Ok(())
}

#[async_std::test]
async fn test_stale_handle() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new(),
        &fixtures::branching(),
    ).await?;
    let admin = user(1, "admin");
    platform.register_object(id, "doc-1").await?;
    let mut first = platform.get_object(id, "doc-1").await?;
    let mut second = platform.get_object(id, "doc-1").await?;

    first.approve(&admin, None).await?;
    assert!(matches!(
        second.approve(&admin, None).await,
        Err(Error::Backend(BackendError::Conflict(_))),
    ));
    // nothing was written by the losing request
    second.refresh().await?;
    assert_eq!(second.object(), first.object());
    assert_eq!(second.approvals(), first.approvals());

    second.approve(&admin, Some(second.state_id("state3")?)).await?;
    assert_eq!(second.object().version, 2);
    Ok(())
}

#[async_std::test]
async fn test_reject_block() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new(),
        &fixtures::branching(),
    ).await?;
    let admin = user(1, "admin");
    let mut ctrl = platform.register_object(id, "doc-1").await?;
    ctrl.reject(&admin, None).await?;
    assert_eq!(ctrl.status(), ObjectStatus::Blocked);
    assert_eq!(ctrl.approvals()[0].status, ApprovalStatus::Rejected);
    assert_eq!(ctrl.approvals()[0].transactioner, Some(1));
    assert!(matches!(
        ctrl.approve(&admin, None).await,
        Err(Error::Permission(PermissionError::NoAvailableApproval(_))),
    ));
    assert!(platform.get_on_approval_objects(id, &admin).await?.is_empty());
    Ok(())
}

#[async_std::test]
async fn test_reject_retry() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new().rejection_policy(RejectionPolicy::Retry),
        &fixtures::branching(),
    ).await?;
    let admin = user(1, "admin");
    let mut ctrl = platform.register_object(id, "doc-1").await?;
    ctrl.reject(&admin, None).await?;
    assert_eq!(ctrl.status(), ObjectStatus::Active);
    assert_eq!(pairs(&ctrl), [(1, 0), (2, 1), (3, 1), (4, 1), (1, 1)]);

    ctrl.approve(&admin, None).await?;
    assert_eq!(label(&ctrl), "state2");

    // the second step of the pair is cancelled with the first
    ctrl.reject(&admin, Some(ctrl.state_id("state3")?)).await?;
    let statuses = ctrl.approvals()
        .iter()
        .filter(|a| a.approval_meta_id == 2 || a.approval_meta_id == 3)
        .map(|a| (a.approval_meta_id, a.iteration, a.status))
        .collect::<Vec<_>>();
    assert_eq!(statuses, [
        (2, 1, ApprovalStatus::Rejected),
        (3, 1, ApprovalStatus::Cancelled),
        (2, 2, ApprovalStatus::Pending),
        (3, 2, ApprovalStatus::Pending),
    ]);
    Ok(())
}

#[async_std::test]
async fn test_on_approval_objects() -> anyhow::Result<()> {
    let (platform, id) = create_sqlite_platform_with(
        Builder::new(),
        &fixtures::cycle_with_tributary(),
    ).await?;
    let admin = user(1, "admin");
    let editor = user(2, "editor");
    let mut first = platform.register_object(id, "article-1").await?;
    platform.register_object(id, "article-2").await?;
    first.approve(&admin, None).await?;
    first.approve(&admin, None).await?;

    let object_ids = |ctrls: Vec<WorkflowObjectCtrl<'_>>| ctrls.into_iter()
        .map(|ctrl| ctrl.object().object_id.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        object_ids(platform.get_on_approval_objects(id, &editor).await?),
        ["article-2"],
    );
    assert_eq!(
        object_ids(platform.get_on_approval_objects(id, &admin).await?),
        ["article-1", "article-2"],
    );
    assert!(platform.get_on_approval_objects(id, &Principal::Anonymous).await?.is_empty());
    Ok(())
}
