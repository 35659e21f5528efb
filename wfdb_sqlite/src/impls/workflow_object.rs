use async_trait::async_trait;
use sqlx::{
    Row,
    SqliteConnection,
    sqlite::SqliteRow,
};
use wfcore::{
    approval::{
        Approval,
        ApprovalStatus,
        Approvals,
        Commit,
        NewApproval,
        Transition,
        WorkflowObject,
        traits::WorkflowObjectBackend,
    },
    error::{
        BackendError,
        ValueError,
    },
};

use crate::{
    SqliteBackend,
    chrono::Utc,
};

const SELECT_WORKFLOW_OBJECT: &str = r#"
SELECT
    id,
    workflow_id,
    object_id,
    state_id,
    version,
    created_ts
FROM
    workflow_object
"#;

const SELECT_APPROVAL: &str = r#"
SELECT
    a.id,
    a.workflow_id,
    a.workflow_object_id,
    a.approval_meta_id,
    a.transition_id,
    t.transition_meta_id,
    a.iteration,
    a.status,
    a.transactioner,
    a.transaction_ts,
    a.previous_id
FROM
    approval a
    JOIN transition t ON t.id = a.transition_id
"#;

fn workflow_object_from_row(row: SqliteRow) -> Result<WorkflowObject, sqlx::Error> {
    Ok(WorkflowObject {
        id: row.try_get("id")?,
        workflow_id: row.try_get("workflow_id")?,
        object_id: row.try_get("object_id")?,
        state_id: row.try_get("state_id")?,
        version: row.try_get("version")?,
        created_ts: row.try_get("created_ts")?,
    })
}

fn approval_from_row(row: SqliteRow) -> Result<Approval, sqlx::Error> {
    Ok(Approval {
        id: row.try_get("id")?,
        workflow_id: row.try_get("workflow_id")?,
        workflow_object_id: row.try_get("workflow_object_id")?,
        approval_meta_id: row.try_get("approval_meta_id")?,
        transition_id: row.try_get("transition_id")?,
        transition_meta_id: row.try_get("transition_meta_id")?,
        iteration: row.try_get("iteration")?,
        status: row.try_get::<String, _>("status")?
            .parse()
            .map_err(|e: ValueError| sqlx::Error::Decode(Box::new(e)))?,
        transactioner: row.try_get("transactioner")?,
        transaction_ts: row.try_get("transaction_ts")?,
        previous_id: row.try_get("previous_id")?,
    })
}

async fn select_workflow_object(
    conn: &mut SqliteConnection,
    workflow_id: i64,
    object_id: &str,
) -> Result<Option<WorkflowObject>, sqlx::Error> {
    sqlx::query(&format!(
            "{SELECT_WORKFLOW_OBJECT} WHERE workflow_id = ?1 AND object_id = ?2"
        ))
        .bind(workflow_id)
        .bind(object_id)
        .try_map(workflow_object_from_row)
        .fetch_optional(&mut *conn)
        .await
}

/// Creates the approvals and their transitions, skipping any that already
/// exist.
async fn materialize(
    conn: &mut SqliteConnection,
    workflow_id: i64,
    workflow_object_id: i64,
    approvals: &[NewApproval],
) -> Result<(), sqlx::Error> {
    for new in approvals {
        sqlx::query(r#"
INSERT INTO transition (
    workflow_id,
    workflow_object_id,
    transition_meta_id
)
VALUES ( ?1, ?2, ?3 )
ON CONFLICT (workflow_object_id, transition_meta_id) DO NOTHING
            "#)
            .bind(workflow_id)
            .bind(workflow_object_id)
            .bind(new.transition_meta_id)
            .execute(&mut *conn)
            .await?;
        let transition_id: i64 = sqlx::query(r#"
SELECT id FROM transition WHERE workflow_object_id = ?1 AND transition_meta_id = ?2
            "#)
            .bind(workflow_object_id)
            .bind(new.transition_meta_id)
            .try_map(|row: SqliteRow| row.try_get("id"))
            .fetch_one(&mut *conn)
            .await?;
        let inserted = sqlx::query(r#"
INSERT INTO approval (
    workflow_id,
    workflow_object_id,
    approval_meta_id,
    transition_id,
    status,
    iteration
)
VALUES ( ?1, ?2, ?3, ?4, ?5, ?6 )
ON CONFLICT (workflow_object_id, approval_meta_id, iteration) DO NOTHING
            "#)
            .bind(workflow_id)
            .bind(workflow_object_id)
            .bind(new.approval_meta_id)
            .bind(transition_id)
            .bind(ApprovalStatus::Pending.as_str())
            .bind(new.iteration)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        if inserted == 0 {
            log::debug!(
                "approval for meta {} at iteration {} exists for workflow object {}",
                new.approval_meta_id,
                new.iteration,
                workflow_object_id,
            );
        }
    }
    Ok(())
}

async fn create_workflow_object_sqlite(
    backend: &SqliteBackend,
    workflow_id: i64,
    object_id: &str,
    state_id: i64,
    approvals: &[NewApproval],
) -> Result<WorkflowObject, BackendError> {
    let ts = Utc::now().timestamp();
    let mut tx = backend.pool.begin().await?;
    let result = sqlx::query(r#"
INSERT INTO workflow_object (
    workflow_id,
    object_id,
    state_id,
    version,
    created_ts
)
VALUES ( ?1, ?2, ?3, 0, ?4 )
ON CONFLICT (workflow_id, object_id) DO NOTHING
        "#)
        .bind(workflow_id)
        .bind(object_id)
        .bind(state_id)
        .bind(ts)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() > 0 {
        materialize(&mut *tx, workflow_id, result.last_insert_rowid(), approvals).await?;
    } else {
        log::debug!("object {object_id} already registered with workflow {workflow_id}");
    }
    let object = select_workflow_object(&mut *tx, workflow_id, object_id)
        .await?
        .ok_or_else(|| BackendError::AppInvariantViolation(format!(
            "object {object_id} missing after registration with workflow {workflow_id}"
        )))?;
    tx.commit().await?;
    Ok(object)
}

async fn get_workflow_object_sqlite(
    backend: &SqliteBackend,
    workflow_id: i64,
    object_id: &str,
) -> Result<Option<WorkflowObject>, BackendError> {
    let mut conn = backend.pool.acquire().await?;
    Ok(select_workflow_object(&mut *conn, workflow_id, object_id).await?)
}

async fn get_workflow_object_by_id_sqlite(
    backend: &SqliteBackend,
    id: i64,
) -> Result<WorkflowObject, BackendError> {
    let rec = sqlx::query(&format!("{SELECT_WORKFLOW_OBJECT} WHERE id = ?1"))
        .bind(id)
        .try_map(workflow_object_from_row)
        .fetch_one(&*backend.pool)
        .await?;
    Ok(rec)
}

async fn list_workflow_objects_sqlite(
    backend: &SqliteBackend,
    workflow_id: i64,
) -> Result<Vec<WorkflowObject>, BackendError> {
    let recs = sqlx::query(&format!(
            "{SELECT_WORKFLOW_OBJECT} WHERE workflow_id = ?1 ORDER BY id"
        ))
        .bind(workflow_id)
        .try_map(workflow_object_from_row)
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs)
}

async fn list_transitions_sqlite(
    backend: &SqliteBackend,
    workflow_object_id: i64,
) -> Result<Vec<Transition>, BackendError> {
    let recs = sqlx::query(r#"
SELECT
    id,
    workflow_id,
    workflow_object_id,
    transition_meta_id
FROM
    transition
WHERE
    workflow_object_id = ?1
ORDER BY id
        "#)
        .bind(workflow_object_id)
        .try_map(|row: SqliteRow| Ok(Transition {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            workflow_object_id: row.try_get("workflow_object_id")?,
            transition_meta_id: row.try_get("transition_meta_id")?,
        }))
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs)
}

async fn list_approvals_sqlite(
    backend: &SqliteBackend,
    workflow_object_id: i64,
) -> Result<Approvals, BackendError> {
    let recs = sqlx::query(&format!(
            "{SELECT_APPROVAL} WHERE a.workflow_object_id = ?1 ORDER BY a.id"
        ))
        .bind(workflow_object_id)
        .try_map(approval_from_row)
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs.into())
}

async fn list_approvals_by_status_sqlite(
    backend: &SqliteBackend,
    workflow_id: i64,
    status: ApprovalStatus,
) -> Result<Approvals, BackendError> {
    let recs = sqlx::query(&format!(
            "{SELECT_APPROVAL} WHERE a.workflow_id = ?1 AND a.status = ?2 ORDER BY a.id"
        ))
        .bind(workflow_id)
        .bind(status.as_str())
        .try_map(approval_from_row)
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs.into())
}

async fn apply_commit_sqlite(
    backend: &SqliteBackend,
    commit: &Commit,
) -> Result<WorkflowObject, BackendError> {
    let mut tx = backend.pool.begin().await?;
    let updated = sqlx::query(r#"
UPDATE workflow_object
SET
    state_id = COALESCE(?1, state_id),
    version = version + 1
WHERE
    id = ?2 AND version = ?3
        "#)
        .bind(commit.state_id)
        .bind(commit.workflow_object_id)
        .bind(commit.expected_version)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(BackendError::Conflict(format!(
            "workflow object {} is no longer at version {}",
            commit.workflow_object_id,
            commit.expected_version,
        )));
    }

    for update in commit.updates.iter() {
        let updated = sqlx::query(r#"
UPDATE approval
SET
    status = ?1,
    transactioner = ?2,
    transaction_ts = ?3,
    previous_id = ?4
WHERE
    id = ?5 AND workflow_object_id = ?6 AND status = ?7
            "#)
            .bind(update.status.as_str())
            .bind(update.transactioner)
            .bind(update.transaction_ts)
            .bind(update.previous_id)
            .bind(update.id)
            .bind(commit.workflow_object_id)
            .bind(update.expected.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(BackendError::Conflict(format!(
                "approval {} is no longer {}",
                update.id,
                update.expected,
            )));
        }
    }

    materialize(
        &mut *tx,
        commit.workflow_id,
        commit.workflow_object_id,
        &commit.materialize,
    ).await?;

    let object = sqlx::query(&format!("{SELECT_WORKFLOW_OBJECT} WHERE id = ?1"))
        .bind(commit.workflow_object_id)
        .try_map(workflow_object_from_row)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    log::trace!(
        "applied commit to workflow object {}: {} update(s), {} new approval(s)",
        commit.workflow_object_id,
        commit.updates.len(),
        commit.materialize.len(),
    );
    Ok(object)
}

#[async_trait]
impl WorkflowObjectBackend for SqliteBackend {
    async fn create_workflow_object(
        &self,
        workflow_id: i64,
        object_id: &str,
        state_id: i64,
        materialize: &[NewApproval],
    ) -> Result<WorkflowObject, BackendError> {
        create_workflow_object_sqlite(
            &self,
            workflow_id,
            object_id,
            state_id,
            materialize,
        ).await
    }

    async fn get_workflow_object(
        &self,
        workflow_id: i64,
        object_id: &str,
    ) -> Result<Option<WorkflowObject>, BackendError> {
        get_workflow_object_sqlite(
            &self,
            workflow_id,
            object_id,
        ).await
    }

    async fn get_workflow_object_by_id(
        &self,
        id: i64,
    ) -> Result<WorkflowObject, BackendError> {
        get_workflow_object_by_id_sqlite(
            &self,
            id,
        ).await
    }

    async fn list_workflow_objects(
        &self,
        workflow_id: i64,
    ) -> Result<Vec<WorkflowObject>, BackendError> {
        list_workflow_objects_sqlite(
            &self,
            workflow_id,
        ).await
    }

    async fn list_transitions(
        &self,
        workflow_object_id: i64,
    ) -> Result<Vec<Transition>, BackendError> {
        list_transitions_sqlite(
            &self,
            workflow_object_id,
        ).await
    }

    async fn list_approvals(
        &self,
        workflow_object_id: i64,
    ) -> Result<Approvals, BackendError> {
        list_approvals_sqlite(
            &self,
            workflow_object_id,
        ).await
    }

    async fn list_approvals_by_status(
        &self,
        workflow_id: i64,
        status: ApprovalStatus,
    ) -> Result<Approvals, BackendError> {
        list_approvals_by_status_sqlite(
            &self,
            workflow_id,
            status,
        ).await
    }

    async fn apply_commit(
        &self,
        commit: &Commit,
    ) -> Result<WorkflowObject, BackendError> {
        apply_commit_sqlite(
            &self,
            commit,
        ).await
    }
}
