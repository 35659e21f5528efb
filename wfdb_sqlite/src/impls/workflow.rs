use async_trait::async_trait;
use sqlx::{
    Row,
    SqliteConnection,
    sqlite::SqliteRow,
};
use std::collections::HashMap;
use wfcore::{
    error::BackendError,
    workflow::{
        ApprovalDef,
        ApprovalMeta,
        TransitionMeta,
        Workflow,
        WorkflowDef,
        traits::WorkflowBackend,
    },
};

use crate::{
    SqliteBackend,
    chrono::Utc,
    impls::state::insert_or_select_state,
};

async fn insert_workflow(
    conn: &mut SqliteConnection,
    content_type: &str,
    field_name: &str,
    initial_state_id: i64,
) -> Result<i64, sqlx::Error> {
    let ts = Utc::now().timestamp();
    let id = sqlx::query(r#"
INSERT INTO workflow (
    content_type,
    field_name,
    initial_state_id,
    created_ts
)
VALUES ( ?1, ?2, ?3, ?4 )
        "#)
        .bind(content_type)
        .bind(field_name)
        .bind(initial_state_id)
        .bind(ts)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    Ok(id)
}

async fn insert_transition_meta(
    conn: &mut SqliteConnection,
    workflow_id: i64,
    source_state_id: i64,
    destination_state_id: i64,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query(r#"
INSERT INTO transition_meta (
    workflow_id,
    source_state_id,
    destination_state_id
)
VALUES ( ?1, ?2, ?3 )
        "#)
        .bind(workflow_id)
        .bind(source_state_id)
        .bind(destination_state_id)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    Ok(id)
}

async fn insert_approval_meta(
    conn: &mut SqliteConnection,
    workflow_id: i64,
    transition_meta_id: i64,
    priority: i64,
    step: &ApprovalDef,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query(r#"
INSERT INTO approval_meta (
    workflow_id,
    transition_meta_id,
    priority
)
VALUES ( ?1, ?2, ?3 )
        "#)
        .bind(workflow_id)
        .bind(transition_meta_id)
        .bind(priority)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    for permission in step.permissions.iter() {
        sqlx::query(r#"
INSERT INTO approval_meta_permission ( approval_meta_id, permission )
VALUES ( ?1, ?2 )
            "#)
            .bind(id)
            .bind(permission)
            .execute(&mut *conn)
            .await?;
    }
    for user_id in step.users.iter() {
        sqlx::query(r#"
INSERT INTO approval_meta_user ( approval_meta_id, user_id )
VALUES ( ?1, ?2 )
            "#)
            .bind(id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(id)
}

async fn add_workflow_definition_sqlite(
    backend: &SqliteBackend,
    def: &WorkflowDef,
) -> Result<i64, BackendError> {
    let initial = def.initial_state()
        .map_err(|e| BackendError::AppInvariantViolation(e.to_string()))?;
    let mut tx = backend.pool.begin().await?;
    let mut state_ids = HashMap::new();
    for state in def.states.iter() {
        let id = insert_or_select_state(&mut *tx, &state.label, &state.description).await?;
        state_ids.insert(state.label.as_str(), id);
    }
    let lookup = |label: &str| state_ids.get(label)
        .copied()
        .ok_or_else(|| BackendError::AppInvariantViolation(
            format!("transition references undeclared state {label}")
        ));

    let workflow_id = insert_workflow(
        &mut *tx,
        &def.content_type,
        &def.field_name,
        lookup(&initial.label)?,
    ).await?;
    for transition in def.transitions.iter() {
        let transition_meta_id = insert_transition_meta(
            &mut *tx,
            workflow_id,
            lookup(&transition.source)?,
            lookup(&transition.destination)?,
        ).await?;
        for (priority, step) in transition.steps() {
            insert_approval_meta(
                &mut *tx,
                workflow_id,
                transition_meta_id,
                priority,
                step,
            ).await?;
        }
    }
    tx.commit().await?;
    Ok(workflow_id)
}

const SELECT_WORKFLOW: &str = r#"
SELECT
    id,
    content_type,
    field_name,
    initial_state_id,
    created_ts
FROM
    workflow
"#;

fn workflow_from_row(row: SqliteRow) -> Result<Workflow, sqlx::Error> {
    Ok(Workflow {
        id: row.try_get("id")?,
        content_type: row.try_get("content_type")?,
        field_name: row.try_get("field_name")?,
        initial_state_id: row.try_get("initial_state_id")?,
        created_ts: row.try_get("created_ts")?,
    })
}

async fn get_workflow_by_id_sqlite(
    backend: &SqliteBackend,
    id: i64,
) -> Result<Workflow, BackendError> {
    let rec = sqlx::query(&format!("{SELECT_WORKFLOW} WHERE id = ?1"))
        .bind(id)
        .try_map(workflow_from_row)
        .fetch_one(&*backend.pool)
        .await?;
    Ok(rec)
}

async fn get_workflow_for_field_sqlite(
    backend: &SqliteBackend,
    content_type: &str,
    field_name: &str,
) -> Result<Option<Workflow>, BackendError> {
    let rec = sqlx::query(&format!(
            "{SELECT_WORKFLOW} WHERE content_type = ?1 AND field_name = ?2"
        ))
        .bind(content_type)
        .bind(field_name)
        .try_map(workflow_from_row)
        .fetch_optional(&*backend.pool)
        .await?;
    Ok(rec)
}

async fn list_workflows_sqlite(
    backend: &SqliteBackend,
) -> Result<Vec<Workflow>, BackendError> {
    let recs = sqlx::query(&format!("{SELECT_WORKFLOW} ORDER BY id"))
        .try_map(workflow_from_row)
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs)
}

async fn list_transition_metas_sqlite(
    backend: &SqliteBackend,
    workflow_id: i64,
) -> Result<Vec<TransitionMeta>, BackendError> {
    let recs = sqlx::query(r#"
SELECT
    id,
    workflow_id,
    source_state_id,
    destination_state_id
FROM
    transition_meta
WHERE
    workflow_id = ?1
ORDER BY id
        "#)
        .bind(workflow_id)
        .try_map(|row: SqliteRow| Ok(TransitionMeta {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            source_state_id: row.try_get("source_state_id")?,
            destination_state_id: row.try_get("destination_state_id")?,
        }))
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs)
}

async fn list_approval_metas_sqlite(
    backend: &SqliteBackend,
    workflow_id: i64,
) -> Result<Vec<ApprovalMeta>, BackendError> {
    let mut permissions: HashMap<i64, Vec<String>> = HashMap::new();
    let rows: Vec<(i64, String)> = sqlx::query(r#"
SELECT
    p.approval_meta_id,
    p.permission
FROM
    approval_meta_permission p
    JOIN approval_meta m ON m.id = p.approval_meta_id
WHERE
    m.workflow_id = ?1
ORDER BY p.id
        "#)
        .bind(workflow_id)
        .try_map(|row: SqliteRow| Ok((row.try_get(0)?, row.try_get(1)?)))
        .fetch_all(&*backend.pool)
        .await?;
    for (id, permission) in rows {
        permissions.entry(id).or_default().push(permission);
    }

    let mut users: HashMap<i64, Vec<i64>> = HashMap::new();
    let rows: Vec<(i64, i64)> = sqlx::query(r#"
SELECT
    u.approval_meta_id,
    u.user_id
FROM
    approval_meta_user u
    JOIN approval_meta m ON m.id = u.approval_meta_id
WHERE
    m.workflow_id = ?1
ORDER BY u.id
        "#)
        .bind(workflow_id)
        .try_map(|row: SqliteRow| Ok((row.try_get(0)?, row.try_get(1)?)))
        .fetch_all(&*backend.pool)
        .await?;
    for (id, user_id) in rows {
        users.entry(id).or_default().push(user_id);
    }

    let recs = sqlx::query(r#"
SELECT
    id,
    workflow_id,
    transition_meta_id,
    priority
FROM
    approval_meta
WHERE
    workflow_id = ?1
ORDER BY transition_meta_id, priority
        "#)
        .bind(workflow_id)
        .try_map(|row: SqliteRow| {
            let id = row.try_get("id")?;
            Ok(ApprovalMeta {
                id,
                workflow_id: row.try_get("workflow_id")?,
                transition_meta_id: row.try_get("transition_meta_id")?,
                priority: row.try_get("priority")?,
                permissions: permissions.remove(&id).unwrap_or_default(),
                users: users.remove(&id).unwrap_or_default(),
            })
        })
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs)
}

#[async_trait]
impl WorkflowBackend for SqliteBackend {
    async fn add_workflow_definition(
        &self,
        def: &WorkflowDef,
    ) -> Result<i64, BackendError> {
        add_workflow_definition_sqlite(
            &self,
            def,
        ).await
    }

    async fn get_workflow_by_id(
        &self,
        id: i64,
    ) -> Result<Workflow, BackendError> {
        get_workflow_by_id_sqlite(
            &self,
            id,
        ).await
    }

    async fn get_workflow_for_field(
        &self,
        content_type: &str,
        field_name: &str,
    ) -> Result<Option<Workflow>, BackendError> {
        get_workflow_for_field_sqlite(
            &self,
            content_type,
            field_name,
        ).await
    }

    async fn list_workflows(
        &self,
    ) -> Result<Vec<Workflow>, BackendError> {
        list_workflows_sqlite(
            &self,
        ).await
    }

    async fn list_transition_metas(
        &self,
        workflow_id: i64,
    ) -> Result<Vec<TransitionMeta>, BackendError> {
        list_transition_metas_sqlite(
            &self,
            workflow_id,
        ).await
    }

    async fn list_approval_metas(
        &self,
        workflow_id: i64,
    ) -> Result<Vec<ApprovalMeta>, BackendError> {
        list_approval_metas_sqlite(
            &self,
            workflow_id,
        ).await
    }
}
