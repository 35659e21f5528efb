use async_trait::async_trait;
use sqlx::{
    Executor,
    Row,
    SqliteConnection,
    sqlite::SqliteRow,
};
use wfcore::{
    approval::Transition,
    error::{
        BackendError,
        ConsistencyError,
    },
    schema::{
        ApprovalMetaRecord,
        ApprovalRecord,
        ApprovalSchema,
        RecordSet,
        StatusEncoding,
        StatusValue,
        TransitionLink,
        TransitionRefForm,
        traits::SchemaBackend,
    },
    workflow::TransitionMeta,
};

use crate::SqliteBackend;

fn link_columns(form: TransitionRefForm, id_column: &str) -> Vec<&str> {
    match form {
        TransitionRefForm::Meta => vec![id_column],
        TransitionRefForm::StatePair => vec!["source_state_id", "destination_state_id"],
    }
}

/// One placeholder per column, so the bindings must follow the column order.
fn insert_statement<'a>(
    table: &str,
    columns: impl IntoIterator<Item = &'a str>,
) -> String {
    let columns = columns.into_iter().collect::<Vec<_>>();
    format!(
        "INSERT INTO {table} ( {} ) VALUES ( {} )",
        columns.join(", "),
        vec!["?"; columns.len()].join(", "),
    )
}

pub(crate) fn approval_meta_ddl(form: TransitionRefForm) -> String {
    let (link, references, unique) = match form {
        TransitionRefForm::Meta => (
            "    transition_meta_id INTEGER NOT NULL,\n",
            "    FOREIGN KEY(transition_meta_id) REFERENCES transition_meta(id),\n",
            "transition_meta_id, priority",
        ),
        TransitionRefForm::StatePair => (
            "    source_state_id INTEGER NOT NULL,\n    destination_state_id INTEGER NOT NULL,\n",
            "    FOREIGN KEY(source_state_id) REFERENCES state(id),\n    FOREIGN KEY(destination_state_id) REFERENCES state(id),\n",
            "workflow_id, source_state_id, destination_state_id, priority",
        ),
    };
    format!("\
CREATE TABLE approval_meta (
    id INTEGER PRIMARY KEY NOT NULL,
    workflow_id INTEGER NOT NULL,
{link}    priority INTEGER NOT NULL,
    FOREIGN KEY(workflow_id) REFERENCES workflow(id),
{references}    UNIQUE({unique})
);
")
}

pub(crate) fn approval_ddl(schema: &ApprovalSchema) -> String {
    let (link, references) = match schema.transition_ref {
        TransitionRefForm::Meta => (
            "    transition_id INTEGER NOT NULL,\n",
            "    FOREIGN KEY(transition_id) REFERENCES transition(id),\n",
        ),
        TransitionRefForm::StatePair => (
            "    source_state_id INTEGER NOT NULL,\n    destination_state_id INTEGER NOT NULL,\n",
            "    FOREIGN KEY(source_state_id) REFERENCES state(id),\n    FOREIGN KEY(destination_state_id) REFERENCES state(id),\n",
        ),
    };
    let status = match schema.status {
        StatusEncoding::Symbolic => "TEXT",
        StatusEncoding::Integer => "INTEGER",
    };
    let (iteration, unique) = if schema.iteration {
        (
            "    iteration INTEGER NOT NULL,\n",
            ",\n    UNIQUE(workflow_object_id, approval_meta_id, iteration)",
        )
    } else {
        ("", "")
    };
    format!("\
CREATE TABLE approval (
    id INTEGER PRIMARY KEY NOT NULL,
    workflow_id INTEGER NOT NULL,
    workflow_object_id INTEGER NOT NULL,
    approval_meta_id INTEGER NOT NULL,
{link}    status {status} NOT NULL,
{iteration}    transactioner INTEGER,
    transaction_ts INTEGER,
    previous_id INTEGER,
    FOREIGN KEY(workflow_id) REFERENCES workflow(id),
    FOREIGN KEY(workflow_object_id) REFERENCES workflow_object(id),
    FOREIGN KEY(approval_meta_id) REFERENCES approval_meta(id),
{references}    FOREIGN KEY(previous_id) REFERENCES approval(id){unique}
);

CREATE INDEX IF NOT EXISTS approval_workflow_object_id ON approval(workflow_object_id);
")
}

async fn columns(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query("SELECT name, type FROM pragma_table_info(?1)")
        .bind(table)
        .try_map(|row: SqliteRow| Ok((row.try_get(0)?, row.try_get(1)?)))
        .fetch_all(&mut *conn)
        .await
}

fn ref_form(
    table: &str,
    columns: &[(String, String)],
    id_column: &str,
) -> Result<TransitionRefForm, ConsistencyError> {
    let has = |name: &str| columns.iter().any(|(n, _)| n == name);
    if has(id_column) {
        Ok(TransitionRefForm::Meta)
    } else if has("source_state_id") && has("destination_state_id") {
        Ok(TransitionRefForm::StatePair)
    } else {
        Err(ConsistencyError::UnrecognizedSchema(format!(
            "{table} has no reference to a transition"
        )))
    }
}

pub(crate) fn detect(
    approval: &[(String, String)],
    approval_meta: &[(String, String)],
) -> Result<ApprovalSchema, ConsistencyError> {
    if approval.is_empty() || approval_meta.is_empty() {
        return Err(ConsistencyError::UnrecognizedSchema(
            "approval tables are missing".into()
        ));
    }
    let status = match approval.iter()
        .find(|(name, _)| name == "status")
        .map(|(_, ty)| ty.to_ascii_uppercase())
        .as_deref()
    {
        Some("TEXT") => StatusEncoding::Symbolic,
        Some("INTEGER") => StatusEncoding::Integer,
        Some(ty) => return Err(ConsistencyError::UnrecognizedSchema(format!(
            "approval.status has unsupported type {ty}"
        ))),
        None => return Err(ConsistencyError::UnrecognizedSchema(
            "approval.status is missing".into()
        )),
    };
    let iteration = approval.iter().any(|(name, _)| name == "iteration");
    let transition_ref = ref_form("approval", approval, "transition_id")?;
    if ref_form("approval_meta", approval_meta, "transition_meta_id")? != transition_ref {
        return Err(ConsistencyError::UnrecognizedSchema(
            "approval and approval_meta reference transitions differently".into()
        ));
    }
    Ok(ApprovalSchema { status, iteration, transition_ref })
}

async fn introspect_sqlite(
    backend: &SqliteBackend,
) -> Result<ApprovalSchema, BackendError> {
    let mut conn = backend.pool.acquire().await?;
    let approval = columns(&mut *conn, "approval").await?;
    let approval_meta = columns(&mut *conn, "approval_meta").await?;
    Ok(detect(&approval, &approval_meta)?)
}

fn link_from_row(
    row: &SqliteRow,
    form: TransitionRefForm,
    id_column: &str,
) -> Result<TransitionLink, sqlx::Error> {
    Ok(match form {
        TransitionRefForm::Meta => TransitionLink::Id(row.try_get(id_column)?),
        TransitionRefForm::StatePair => TransitionLink::States {
            source_state_id: row.try_get("source_state_id")?,
            destination_state_id: row.try_get("destination_state_id")?,
        },
    })
}

fn status_from_row(row: &SqliteRow) -> Result<StatusValue, sqlx::Error> {
    // the declared type is advisory in sqlite; take the value as stored
    row.try_get::<i64, _>("status")
        .map(StatusValue::Integer)
        .or_else(|_| row.try_get::<String, _>("status").map(StatusValue::Symbolic))
}

async fn load_records_sqlite(
    backend: &SqliteBackend,
) -> Result<RecordSet, BackendError> {
    let schema = introspect_sqlite(backend).await?;
    let mut conn = backend.pool.acquire().await?;

    let transition_metas = sqlx::query(r#"
SELECT id, workflow_id, source_state_id, destination_state_id
FROM transition_meta
ORDER BY id
        "#)
        .try_map(|row: SqliteRow| Ok(TransitionMeta {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            source_state_id: row.try_get("source_state_id")?,
            destination_state_id: row.try_get("destination_state_id")?,
        }))
        .fetch_all(&mut *conn)
        .await?;

    let transitions = sqlx::query(r#"
SELECT id, workflow_id, workflow_object_id, transition_meta_id
FROM transition
ORDER BY id
        "#)
        .try_map(|row: SqliteRow| Ok(Transition {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            workflow_object_id: row.try_get("workflow_object_id")?,
            transition_meta_id: row.try_get("transition_meta_id")?,
        }))
        .fetch_all(&mut *conn)
        .await?;

    let form = schema.transition_ref;
    let approval_metas = sqlx::query(&format!(
            "SELECT id, workflow_id, {}, priority FROM approval_meta ORDER BY id",
            link_columns(form, "transition_meta_id").join(", "),
        ))
        .try_map(|row: SqliteRow| Ok(ApprovalMetaRecord {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            link: link_from_row(&row, form, "transition_meta_id")?,
            priority: row.try_get("priority")?,
        }))
        .fetch_all(&mut *conn)
        .await?;

    let approvals = sqlx::query(&format!(
            "SELECT id, workflow_id, workflow_object_id, approval_meta_id, {}, status, {}\
            transactioner, transaction_ts, previous_id FROM approval ORDER BY id",
            link_columns(form, "transition_id").join(", "),
            if schema.iteration { "iteration, " } else { "" },
        ))
        .try_map(|row: SqliteRow| Ok(ApprovalRecord {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            workflow_object_id: row.try_get("workflow_object_id")?,
            approval_meta_id: row.try_get("approval_meta_id")?,
            link: link_from_row(&row, form, "transition_id")?,
            status: status_from_row(&row)?,
            iteration: if schema.iteration {
                row.try_get("iteration")?
            } else {
                None
            },
            transactioner: row.try_get("transactioner")?,
            transaction_ts: row.try_get("transaction_ts")?,
            previous_id: row.try_get("previous_id")?,
        }))
        .fetch_all(&mut *conn)
        .await?;

    log::debug!(
        "loaded {} approval meta(s) and {} approval(s) in schema ({schema})",
        approval_metas.len(),
        approvals.len(),
    );
    Ok(RecordSet {
        schema,
        transition_metas,
        transitions,
        approval_metas,
        approvals,
    })
}

fn bind_link<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    link: TransitionLink,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match link {
        TransitionLink::Id(id) => query.bind(id),
        TransitionLink::States { source_state_id, destination_state_id } => query
            .bind(source_state_id)
            .bind(destination_state_id),
    }
}

fn check_link(
    table: &'static str,
    id: i64,
    form: TransitionRefForm,
    link: &TransitionLink,
) -> Result<(), BackendError> {
    match (form, link) {
        (TransitionRefForm::Meta, TransitionLink::Id(_))
            | (TransitionRefForm::StatePair, TransitionLink::States { .. }) => Ok(()),
        _ => Err(BackendError::AppInvariantViolation(format!(
            "{table} {id} does not use the transition reference of the record set"
        ))),
    }
}

async fn store_records_sqlite(
    backend: &SqliteBackend,
    records: &RecordSet,
) -> Result<(), BackendError> {
    let schema = &records.schema;
    let form = schema.transition_ref;
    let mut tx = backend.pool.begin().await?;
    sqlx::query("PRAGMA defer_foreign_keys = ON")
        .execute(&mut *tx)
        .await?;

    for meta in records.transition_metas.iter() {
        sqlx::query(r#"
INSERT INTO transition_meta ( id, workflow_id, source_state_id, destination_state_id )
VALUES ( ?1, ?2, ?3, ?4 )
ON CONFLICT (id) DO NOTHING
            "#)
            .bind(meta.id)
            .bind(meta.workflow_id)
            .bind(meta.source_state_id)
            .bind(meta.destination_state_id)
            .execute(&mut *tx)
            .await?;
    }
    for transition in records.transitions.iter() {
        sqlx::query(r#"
INSERT INTO transition ( id, workflow_id, workflow_object_id, transition_meta_id )
VALUES ( ?1, ?2, ?3, ?4 )
ON CONFLICT (id) DO NOTHING
            "#)
            .bind(transition.id)
            .bind(transition.workflow_id)
            .bind(transition.workflow_object_id)
            .bind(transition.transition_meta_id)
            .execute(&mut *tx)
            .await?;
    }

    (&mut *tx).execute(sqlx::raw_sql("DROP TABLE IF EXISTS approval; DROP TABLE IF EXISTS approval_meta;"))
        .await?;
    let meta_ddl = approval_meta_ddl(form);
    (&mut *tx).execute(sqlx::raw_sql(&meta_ddl))
        .await?;
    let ddl = approval_ddl(schema);
    (&mut *tx).execute(sqlx::raw_sql(&ddl))
        .await?;

    let insert_meta = insert_statement(
        "approval_meta",
        ["id", "workflow_id"].into_iter()
            .chain(link_columns(form, "transition_meta_id"))
            .chain(["priority"]),
    );
    for meta in records.approval_metas.iter() {
        check_link("approval_meta", meta.id, form, &meta.link)?;
        let query = sqlx::query(&insert_meta)
            .bind(meta.id)
            .bind(meta.workflow_id);
        bind_link(query, meta.link)
            .bind(meta.priority)
            .execute(&mut *tx)
            .await?;
    }

    let insert_approval = insert_statement(
        "approval",
        ["id", "workflow_id", "workflow_object_id", "approval_meta_id"].into_iter()
            .chain(link_columns(form, "transition_id"))
            .chain(["status"])
            .chain(schema.iteration.then_some("iteration"))
            .chain(["transactioner", "transaction_ts", "previous_id"]),
    );
    for approval in records.approvals.iter() {
        check_link("approval", approval.id, form, &approval.link)?;
        let query = sqlx::query(&insert_approval)
            .bind(approval.id)
            .bind(approval.workflow_id)
            .bind(approval.workflow_object_id)
            .bind(approval.approval_meta_id);
        let query = bind_link(query, approval.link);
        let query = match (&approval.status, schema.status) {
            (StatusValue::Symbolic(s), StatusEncoding::Symbolic) => query.bind(s.as_str()),
            (StatusValue::Integer(n), StatusEncoding::Integer) => query.bind(*n),
            (value, _) => return Err(ConsistencyError::UnmappableStatus {
                id: approval.id,
                value: value.to_string(),
            }.into()),
        };
        let query = if schema.iteration {
            query.bind(approval.iteration
                .ok_or(ConsistencyError::MissingIteration { id: approval.id })?)
        } else {
            query
        };
        query
            .bind(approval.transactioner)
            .bind(approval.transaction_ts)
            .bind(approval.previous_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    log::info!(
        "stored {} approval meta(s) and {} approval(s) in schema ({schema})",
        records.approval_metas.len(),
        records.approvals.len(),
    );
    Ok(())
}

#[async_trait]
impl SchemaBackend for SqliteBackend {
    async fn introspect(
        &self,
    ) -> Result<ApprovalSchema, BackendError> {
        introspect_sqlite(
            &self,
        ).await
    }

    async fn load_records(
        &self,
    ) -> Result<RecordSet, BackendError> {
        load_records_sqlite(
            &self,
        ).await
    }

    async fn store_records(
        &self,
        records: &RecordSet,
    ) -> Result<(), BackendError> {
        store_records_sqlite(
            &self,
            records,
        ).await
    }
}

#[cfg(test)]
mod tests {
    use wfcore::{
        approval::{
            NewApproval,
            traits::WorkflowObjectBackend,
        },
        error::{
            BackendError,
            ConsistencyError,
        },
        schema::{
            ApprovalSchema,
            StatusEncoding,
            StatusValue,
            TransitionLink,
            TransitionRefForm,
            traits::SchemaBackend,
        },
        workflow::traits::WorkflowBackend,
    };
    use crate::impls::testing::backend;
    use super::*;

    #[test]
    fn migration_matches_generated_ddl() {
        let migration = include_str!("../../migrations/wf/20240101000000_workflow.sql");
        let approval = approval_ddl(&ApprovalSchema::CURRENT)
            .replace("CREATE TABLE approval (", "CREATE TABLE IF NOT EXISTS approval (");
        let approval_meta = approval_meta_ddl(TransitionRefForm::Meta)
            .replace("CREATE TABLE approval_meta (", "CREATE TABLE IF NOT EXISTS approval_meta (");
        assert!(migration.contains(&approval));
        assert!(migration.contains(&approval_meta));
    }

    #[test]
    fn insert_placeholders() {
        let statement = insert_statement(
            "approval",
            ["id", "status"].into_iter()
                .chain(true.then_some("iteration"))
                .chain(link_columns(TransitionRefForm::StatePair, "transition_id")),
        );
        assert_eq!(
            statement,
            "INSERT INTO approval ( id, status, iteration, source_state_id, \
            destination_state_id ) VALUES ( ?, ?, ?, ?, ? )",
        );
    }

    #[test]
    fn detect_unrecognized() {
        let cols = |names: &[(&str, &str)]| names.iter()
            .map(|(n, t)| (n.to_string(), t.to_string()))
            .collect::<Vec<_>>();
        let meta = cols(&[("id", "INTEGER"), ("transition_meta_id", "INTEGER")]);
        assert!(matches!(
            detect(&[], &meta),
            Err(ConsistencyError::UnrecognizedSchema(_)),
        ));
        assert!(matches!(
            detect(&cols(&[("status", "BLOB"), ("transition_id", "INTEGER")]), &meta),
            Err(ConsistencyError::UnrecognizedSchema(_)),
        ));
        assert!(matches!(
            detect(&cols(&[
                ("status", "TEXT"),
                ("source_state_id", "INTEGER"),
                ("destination_state_id", "INTEGER"),
            ]), &meta),
            Err(ConsistencyError::UnrecognizedSchema(_)),
        ));
        assert_eq!(
            detect(&cols(&[("status", "integer"), ("transition_id", "INTEGER")]), &meta),
            Ok(ApprovalSchema {
                status: StatusEncoding::Integer,
                iteration: false,
                transition_ref: TransitionRefForm::Meta,
            }),
        );
    }

    #[async_std::test]
    async fn store_other_representation() -> anyhow::Result<()> {
        let backend = backend().await?;
        assert_eq!(backend.introspect().await?, ApprovalSchema::CURRENT);

        let wf_id = backend.add_workflow_definition(&test_wf::fixtures::linear_branch()).await?;
        let workflow = backend.get_workflow_by_id(wf_id).await?;
        let object = backend.create_workflow_object(
            wf_id,
            "ticket-1",
            workflow.initial_state_id,
            &[NewApproval { transition_meta_id: 1, approval_meta_id: 1, iteration: 0 }],
        ).await?;
        let records = backend.load_records().await?;
        assert_eq!(records.approvals.len(), 1);
        assert_eq!(records.approvals[0].status, StatusValue::Symbolic("pending".into()));
        assert_eq!(records.approvals[0].link, TransitionLink::Id(1));

        let schema = ApprovalSchema {
            status: StatusEncoding::Integer,
            iteration: false,
            transition_ref: TransitionRefForm::StatePair,
        };
        let mut other = records.clone();
        other.schema = schema;
        for meta in other.approval_metas.iter_mut() {
            let TransitionLink::Id(id) = meta.link else { unreachable!() };
            let tm = &records.transition_metas[id as usize - 1];
            meta.link = TransitionLink::States {
                source_state_id: tm.source_state_id,
                destination_state_id: tm.destination_state_id,
            };
        }
        other.approvals[0].link = TransitionLink::States {
            source_state_id: 1,
            destination_state_id: 2,
        };
        other.approvals[0].status = StatusValue::Integer(0);
        other.approvals[0].iteration = None;
        backend.store_records(&other).await?;
        assert_eq!(backend.introspect().await?, schema);
        assert_eq!(backend.load_records().await?, other);

        // mismatched status leaves everything as it was
        let mut bad = other.clone();
        bad.approvals[0].status = StatusValue::Symbolic("pending".into());
        assert!(matches!(
            backend.store_records(&bad).await,
            Err(BackendError::Consistency(ConsistencyError::UnmappableStatus { .. })),
        ));
        assert_eq!(backend.load_records().await?, other);

        backend.store_records(&records).await?;
        assert_eq!(backend.introspect().await?, ApprovalSchema::CURRENT);
        assert_eq!(backend.load_records().await?, records);
        assert_eq!(backend.list_approvals(object.id).await?.len(), 1);
        Ok(())
    }
}
