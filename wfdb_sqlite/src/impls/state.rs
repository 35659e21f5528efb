use async_trait::async_trait;
use sqlx::{
    Row,
    SqliteConnection,
    sqlite::SqliteRow,
};
use wfcore::{
    error::BackendError,
    state::{
        State,
        States,
        traits::StateBackend,
    },
};

use crate::SqliteBackend;

/// Get-or-create by label; the description of an existing state is kept.
pub(crate) async fn insert_or_select_state(
    conn: &mut SqliteConnection,
    label: &str,
    description: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query(r#"
INSERT INTO state (
    label,
    description
)
VALUES ( ?1, ?2 )
ON CONFLICT (label) DO NOTHING
        "#)
        .bind(label)
        .bind(description)
        .execute(&mut *conn)
        .await?;
    sqlx::query(r#"
SELECT id FROM state WHERE label = ?1
        "#)
        .bind(label)
        .try_map(|row: SqliteRow| row.try_get("id"))
        .fetch_one(&mut *conn)
        .await
}

async fn ensure_state_sqlite(
    backend: &SqliteBackend,
    label: &str,
    description: &str,
) -> Result<i64, BackendError> {
    let mut tx = backend.pool.begin().await?;
    let id = insert_or_select_state(&mut *tx, label, description).await?;
    tx.commit().await?;
    Ok(id)
}

const SELECT_STATE: &str = r#"
SELECT
    id,
    label,
    description
FROM
    state
"#;

fn state_from_row(row: SqliteRow) -> Result<State, sqlx::Error> {
    Ok(State {
        id: row.try_get("id")?,
        label: row.try_get("label")?,
        description: row.try_get("description")?,
    })
}

async fn get_state_by_id_sqlite(
    backend: &SqliteBackend,
    id: i64,
) -> Result<State, BackendError> {
    let rec = sqlx::query(&format!("{SELECT_STATE} WHERE id = ?1"))
        .bind(id)
        .try_map(state_from_row)
        .fetch_one(&*backend.pool)
        .await?;
    Ok(rec)
}

async fn get_state_by_label_sqlite(
    backend: &SqliteBackend,
    label: &str,
) -> Result<Option<State>, BackendError> {
    let rec = sqlx::query(&format!("{SELECT_STATE} WHERE label = ?1"))
        .bind(label)
        .try_map(state_from_row)
        .fetch_optional(&*backend.pool)
        .await?;
    Ok(rec)
}

async fn list_states_sqlite(
    backend: &SqliteBackend,
) -> Result<States, BackendError> {
    let recs = sqlx::query(&format!("{SELECT_STATE} ORDER BY id"))
        .try_map(state_from_row)
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs.into())
}

#[async_trait]
impl StateBackend for SqliteBackend {
    async fn ensure_state(
        &self,
        label: &str,
        description: &str,
    ) -> Result<i64, BackendError> {
        ensure_state_sqlite(
            &self,
            label,
            description,
        ).await
    }

    async fn get_state_by_id(
        &self,
        id: i64,
    ) -> Result<State, BackendError> {
        get_state_by_id_sqlite(
            &self,
            id,
        ).await
    }

    async fn get_state_by_label(
        &self,
        label: &str,
    ) -> Result<Option<State>, BackendError> {
        get_state_by_label_sqlite(
            &self,
            label,
        ).await
    }

    async fn list_states(
        &self,
    ) -> Result<States, BackendError> {
        list_states_sqlite(
            &self,
        ).await
    }
}
