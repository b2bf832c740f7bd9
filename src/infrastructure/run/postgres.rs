//! PostgreSQL pipeline run repository

use std::fmt::Debug;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::run::{PipelineRun, RunRepository, RunStatus};
use crate::domain::DomainError;

/// Run repository backed by the `pipeline_runs` table.
///
/// Counter updates are single `UPDATE … SET n = n + 1` statements, so they
/// stay atomic when several workers account documents against the same run.
pub struct PostgresRunRepository {
    pool: PgPool,
}

impl Debug for PostgresRunRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRunRepository").finish()
    }
}

impl PostgresRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx_error(context: &str, error: sqlx::Error) -> DomainError {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => {
            DomainError::store_unavailable(format!("{}: {}", context, error))
        }
        other => DomainError::storage(format!("{}: {}", context, other)),
    }
}

fn run_from_row(row: sqlx::postgres::PgRow) -> PipelineRun {
    let status = RunStatus::from_str(row.get::<String, _>("status").as_str())
        .unwrap_or(RunStatus::Failed);

    PipelineRun::from_row(
        row.get("id"),
        row.get("run_date"),
        status,
        row.get("documents_processed"),
        row.get("chunks_generated"),
        row.get("errors_count"),
        row.get("execution_time_seconds"),
        row.get("created_at"),
    )
}

#[async_trait]
impl RunRepository for PostgresRunRepository {
    async fn start_run(&self) -> Result<PipelineRun, DomainError> {
        let row = sqlx::query(
            r#"
            INSERT INTO pipeline_runs (run_date, status)
            VALUES (CURRENT_DATE, 'running')
            RETURNING id, run_date, status, documents_processed, chunks_generated,
                      errors_count, execution_time_seconds, created_at
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to start run", e))?;

        Ok(run_from_row(row))
    }

    async fn record_document(
        &self,
        run_id: i64,
        chunks_added: i64,
        had_error: bool,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE pipeline_runs SET
                documents_processed = documents_processed + 1,
                chunks_generated = chunks_generated + $2,
                errors_count = errors_count + CASE WHEN $3 THEN 1 ELSE 0 END
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(chunks_added)
        .bind(had_error)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to record document", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "run {} does not exist",
                run_id
            )));
        }

        Ok(())
    }

    async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        execution_time_seconds: f64,
    ) -> Result<(), DomainError> {
        if !status.is_terminal() {
            return Err(DomainError::invalid_argument(
                "a run can only be finished with a terminal status",
            ));
        }

        // guarded update: a terminal run never re-enters running, and a
        // second finish does not overwrite the first
        let result = sqlx::query(
            r#"
            UPDATE pipeline_runs SET
                status = $2,
                execution_time_seconds = $3
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(run_id)
        .bind(status.as_str())
        .bind(execution_time_seconds)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to finish run", e))?;

        if result.rows_affected() == 0 {
            return match self.get_run(run_id).await? {
                Some(run) => Err(DomainError::conflict(format!(
                    "run {} is already {}",
                    run_id,
                    run.status()
                ))),
                None => Err(DomainError::not_found(format!(
                    "run {} does not exist",
                    run_id
                ))),
            };
        }

        Ok(())
    }

    async fn get_run(&self, run_id: i64) -> Result<Option<PipelineRun>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, run_date, status, documents_processed, chunks_generated,
                   errors_count, execution_time_seconds, created_at
            FROM pipeline_runs
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to get run", e))?;

        Ok(row.map(run_from_row))
    }
}
