//! Pipeline run monitoring entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::DomainError;

/// Lifecycle state of a pipeline run.
///
/// The only legal transitions are `Running -> Success` and
/// `Running -> Failed`; a terminal run never re-enters `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// Monitoring record for one execution of the ingestion pipeline.
///
/// Counters are updated incrementally as each document is processed, so a
/// crash mid-run leaves accurate partial counts behind. `Failed` is reserved
/// for run-level aborts; a run whose individual documents failed still ends
/// `Success` with `errors_count > 0` - the two signals are distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    id: i64,
    run_date: NaiveDate,
    status: RunStatus,
    documents_processed: i64,
    chunks_generated: i64,
    errors_count: i64,
    execution_time_seconds: f64,
    created_at: DateTime<Utc>,
}

impl PipelineRun {
    /// Create a new run in the `Running` state with zeroed counters
    pub fn started(id: i64, run_date: NaiveDate, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            run_date,
            status: RunStatus::Running,
            documents_processed: 0,
            chunks_generated: 0,
            errors_count: 0,
            execution_time_seconds: 0.0,
            created_at,
        }
    }

    /// Rehydrate a run from storage
    #[allow(clippy::too_many_arguments)]
    pub fn from_row(
        id: i64,
        run_date: NaiveDate,
        status: RunStatus,
        documents_processed: i64,
        chunks_generated: i64,
        errors_count: i64,
        execution_time_seconds: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            run_date,
            status,
            documents_processed,
            chunks_generated,
            errors_count,
            execution_time_seconds,
            created_at,
        }
    }

    // Getters

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn documents_processed(&self) -> i64 {
        self.documents_processed
    }

    pub fn chunks_generated(&self) -> i64 {
        self.chunks_generated
    }

    pub fn errors_count(&self) -> i64 {
        self.errors_count
    }

    pub fn execution_time_seconds(&self) -> f64 {
        self.execution_time_seconds
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // State transitions

    /// Account one processed document
    pub fn record_document(&mut self, chunks_added: i64, had_error: bool) {
        self.documents_processed += 1;
        self.chunks_generated += chunks_added;
        if had_error {
            self.errors_count += 1;
        }
    }

    /// Move the run to a terminal status.
    ///
    /// Fails with `Conflict` if the run is already terminal, or if the target
    /// status is not terminal.
    pub fn finish(
        &mut self,
        status: RunStatus,
        execution_time_seconds: f64,
    ) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "run {} is already {}",
                self.id, self.status
            )));
        }

        if !status.is_terminal() {
            return Err(DomainError::invalid_argument(
                "a run can only be finished with a terminal status",
            ));
        }

        self.status = status;
        self.execution_time_seconds = execution_time_seconds;
        Ok(())
    }
}
