//! Pipeline run repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{PipelineRun, RunStatus};
use crate::domain::DomainError;

/// Repository for pipeline run monitoring records.
///
/// Counter updates must be atomic with respect to concurrent callers: the
/// pipeline is free to process documents from a bounded worker pool, with
/// every worker incrementing the same run row.
#[async_trait]
pub trait RunRepository: Send + Sync + Debug {
    /// Create a new run in the `Running` state and return it
    async fn start_run(&self) -> Result<PipelineRun, DomainError>;

    /// Account one processed document against a running run.
    ///
    /// Called once per document, as it is processed - not at the end of the
    /// run - so partial counts survive a crash.
    async fn record_document(
        &self,
        run_id: i64,
        chunks_added: i64,
        had_error: bool,
    ) -> Result<(), DomainError>;

    /// Move a run to a terminal status.
    ///
    /// Fails with `Conflict` when the run is already terminal.
    async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        execution_time_seconds: f64,
    ) -> Result<(), DomainError>;

    /// Fetch a run by id
    async fn get_run(&self, run_id: i64) -> Result<Option<PipelineRun>, DomainError>;
}
