//! In-memory pipeline run repository

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::run::{PipelineRun, RunRepository, RunStatus};
use crate::domain::DomainError;

/// In-memory run repository for development and testing.
///
/// Counter updates happen under one write lock, so they are atomic with
/// respect to concurrent workers, matching the Postgres implementation.
#[derive(Debug)]
pub struct InMemoryRunRepository {
    state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    runs: HashMap<i64, PipelineRun>,
    next_id: i64,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                runs: HashMap::new(),
                next_id: 1,
            })),
        }
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn start_run(&self) -> Result<PipelineRun, DomainError> {
        let mut state = self.state.write().await;

        let id = state.next_id;
        state.next_id += 1;

        let now = Utc::now();
        let run = PipelineRun::started(id, now.date_naive(), now);
        state.runs.insert(id, run.clone());

        Ok(run)
    }

    async fn record_document(
        &self,
        run_id: i64,
        chunks_added: i64,
        had_error: bool,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;

        let run = state
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| DomainError::not_found(format!("run {} does not exist", run_id)))?;

        run.record_document(chunks_added, had_error);
        Ok(())
    }

    async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        execution_time_seconds: f64,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;

        let run = state
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| DomainError::not_found(format!("run {} does not exist", run_id)))?;

        run.finish(status, execution_time_seconds)
    }

    async fn get_run(&self, run_id: i64) -> Result<Option<PipelineRun>, DomainError> {
        let state = self.state.read().await;
        Ok(state.runs.get(&run_id).cloned())
    }
}
