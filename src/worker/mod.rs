//! Background report generation
//!
//! The pipeline runs on its own tokio task so the caller stays responsive.
//! The caller gets a progress callback per milestone and a single success
//! flag at the end. Stopping aborts the task outright: in-flight model calls
//! are dropped, the child interpreter is killed and partial results are lost.

mod signals;

pub use signals::SignalHandler;

pub use crate::pipeline::GenerationRequest;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

use crate::error::{DataStoryError, Result};
use crate::pipeline::Pipeline;

/// Called once per completed pipeline milestone
pub type ProgressCallback = Arc<dyn Fn() + Send + Sync>;

/// Run the whole pipeline, reporting failure as `false`
pub async fn generate_report(
    pipeline: &Pipeline,
    request: &GenerationRequest,
    progress: Option<ProgressCallback>,
) -> bool {
    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("report", run_id = %run_id);

    async {
        info!("Generating report for {:?}", request.dataset_path);
        let notify = move || {
            if let Some(callback) = &progress {
                callback();
            }
        };

        match pipeline.run(request, &notify).await {
            Ok(path) => {
                info!("Report written to {:?}", path);
                true
            }
            Err(e) => {
                error!("Report generation failed: {}", e);
                false
            }
        }
    }
    .instrument(span)
    .await
}

/// Spawns report generation on a dedicated task
pub struct ReportWorker;

impl ReportWorker {
    pub fn spawn(
        pipeline: Arc<Pipeline>,
        request: GenerationRequest,
        progress: Option<ProgressCallback>,
    ) -> WorkerHandle {
        let task = tokio::spawn(async move { generate_report(&pipeline, &request, progress).await });
        WorkerHandle { task }
    }
}

/// Handle to a running worker
pub struct WorkerHandle {
    task: JoinHandle<bool>,
}

impl WorkerHandle {
    /// Forcibly stop the worker
    pub fn stop(&self) {
        info!("Stopping report worker");
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the success flag. A stopped worker yields a `Worker` error.
    pub async fn wait(&mut self) -> Result<bool> {
        (&mut self.task).await.map_err(|e| {
            if e.is_cancelled() {
                DataStoryError::Worker("report worker was stopped".to_string())
            } else {
                DataStoryError::Worker(format!("report worker panicked: {}", e))
            }
        })
    }
}
