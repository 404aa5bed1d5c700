// THEORY:
// Grids from different images share nothing, so a batch of them can be planned in
// parallel. The `ParallelPlanner` runs a small pool of worker tasks behind a
// round-robin dispatcher. Every worker owns a `SurveyPipeline` built from the same
// configuration and runs the CPU-bound planning on tokio's blocking pool.
//
// Results are handed back through one-shot channels that are collected in
// submission order, so the caller sees the same ordering and the same identifiers
// it would get from planning the grids one after another, no matter which worker
// finishes first.

use crate::core_modules::cell::cell::CellLabel;
use crate::error::PlanningError;
use crate::pipeline::{PlannerConfig, SurveyPipeline, SurveyReport};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};

pub type PlanResult = Result<SurveyReport, PlanningError>;

pub struct GridTask {
    pub grid_id: u64,
    pub flagged: Vec<CellLabel>,
    pub result_sender: oneshot::Sender<PlanResult>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<GridTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Must be called from within a tokio runtime.
    pub fn new(pipeline: SurveyPipeline, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let pipeline = Arc::new(pipeline);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<GridTask>();
        let mut workers = Vec::with_capacity(worker_count);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<GridTask>())
            .unzip();

        // Dispatcher: hands tasks to workers in turn.
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    tracing::warn!(grid_id = task.grid_id, worker = worker_idx, "worker gone, dropping grid");
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        for (worker_idx, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let pipeline = Arc::clone(&pipeline);

            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    tracing::debug!(grid_id = task.grid_id, worker = worker_idx, "planning grid");
                    let pipeline = Arc::clone(&pipeline);
                    let flagged = task.flagged;
                    let result = tokio::task::spawn_blocking(move || pipeline.generate_report(&flagged))
                        .await
                        .unwrap_or(Err(PlanningError::WorkerUnavailable));
                    let _ = task.result_sender.send(result);
                }
            });

            workers.push(worker);
        }

        Self {
            task_sender,
            workers,
        }
    }

    pub fn submit(&self, grid_id: u64, flagged: Vec<CellLabel>) -> Result<oneshot::Receiver<PlanResult>, PlanningError> {
        let (result_sender, result_receiver) = oneshot::channel();
        let task = GridTask {
            grid_id,
            flagged,
            result_sender,
        };
        self.task_sender
            .send(task)
            .map_err(|_| PlanningError::WorkerUnavailable)?;
        Ok(result_receiver)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops accepting grids and waits for in-flight work to drain.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

pub struct ParallelPlanner {
    worker_pool: WorkerPool,
    grid_counter: AtomicU64,
}

impl ParallelPlanner {
    /// One worker per CPU.
    pub fn new(config: PlannerConfig) -> Result<Self, PlanningError> {
        Self::with_workers(config, num_cpus::get())
    }

    pub fn with_workers(config: PlannerConfig, worker_count: usize) -> Result<Self, PlanningError> {
        let pipeline = SurveyPipeline::new(config)?;
        Ok(Self {
            worker_pool: WorkerPool::new(pipeline, worker_count),
            grid_counter: AtomicU64::new(0),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    pub async fn plan_grid(&self, flagged: Vec<CellLabel>) -> PlanResult {
        let receiver = self.worker_pool.submit(self.next_grid_id(), flagged)?;
        receiver.await.map_err(|_| PlanningError::WorkerUnavailable)?
    }

    /// Plans every grid, returning results in the order the grids were given.
    pub async fn plan_batch(&self, grids: Vec<Vec<CellLabel>>) -> Vec<PlanResult> {
        let pending: Vec<_> = grids
            .into_iter()
            .map(|flagged| self.worker_pool.submit(self.next_grid_id(), flagged))
            .collect();

        futures::future::join_all(pending.into_iter().map(|submitted| async move {
            match submitted {
                Ok(receiver) => receiver.await.unwrap_or(Err(PlanningError::WorkerUnavailable)),
                Err(err) => Err(err),
            }
        }))
        .await
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }

    fn next_grid_id(&self) -> u64 {
        self.grid_counter.fetch_add(1, Ordering::Relaxed)
    }
}
