// THEORY:
// Frames share nothing: each one gets its own registry and identity ledger. That
// makes frame-level parallelism trivial, and this module provides it. A
// `WorkerPool` owns a fixed set of tokio tasks, each with its own
// `SunspotPipeline`; a dispatcher hands incoming frames to them round-robin and
// every frame carries a oneshot channel for its report.
//
// The only synchronization point is the collection of results. `process_batch`
// submits every frame first and then awaits all replies together, returning the
// reports in input order regardless of which worker finished first.

use crate::core_modules::error::PoolError;
use crate::pipeline::{FrameReport, PipelineConfig, Point, SunspotPipeline};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};

pub struct FrameTask {
    pub frame_id: u64,
    pub contours: Vec<Vec<Point>>,
    pub result_sender: oneshot::Sender<FrameReport>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<FrameTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` workers (at least one). Must be called inside a tokio runtime.
    pub fn new(config: PipelineConfig, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<FrameTask>();
        let mut workers = Vec::with_capacity(worker_count);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<FrameTask>())
            .unzip();

        // Spawn dispatcher
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(rejected) = worker_senders[worker_idx].send(task) {
                    log::warn!("worker {} is gone, dropping frame {}", worker_idx, rejected.0.frame_id);
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        // Spawn workers
        for (worker_idx, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let pipeline = SunspotPipeline::new(config.clone());

            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    log::debug!("worker {} processing frame {}", worker_idx, task.frame_id);
                    let report = pipeline.process_frame(task.contours);
                    if task.result_sender.send(report).is_err() {
                        log::debug!("frame {} was abandoned by its caller", task.frame_id);
                    }
                }
            });

            workers.push(worker);
        }

        Self { task_sender, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn process_frame(&self, frame_id: u64, contours: Vec<Vec<Point>>) -> Result<FrameReport, PoolError> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = FrameTask {
            frame_id,
            contours,
            result_sender,
        };

        self.task_sender.send(task).map_err(|_| PoolError::Dispatch(frame_id))?;

        result_receiver.await.map_err(|_| PoolError::WorkerDropped(frame_id))
    }
}

/// Multi-frame front end over a `WorkerPool`.
pub struct ParallelPipeline {
    config: PipelineConfig,
    worker_pool: WorkerPool,
    frame_counter: AtomicU64,
}

impl ParallelPipeline {
    /// One worker per logical CPU.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_workers(config, num_cpus::get())
    }

    pub fn with_workers(config: PipelineConfig, worker_count: usize) -> Self {
        Self {
            worker_pool: WorkerPool::new(config.clone(), worker_count),
            config,
            frame_counter: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    /// Frames submitted so far.
    pub fn frames_submitted(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    pub async fn process_frame(&self, contours: Vec<Vec<Point>>) -> Result<FrameReport, PoolError> {
        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        self.worker_pool.process_frame(frame_id, contours).await
    }

    /// Processes every frame concurrently. Reports come back in input order.
    pub async fn process_batch(&self, frames: Vec<Vec<Vec<Point>>>) -> Result<Vec<FrameReport>, PoolError> {
        let frame_count = frames.len();
        let results = join_all(frames.into_iter().map(|contours| self.process_frame(contours))).await;
        let reports = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "batch done: {} frames, {} sunspots in total",
            frame_count,
            reports.iter().map(|r| r.sunspots.len()).sum::<usize>()
        );
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::test_utils::circle_contour;

    fn frame(centers: &[(i32, i32)]) -> Vec<Vec<Point>> {
        centers.iter().map(|&(x, y)| circle_contour(x, y, 20).into()).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn batch_reports_come_back_in_input_order() {
        let pipeline = ParallelPipeline::with_workers(PipelineConfig::default(), 3);
        let frames = vec![
            frame(&[(100, 100), (150, 100)]),
            frame(&[(100, 100), (400, 100)]),
            Vec::new(),
            frame(&[(100, 100), (150, 100), (200, 100)]),
        ];

        let reports = pipeline.process_batch(frames).await.unwrap();

        let counts: Vec<usize> = reports.iter().map(|r| r.sunspots.len()).collect();
        assert_eq!(counts, vec![1, 2, 0, 1]);
        assert_eq!(pipeline.frames_submitted(), 4);
        assert_eq!(pipeline.worker_count(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pooled_frames_match_the_sequential_pipeline() {
        let config = PipelineConfig::default();
        let input = frame(&[(100, 100), (150, 100), (300, 300)]);

        let sequential = SunspotPipeline::new(config.clone()).process_frame(input.clone());
        let pooled = ParallelPipeline::with_workers(config, 2).process_frame(input).await.unwrap();

        assert_eq!(pooled, sequential);
    }

    #[tokio::test]
    async fn zero_workers_still_gets_one() {
        let pool = WorkerPool::new(PipelineConfig::default(), 0);
        assert_eq!(pool.worker_count(), 1);

        let report = pool.process_frame(7, frame(&[(50, 50)])).await.unwrap();
        assert_eq!(report.sunspots.len(), 1);
    }
}
