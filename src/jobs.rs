use crate::backend::ContainerBackend;
use crate::model::{PruneReport, ResourceKind};
use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const RESULT_CHANNEL_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Prune(ResourceKind),
    Logs { container_id: String, tail: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    Pruned(PruneReport),
    Logs { container_id: String, text: String },
}

#[derive(Debug)]
pub struct JobResult {
    pub job: Job,
    pub outcome: Result<JobOutput>,
}

/// Runs slow daemon calls as detached tasks and hands their results back
/// through one bounded channel.
///
/// A full channel makes the producing task wait for room, so results are never
/// dropped. The loop side only ever calls [`JobCoordinator::try_drain`].
#[derive(Debug)]
pub struct JobCoordinator {
    tx: mpsc::Sender<JobResult>,
    rx: mpsc::Receiver<JobResult>,
}

impl Default for JobCoordinator {
    fn default() -> Self {
        Self::with_capacity(RESULT_CHANNEL_CAPACITY)
    }
}

impl JobCoordinator {
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self { tx, rx }
    }

    pub fn submit<B: ContainerBackend>(&self, backend: &B, job: Job) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let backend = backend.clone();
        tokio::spawn(async move {
            let outcome = run_job(&backend, &job).await;
            if let Ok(JobOutput::Pruned(report)) = &outcome {
                info!("{}", report.summary());
            }
            if tx.send(JobResult { job, outcome }).await.is_err() {
                debug!("job result dropped: receiver closed");
            }
        })
    }

    pub fn try_drain(&mut self) -> Option<JobResult> {
        self.rx.try_recv().ok()
    }

    pub fn queued(&self) -> usize {
        self.rx.len()
    }
}

async fn run_job<B: ContainerBackend>(backend: &B, job: &Job) -> Result<JobOutput> {
    match job {
        Job::Prune(ResourceKind::Images) => backend.prune_images().await.map(JobOutput::Pruned),
        Job::Prune(ResourceKind::Containers) => {
            backend.prune_containers().await.map(JobOutput::Pruned)
        }
        Job::Prune(ResourceKind::Volumes) => backend.prune_volumes().await.map(JobOutput::Pruned),
        Job::Logs { container_id, tail } => {
            let text = backend.container_logs(container_id, *tail).await?;
            Ok(JobOutput::Logs {
                container_id: container_id.clone(),
                text,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Job, JobCoordinator, JobOutput};
    use crate::backend::fake::FakeBackend;
    use crate::model::ResourceKind;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn wait_for_queued(jobs: &JobCoordinator, count: usize) {
        timeout(Duration::from_secs(2), async {
            while jobs.queued() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("results never arrived");
    }

    #[tokio::test]
    async fn each_job_yields_exactly_one_result() {
        let backend = FakeBackend::new();
        let mut jobs = JobCoordinator::default();

        jobs.submit(&backend, Job::Prune(ResourceKind::Images))
            .await
            .unwrap();

        let result = jobs.try_drain().expect("one result");
        assert_eq!(result.job, Job::Prune(ResourceKind::Images));
        assert!(matches!(result.outcome, Ok(JobOutput::Pruned(_))));
        assert!(jobs.try_drain().is_none());
    }

    #[tokio::test]
    async fn failures_are_delivered_as_results() {
        let backend = FakeBackend::new();
        backend.fail_prunes("daemon refused");
        let mut jobs = JobCoordinator::default();

        jobs.submit(&backend, Job::Prune(ResourceKind::Volumes))
            .await
            .unwrap();

        let result = jobs.try_drain().expect("one result");
        let error = result.outcome.expect_err("prune should fail");
        assert!(error.to_string().contains("daemon refused"));
    }

    #[tokio::test]
    async fn full_channel_delays_senders_without_losing_results() {
        let backend = FakeBackend::new();
        let mut jobs = JobCoordinator::with_capacity(1);

        let handles = (0..3)
            .map(|_| jobs.submit(&backend, Job::Prune(ResourceKind::Containers)))
            .collect::<Vec<_>>();

        wait_for_queued(&jobs, 1).await;
        tokio::task::yield_now().await;
        assert_eq!(jobs.queued(), 1);

        let mut received = 0;
        while received < 3 {
            if jobs.try_drain().is_some() {
                received += 1;
            } else {
                tokio::task::yield_now().await;
            }
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(jobs.try_drain().is_none());
    }

    #[tokio::test]
    async fn log_jobs_carry_container_id() {
        let backend = FakeBackend::new();
        let mut jobs = JobCoordinator::default();

        jobs.submit(
            &backend,
            Job::Logs {
                container_id: "c1".to_string(),
                tail: 50,
            },
        )
        .await
        .unwrap();

        let result = jobs.try_drain().expect("one result");
        assert_eq!(
            result.outcome.unwrap(),
            JobOutput::Logs {
                container_id: "c1".to_string(),
                text: "50 lines of c1".to_string(),
            }
        );
    }
}
