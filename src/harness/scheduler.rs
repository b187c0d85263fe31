use crate::library::EmptyResult;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tokio::time::sleep;
use tracing::{debug, error, info, warn, Instrument};

const DEFAULT_RESTART_INTERVAL: Duration = Duration::from_secs(5);

/// Persistent execution unit
///
/// Jobs that return an error are restarted by the [`JobScheduler`] after a fixed interval.
/// A job that returns successfully is considered finished and is not restarted.
#[async_trait]
pub trait Job {
    /// Name of the job displayed in log messages
    const NAME: &'static str;

    /// Name of this instance, defaults to [`Job::NAME`]
    fn name(&self) -> String {
        Self::NAME.to_owned()
    }

    /// Runs the job until it either finishes or fails
    async fn execute(&self) -> EmptyResult;
}

/// Lifecycle handler for [`Job`] instances
pub struct JobScheduler {
    restart_interval: Duration,
    handles: Arc<Mutex<Vec<(String, JoinHandle<()>)>>>,
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_RESTART_INTERVAL)
    }
}

impl JobScheduler {
    /// Creates a new scheduler restarting crashed jobs after the given interval
    pub fn new(restart_interval: Duration) -> Self {
        Self {
            restart_interval,
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Manages a new job, restarting it whenever it crashes
    pub fn spawn_job<J>(&self, job: J)
    where
        J: Job + Send + Sync + 'static,
    {
        let name = job.name();
        let restart_interval = self.restart_interval;
        let span = tracing::info_span!("job", job = %name);

        let handle = task::spawn(
            async move {
                info!("Starting job");

                loop {
                    match job.execute().await {
                        Ok(()) => {
                            info!("Job finished");
                            break;
                        }
                        Err(error) => {
                            error!(?error, "Job crashed");
                            debug!(?restart_interval, "Backing off before restart");
                            sleep(restart_interval).await;
                            info!("Restarting job");
                        }
                    }
                }
            }
            .instrument(span),
        );

        self.take_handles(|handles| handles.push((name, handle)));
    }

    /// Number of jobs that have neither finished nor been terminated
    pub fn active_jobs(&self) -> usize {
        self.take_handles(|handles| handles.retain(|(_, handle)| !handle.is_finished()));
        self.take_handles(|handles| handles.len())
    }

    /// Aborts all managed jobs and waits for them to wind down
    pub async fn terminate_jobs(&self) {
        let handles = self.take_handles(std::mem::take);

        for (name, handle) in handles {
            if !handle.is_finished() {
                debug!(job = %name, "Terminating job");
                handle.abort();
            }

            if let Err(error) = handle.await {
                if !error.is_cancelled() {
                    warn!(job = %name, ?error, "Job panicked");
                }
            }
        }
    }

    fn take_handles<R>(&self, f: impl FnOnce(&mut Vec<(String, JoinHandle<()>)>) -> R) -> R {
        match self.handles.lock() {
            Ok(mut handles) => f(&mut handles),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
