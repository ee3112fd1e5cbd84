//! Submitting a query and waiting for its job to finish.

use std::time;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{
    ClientError, Context, HttpClient,
    job::{DeleteJob, GetJob, Job, JobStatus, SubmitQuery},
    query_result::{GetQueryResult, QueryResult},
};

/// How long to wait between job status checks.
pub const POLL_INTERVAL: time::Duration = time::Duration::from_secs(1);

/// The deadline for deleting a job after the caller gave up on it. This is
/// independent of whatever deadline caused the cancellation.
pub const CLEANUP_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// An error encountered while running a query.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The query could not be submitted.
    #[error("failed to submit query")]
    Submit(#[source] ClientError),
    /// The job status could not be fetched.
    #[error("failed to poll job {job_id}")]
    Poll {
        /// The job ID.
        job_id: String,
        /// The underlying error.
        #[source]
        source: ClientError,
    },
    /// The service ran the query, and it failed.
    #[error("query failed: {message}")]
    Failed {
        /// The job ID.
        job_id: String,
        /// The error reported by the service.
        message: String,
    },
    /// The job was cancelled by someone else.
    #[error("job {0} was cancelled by the service")]
    RemoteCancelled(String),
    /// The caller cancelled while the job was running. The job has been
    /// deleted, if possible.
    #[error("query cancelled")]
    Cancelled {
        /// The job ID.
        job_id: String,
    },
    /// The caller cancelled while no job was being tracked.
    #[error("query cancelled")]
    Interrupted,
    /// The query result could not be fetched.
    #[error("failed to fetch query result {id}")]
    FetchResult {
        /// The result ID.
        id: i64,
        /// The underlying error.
        #[source]
        source: ClientError,
    },
    /// The job succeeded, but didn't say where to find its result.
    #[error("job {0} succeeded without a query result")]
    MissingResult(String),
}

/// Drives a query job from submission to result.
#[derive(Debug)]
pub struct JobPoller<'a, C> {
    client: &'a C,
    context: &'a Context,
    interval: time::Duration,
    cleanup_timeout: time::Duration,
    deadline: Option<Instant>,
}

impl<'a, C: HttpClient> JobPoller<'a, C> {
    /// Create a poller that sends requests for `context` through `client`.
    pub fn new(client: &'a C, context: &'a Context) -> Self {
        Self {
            client,
            context,
            interval: POLL_INTERVAL,
            cleanup_timeout: CLEANUP_TIMEOUT,
            deadline: None,
        }
    }

    /// Set the time between status checks.
    pub fn with_interval(mut self, interval: time::Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the deadline for deleting a cancelled job.
    pub fn with_cleanup_timeout(mut self, timeout: time::Duration) -> Self {
        self.cleanup_timeout = timeout;
        self
    }

    /// Bound every request except the cleanup by the time left until
    /// `deadline`. This does not cancel anything by itself; pair it with a
    /// token that fires at the same instant.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Submit the query, wait for the job to succeed, and fetch the result.
    ///
    /// If `cancel` fires while waiting, a request that is already in flight
    /// is allowed to finish. If that leaves a running job, it is deleted on a
    /// best-effort basis and [JobError::Cancelled] is returned. A job that
    /// has already failed is reported as [JobError::Failed].
    pub async fn run(
        &self,
        req: SubmitQuery<'_>,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, JobError> {
        if cancel.is_cancelled() {
            return Err(JobError::Interrupted);
        }

        // Once sent, the submission can't be called back, so the job ID is
        // needed even if the caller gives up in the meantime.
        let mut job = self
            .client
            .roundtrip(self.context, req, self.request_timeout())
            .await
            .map_err(JobError::Submit)?
            .job;
        debug!(job_id = job.id, status = %job.status, "submitted query");

        let result_id = self.wait(&mut job, cancel).await?;
        debug!(job_id = job.id, result_id, "job succeeded");

        let fetch = GetQueryResult { id: result_id };
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Interrupted),
            resp = self.client.roundtrip(self.context, fetch, self.request_timeout()) => resp,
        };

        let resp = fetched.map_err(|source| JobError::FetchResult {
            id: result_id,
            source,
        })?;

        Ok(resp.query_result)
    }

    async fn wait(&self, job: &mut Job, cancel: &CancellationToken) -> Result<i64, JobError> {
        loop {
            match job.status {
                JobStatus::Success => {
                    return job
                        .query_result_id
                        .ok_or_else(|| JobError::MissingResult(job.id.clone()));
                }
                JobStatus::Failure => {
                    return Err(JobError::Failed {
                        job_id: job.id.clone(),
                        message: job.error_message().unwrap_or("unknown error").to_owned(),
                    });
                }
                JobStatus::Cancelled => return Err(JobError::RemoteCancelled(job.id.clone())),
                JobStatus::Pending | JobStatus::Started => (),
            }

            if cancel.is_cancelled() {
                return Err(self.cancel(&job.id).await);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => (),
                _ = cancel.cancelled() => return Err(self.cancel(&job.id).await),
            }

            let fetched = self
                .client
                .roundtrip(self.context, GetJob { id: &job.id }, self.request_timeout())
                .await;

            match fetched {
                Ok(resp) => *job = resp.job,
                Err(e) if cancel.is_cancelled() || self.past_deadline() => {
                    debug!(job_id = job.id, error = %e, "poll failed after cancellation");
                    return Err(self.cancel(&job.id).await);
                }
                Err(source) => {
                    return Err(JobError::Poll {
                        job_id: job.id.clone(),
                        source,
                    });
                }
            }

            debug!(job_id = job.id, status = %job.status, "polled job");
        }
    }

    fn request_timeout(&self) -> Option<time::Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    async fn cancel(&self, job_id: &str) -> JobError {
        let delete = self.client.roundtrip(
            self.context,
            DeleteJob { id: job_id },
            Some(self.cleanup_timeout),
        );

        match tokio::time::timeout(self.cleanup_timeout, delete).await {
            Ok(Ok(_)) => debug!(job_id, "deleted job"),
            Ok(Err(e)) => error!(job_id, error = %e, "failed to delete job"),
            Err(_) => error!(job_id, "timed out deleting job"),
        }

        warn!(job_id, "job is cancelled");
        JobError::Cancelled {
            job_id: job_id.to_owned(),
        }
    }
}
