//! API operations concerning query execution jobs.

use serde::{Deserialize, Serialize};

use crate::{
    api::{ApiRequest, JsonResponse, NoContent},
    query::Binding,
};

/// The state of a job, as reported by the service.
///
/// On the wire these are the integers 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JobStatus {
    /// Queued, not yet picked up by a worker.
    Pending,
    /// Running on a worker.
    Started,
    /// Finished; a query result is available.
    Success,
    /// Finished with an error.
    Failure,
    /// Cancelled before it could finish.
    Cancelled,
}

/// Indicates that a status code was outside the known range.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("invalid job status: {0}")]
pub struct InvalidJobStatus(u8);

impl JobStatus {
    /// Whether the service will not move the job to another state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failure | JobStatus::Cancelled
        )
    }
}

impl TryFrom<u8> for JobStatus {
    type Error = InvalidJobStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => JobStatus::Pending,
            2 => JobStatus::Started,
            3 => JobStatus::Success,
            4 => JobStatus::Failure,
            5 => JobStatus::Cancelled,
            _ => return Err(InvalidJobStatus(code)),
        })
    }
}

impl From<JobStatus> for u8 {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => 1,
            JobStatus::Started => 2,
            JobStatus::Success => 3,
            JobStatus::Failure => 4,
            JobStatus::Cancelled => 5,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Started => write!(f, "Started"),
            JobStatus::Success => write!(f, "Success"),
            JobStatus::Failure => write!(f, "Failure"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A query execution job. The job lives on the service; the client only
/// observes it.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    /// The opaque job ID.
    pub id: String,
    /// The current state.
    pub status: JobStatus,
    /// The error reported by the service, if the job failed.
    #[serde(default)]
    pub error: Option<String>,
    /// The stored result, once the job has succeeded.
    #[serde(default)]
    pub query_result_id: Option<i64>,
}

impl Job {
    /// The error message from the service, ignoring empty strings.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|s| !s.is_empty())
    }
}

/// The envelope the service wraps jobs in.
#[derive(Debug, Clone, Deserialize)]
pub struct JobResponse {
    /// The job.
    pub job: Job,
}

impl JsonResponse for JobResponse {}

/// Submit a query for execution. The service answers with a job to poll.
#[derive(Debug, Clone)]
pub struct SubmitQuery<'a> {
    /// The query text, with parameter markers left in place.
    pub query: &'a str,
    /// The data source to run against.
    pub data_source_id: i64,
    /// Values for the query's parameters.
    pub parameters: &'a Binding,
    /// Let the service cap the number of returned rows.
    pub apply_auto_limit: bool,
}

#[derive(Debug, Serialize)]
struct SubmitQueryBody<'a> {
    apply_auto_limit: bool,
    data_source_id: i64,
    // Always execute; never serve a cached result.
    max_age: u32,
    parameters: &'a Binding,
    query: &'a str,
}

impl ApiRequest for SubmitQuery<'_> {
    type Response = JobResponse;

    fn path(&self) -> String {
        "query_results".to_string()
    }

    fn method(&self) -> http::Method {
        http::Method::POST
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(SubmitQueryBody {
            apply_auto_limit: self.apply_auto_limit,
            data_source_id: self.data_source_id,
            max_age: 0,
            parameters: self.parameters,
            query: self.query,
        })
    }
}

/// Fetch the current state of a job.
#[derive(Debug, Clone)]
pub struct GetJob<'a> {
    /// The job ID.
    pub id: &'a str,
}

impl ApiRequest for GetJob<'_> {
    type Response = JobResponse;

    fn path(&self) -> String {
        format!("jobs/{}", self.id)
    }
}

/// Ask the service to cancel and forget a job.
#[derive(Debug, Clone)]
pub struct DeleteJob<'a> {
    /// The job ID.
    pub id: &'a str,
}

impl ApiRequest for DeleteJob<'_> {
    type Response = NoContent;

    fn path(&self) -> String {
        format!("jobs/{}", self.id)
    }

    fn method(&self) -> http::Method {
        http::Method::DELETE
    }
}
