//! The seam between the API types and an actual HTTP client.

use std::{io::Read as _, time};

use crate::{ApiError, ApiRequest, ApiResponse, Context};

/// An error encountered while making an API call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be built, usually because of a bad endpoint.
    #[error("failed to create request")]
    Request(#[from] http::Error),
    /// The request could not be sent, or the response could not be received.
    #[error("failed to send request")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The service responded, but not successfully.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Something that can send requests to the service.
#[allow(async_fn_in_trait)]
pub trait HttpClient {
    /// Send a request and collect the whole response. Non-200 statuses are
    /// not errors at this level. If `timeout` is set, it bounds this request
    /// alone.
    async fn send(
        &self,
        req: http::Request<String>,
        timeout: Option<time::Duration>,
    ) -> Result<http::Response<Vec<u8>>, ClientError>;

    /// Send an API request for the given context and parse the response.
    async fn roundtrip<T: ApiRequest>(
        &self,
        context: &Context,
        req: T,
        timeout: Option<time::Duration>,
    ) -> Result<T::Response, ClientError> {
        let req = req.into_request(context)?;
        tracing::trace!(method = %req.method(), uri = %req.uri(), "sending request");

        let resp = self.send(req, timeout).await?;
        let resp = T::Response::from_response(resp.map(std::io::Cursor::new))?;
        Ok(resp)
    }
}

/// An [HttpClient] backed by [ureq]. Calls run on tokio's blocking pool, so
/// this must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Create a client. If `timeout` is set, it bounds every request.
    pub fn new(timeout: Option<time::Duration>) -> Self {
        // Allows error responses to be parsed.
        let cfg = ureq::config::Config::builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(cfg),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HttpClient for UreqClient {
    async fn send(
        &self,
        req: http::Request<String>,
        timeout: Option<time::Duration>,
    ) -> Result<http::Response<Vec<u8>>, ClientError> {
        let agent = match timeout {
            Some(_) => Self::new(timeout).agent,
            None => self.agent.clone(),
        };

        tokio::task::spawn_blocking(move || {
            let resp = agent
                .run(req)
                .map_err(|e| ClientError::Transport(e.into()))?;

            let (parts, body) = resp.into_parts();
            let mut buf = Vec::new();
            body.into_reader()
                .read_to_end(&mut buf)
                .map_err(|e| ClientError::Transport(e.into()))?;

            Ok(http::Response::from_parts(parts, buf))
        })
        .await
        .map_err(|e| ClientError::Transport(e.into()))?
    }
}
