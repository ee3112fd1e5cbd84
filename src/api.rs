use std::io::Read;

use serde::{Serialize, de::DeserializeOwned};

use crate::Context;

pub mod data_source;
mod error;
pub mod job;
pub mod query_result;

pub use error::*;

/// Implemented by types that can be sent as requests to the Redash API.
pub trait ApiRequest: Sized {
    /// The corresponding response type.
    type Response: ApiResponse;

    /// The path that the request should take, relative to `/api/`.
    fn path(&self) -> String;

    /// The method to use.
    fn method(&self) -> http::Method {
        http::Method::GET
    }

    /// The serializable request body.
    fn body(&self) -> Option<impl Serialize> {
        None::<&()>
    }

    /// Consume the request and return an [http::Request] suitable for passing
    /// to your favorite HTTP client.
    fn into_request(self, context: &Context) -> Result<http::Request<String>, http::Error> {
        let req = http::Request::builder()
            .method(self.method())
            .uri(context.api_url(&self.path()))
            .header(
                http::header::AUTHORIZATION,
                format!("Key {}", context.api_key),
            )
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::USER_AGENT, &context.user_agent);

        if let Some(body) = self.body() {
            let body_str =
                serde_json::to_string(&body).expect("JSON serialization should be infallible");
            req.header(http::header::CONTENT_LENGTH, body_str.len())
                .body(body_str)
        } else {
            req.body("".to_string())
        }
    }
}

/// Implemented by types that can be read as responses from the Redash API.
pub trait ApiResponse: Sized {
    /// Read the response from an [http::Response] object.
    fn from_response(resp: http::Response<impl Read>) -> Result<Self, ApiError> {
        let (parts, body) = resp.into_parts();
        Self::from_response_parts(parts, body)
    }

    /// Read the response from pre-parsed parts.
    fn from_response_parts(parts: http::response::Parts, body: impl Read)
    -> Result<Self, ApiError>;
}

/// A private trait for types that are deserialized directly from a JSON
/// response body.
pub(crate) trait JsonResponse: DeserializeOwned {}

impl<T: JsonResponse> ApiResponse for T {
    fn from_response_parts(
        parts: http::response::Parts,
        body: impl Read,
    ) -> Result<Self, ApiError> {
        let body = read_ok_body(&parts, body)?;
        let de = &mut serde_json::Deserializer::from_slice(&body);

        serde_path_to_error::deserialize(de).map_err(|e| {
            tracing::error!("Failed to parse API response: {e}");
            ApiError::InvalidResponse {
                status: parts.status,
                source: e,
            }
        })
    }
}

/// A response whose body carries nothing the client needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoContent;

impl ApiResponse for NoContent {
    fn from_response_parts(
        parts: http::response::Parts,
        body: impl Read,
    ) -> Result<Self, ApiError> {
        read_ok_body(&parts, body)?;
        Ok(NoContent)
    }
}

/// Reads the whole body, turning anything other than a 200 into an error
/// that carries the body text.
fn read_ok_body(parts: &http::response::Parts, mut body: impl Read) -> Result<Vec<u8>, ApiError> {
    let mut buf = Vec::new();
    body.read_to_end(&mut buf)?;

    if parts.status != http::StatusCode::OK {
        return Err(ApiError::Status {
            status: parts.status,
            body: String::from_utf8_lossy(&buf).into_owned(),
        });
    }

    Ok(buf)
}
