//! A client for [Redash](https://redash.io).
//!
//! This crate submits parameterized SQL queries to a Redash server, waits for
//! the resulting job, and turns the stored result into a grid of strings
//! that can be written out in several formats.
//!
//! # HTTP Requests and Responses
//!
//! The API types are designed to work with any HTTP client that uses the [`http`]
//! crate. Use [`ApiRequest::into_request`] to create a request, and
//! [`ApiResponse::from_response`] to parse the response. The [`HttpClient`]
//! trait wraps that up for the [`poller`], with [`UreqClient`] as the default
//! implementation.
//!
//! # Example
//!
//! ```no_run
//! use redac::{
//!     Context, UreqClient, job::SubmitQuery, poller::JobPoller, query::Query,
//!     render::Renderer, table::ResultTable,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let context = Context::from_env("prod")?;
//! let query = Query::parse("select * from users where id = {{id}}")?;
//! let parameters = query.bind(&["42"])?;
//!
//! let req = SubmitQuery {
//!     query: query.text(),
//!     data_source_id: context.data_source_id,
//!     parameters: &parameters,
//!     apply_auto_limit: true,
//! };
//!
//! let client = UreqClient::default();
//! let result = JobPoller::new(&client, &context)
//!     .run(req, &CancellationToken::new())
//!     .await?;
//!
//! let table = ResultTable::from_query_result(&result);
//! Renderer::Csv.render(&mut std::io::stdout(), &table, true)?;
//! # Ok(())
//! # }
//! ```

#![warn(
    anonymous_parameters,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_qualifications,
    variant_size_differences
)]

mod api;
mod client;
mod config;
pub mod poller;
pub mod query;
pub mod render;
pub mod table;

pub use api::*;
pub use client::*;
pub use config::{Context, Error as ConfigError, config_path};
