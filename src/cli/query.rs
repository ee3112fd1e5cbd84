use std::{io::Write as _, path::PathBuf, time};

use anyhow::{Context as _, bail};
use redac::{
    job::SubmitQuery,
    poller::{JobError, JobPoller},
    query::Query,
    render::Renderer,
    table::ResultTable,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cli::{Cli, spinner::ProgressExt as _};

/// How to format the result.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Format {
    /// An ASCII grid
    #[default]
    Table1,
    /// Tab-aligned columns
    Table2,
    Csv,
    Json,
    Yaml,
}

impl From<Format> for Renderer {
    fn from(format: Format) -> Self {
        match format {
            Format::Table1 => Renderer::Table1,
            Format::Table2 => Renderer::Table2,
            Format::Csv => Renderer::Csv,
            Format::Json => Renderer::Json,
            Format::Yaml => Renderer::Yaml,
        }
    }
}

#[derive(Debug, clap::Args)]
pub(crate) struct QueryArgs {
    /// Run this SQL instead of reading a query file
    #[arg(short = 'e', long = "execute", value_name = "SQL")]
    pub execute: Option<String>,
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: Format,
    /// Do not print the header row
    #[arg(long)]
    pub no_header: bool,
    /// Do not let the server limit the number of returned rows
    #[arg(long)]
    pub no_limit: bool,
    /// Cancel the query if it takes longer than this
    #[arg(short, long, default_value = "10s", value_parser = humantime::parse_duration)]
    pub timeout: time::Duration,
    /// The query file (unless --execute is given), the context, and then one
    /// value for each query parameter
    #[arg(
        value_name = "[FILE] CONTEXT [ARGS]",
        required = true,
        allow_negative_numbers = true
    )]
    pub positional: Vec<String>,
}

pub(crate) async fn handle(cli: &Cli, args: QueryArgs) -> anyhow::Result<()> {
    let QueryArgs {
        execute,
        format,
        no_header,
        no_limit,
        timeout,
        positional,
    } = args;

    let mut positional = positional.into_iter();
    let query = match execute {
        Some(sql) => Query::parse(sql)?,
        None => {
            let Some(path) = positional.next().map(PathBuf::from) else {
                bail!("either a query file or --execute is required");
            };

            Query::from_file(&path)?
        }
    };

    let Some(context_name) = positional.next() else {
        bail!("missing context name");
    };

    let values: Vec<String> = positional.collect();
    let parameters = query
        .bind(&values[..])
        .with_context(|| format!("usage: redac query ... {context_name} {}", query.usage()))?;

    let context = cli.context(&context_name)?;
    debug!(context = context.name, ?parameters, "running query");

    let req = SubmitQuery {
        query: query.text(),
        data_source_id: context.data_source_id,
        parameters: &parameters,
        apply_auto_limit: !no_limit,
    };

    // Both the deadline and SIGINT go through the poller's cancellation
    // path, so the job gets deleted on the server.
    let deadline = tokio::time::Instant::now() + timeout;
    let cancel = CancellationToken::new();
    let watchdog = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(timeout = %humantime::format_duration(timeout), "timed out, cancelling query");
                }
                _ = tokio::signal::ctrl_c() => warn!("interrupted, cancelling query"),
                _ = cancel.cancelled() => return,
            }

            cancel.cancel();
        }
    });

    let progress = cli.new_spinner().with_message("Executing query...");
    progress.enable_steady_tick(time::Duration::from_millis(100));

    // Requests share the deadline too, since a blocking call can't be
    // interrupted.
    let result = JobPoller::new(&cli.client, &context)
        .with_deadline(deadline)
        .run(req, &cancel)
        .await;
    watchdog.abort();

    let result = match result {
        Ok(result) => {
            progress.finish_with_done();
            result
        }
        Err(e @ (JobError::Cancelled { .. } | JobError::Interrupted)) => {
            progress.finish_with_cancelled();
            return Err(e.into());
        }
        Err(e) => {
            progress.finish_with_failed();
            return Err(e.into());
        }
    };

    debug!(
        result_id = result.id,
        runtime = ?result.runtime,
        rows = result.data.rows.len(),
        "fetched query result"
    );

    let table = ResultTable::from_query_result(&result);

    let mut stdout = std::io::stdout().lock();
    Renderer::from(format).render(&mut stdout, &table, !no_header)?;
    stdout.flush()?;

    Ok(())
}
