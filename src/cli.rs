mod color;
mod context;
mod data_source;
mod query;
mod spinner;
mod yaml;

use clap::{Parser, Subcommand};
use redac::{Context, UreqClient};
use tracing::debug;

use crate::cli::color::CliExamples;

#[derive(Debug, Parser)]
#[command(
    name = "redac",
    about = "Run SQL queries against Redash",
    version = env!("REDAC_VERSION"),
    propagate_version = true
)]
pub(crate) struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// A log level for `--log-level`, from most to least verbose.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub(crate) enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => f.write_str("trace"),
            LogLevel::Debug => f.write_str("debug"),
            LogLevel::Info => f.write_str("info"),
            LogLevel::Warn => f.write_str("warn"),
            LogLevel::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, clap::Args)]
#[command(next_help_heading = "Global Options")]
pub(crate) struct GlobalArgs {
    /// Minimum level of log messages to print
    #[arg(long, short = 'l', global = true, default_value_t)]
    pub log_level: LogLevel,
    /// Print verbose logs (same as --log-level debug)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// The filter directive to use when `REDAC_LOG` is unset.
    pub(crate) fn log_filter(&self) -> String {
        let level = if self.verbose && self.log_level > LogLevel::Debug {
            LogLevel::Debug
        } else {
            self.log_level
        };

        // Keep dependencies quiet unless asked for.
        format!("warn,redac={level}")
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print version.
    Version,
    /// Run a query
    #[command(after_long_help = CliExamples("
  # Run an inline query against the 'prod' context
  redac query -e 'select * from users where id = {{id}}' prod 42

  # Run a query from a file and write CSV
  redac query --format csv report.sql prod 2024-01-01
"))]
    Query(query::QueryArgs),
    /// Manage connection contexts
    Context(context::ContextArgs),
    /// List the data sources available to a context
    DataSources(data_source::DataSourcesArgs),
}

pub(crate) struct Cli {
    pub(crate) client: UreqClient,
    pub(crate) multiprogress: indicatif::MultiProgress,
}

pub(crate) fn run(args: Args, multiprogress: indicatif::MultiProgress) -> anyhow::Result<()> {
    debug!(command = ?args.command, "cli invocation");

    let cli = Cli {
        client: UreqClient::default(),
        multiprogress,
    };

    match args.command {
        Command::Version => {
            println!("redac {}", env!("REDAC_VERSION"));
            Ok(())
        }
        Command::Query(args) => with_rt(query::handle(&cli, args)),
        Command::Context(args) => context::handle(&cli, args),
        Command::DataSources(args) => with_rt(data_source::handle(&cli, args)),
    }
}

impl Cli {
    /// Load a context by name, applying environment overrides.
    pub(crate) fn context(&self, name: &str) -> anyhow::Result<Context> {
        Ok(Context::from_env(name)?)
    }
}

fn with_rt<T, F: Future<Output = anyhow::Result<T>>>(f: F) -> anyhow::Result<T> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let _guard = rt.enter();
    rt.block_on(f)
}
