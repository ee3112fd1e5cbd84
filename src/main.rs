mod cli;

use std::io;

use clap::Parser;
use indicatif::MultiProgress;
use tracing_subscriber::{EnvFilter, fmt::MakeWriter};

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let multiprogress = MultiProgress::new();

    let filter = EnvFilter::try_from_env("REDAC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(args.global.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(LogWriter(multiprogress.clone()))
        .with_target(false)
        .init();

    cli::run(args, multiprogress)
}

/// Writes log lines to stderr, hiding any progress bars while doing so.
#[derive(Clone)]
struct LogWriter(MultiProgress);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.suspend(|| io::stderr().flush())
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
