use std::io::Write;

use redac::{
    Context, HttpClient as _,
    data_source::{DataSource, ListDataSources},
};
use tabwriter::TabWriter;

use crate::cli::{Cli, color::*};

#[derive(Debug, clap::Args)]
pub(crate) struct DataSourcesArgs {
    /// The context to list data sources for
    pub context: String,
}

pub(crate) async fn handle(cli: &Cli, args: DataSourcesArgs) -> anyhow::Result<()> {
    let context = cli.context(&args.context)?;
    let data_sources = list(cli, &context).await?;

    let mut out = anstream::stdout().lock();
    print_data_sources(&mut out, &data_sources)
}

pub(crate) async fn list(cli: &Cli, context: &Context) -> anyhow::Result<Vec<DataSource>> {
    let mut data_sources = cli.client.roundtrip(context, ListDataSources, None).await?;
    data_sources.sort_by_key(|ds| ds.id);
    Ok(data_sources)
}

pub(crate) fn print_data_sources(
    out: &mut impl Write,
    data_sources: &[DataSource],
) -> anyhow::Result<()> {
    let mut tw = TabWriter::new(out).ansi(true);
    writeln!(&mut tw, "{HEADER}ID\tNAME\tTYPE{HEADER:#}")?;
    for ds in data_sources {
        writeln!(&mut tw, "{}\t{}\t{DIM}{}{DIM:#}", ds.id, ds.name, ds.r#type)?;
    }

    tw.flush()?;
    Ok(())
}
