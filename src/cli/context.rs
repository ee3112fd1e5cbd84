use std::{collections::BTreeMap, fs, io::Write, path::Path};

use anyhow::{Context as _, bail};
use redac::{ConfigError, Context, config_path};
use serde::Serialize;
use tabwriter::TabWriter;

use crate::cli::{Cli, color::*, data_source, with_rt, yaml};

#[derive(Debug, clap::Args)]
pub(crate) struct ContextArgs {
    #[command(subcommand)]
    pub command: ContextCommand,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum ContextCommand {
    /// List contexts
    #[clap(alias = "list")]
    Ls,
    /// Add a context
    #[command(after_long_help = CliExamples("
  # Find out which data sources the key can see
  redac context add prod --endpoint https://redash.example.com --api-key $KEY

  # Then register the context
  redac context add prod --endpoint https://redash.example.com --api-key $KEY --data-source-id 3
"))]
    Add(ContextAddArgs),
    /// Remove contexts
    #[clap(alias = "del")]
    Rm(ContextRmArgs),
}

#[derive(Debug, clap::Args)]
pub(crate) struct ContextAddArgs {
    /// Name of the new context
    pub name: String,
    /// Base URL of the Redash server
    #[arg(long)]
    pub endpoint: url::Url,
    /// API key to authenticate with
    #[arg(long)]
    pub api_key: String,
    /// Data source to run queries against. If omitted, the available data
    /// sources are listed instead
    #[arg(long)]
    pub data_source_id: Option<i64>,
}

#[derive(Debug, clap::Args)]
pub(crate) struct ContextRmArgs {
    /// Names of the contexts to remove
    #[arg(required = true)]
    pub names: Vec<String>,
}

pub(crate) fn handle(cli: &Cli, args: ContextArgs) -> anyhow::Result<()> {
    match args.command {
        ContextCommand::Ls => context_ls(),
        ContextCommand::Add(args) => context_add(cli, args),
        ContextCommand::Rm(args) => context_rm(args),
    }
}

fn context_ls() -> anyhow::Result<()> {
    let mut out = anstream::stdout().lock();
    let mut tw = TabWriter::new(&mut out).ansi(true);

    writeln!(&mut tw, "{HEADER}NAME\tENDPOINT\tDATA SOURCE{HEADER:#}")?;
    for context in Context::load_all()? {
        writeln!(
            &mut tw,
            "{GREEN}{}{GREEN:#}\t{}\t{}",
            context.name, context.endpoint, context.data_source_id
        )?;
    }

    tw.flush()?;
    Ok(())
}

fn context_add(cli: &Cli, args: ContextAddArgs) -> anyhow::Result<()> {
    let ContextAddArgs {
        name,
        endpoint,
        api_key,
        data_source_id,
    } = args;

    if Context::load_all()?.any(|c| c.name == name) {
        bail!("context {name:?} already exists");
    }

    let endpoint = endpoint.as_str().trim_end_matches('/').to_owned();

    let Some(data_source_id) = data_source_id else {
        let context = Context::new(&name, &endpoint, &api_key, 0)?;
        let data_sources = with_rt(data_source::list(cli, &context))
            .context("failed to list data sources")?;

        let mut out = anstream::stdout().lock();
        data_source::print_data_sources(&mut out, &data_sources)?;
        bail!("choose a data source and pass it with --data-source-id");
    };

    // Validates the endpoint and key.
    Context::new(&name, &endpoint, &api_key, data_source_id)?;

    let path = config_path()?;
    let existing = match fs::read_to_string(&path) {
        Ok(content) => !content.trim().is_empty(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(e).context(format!("failed to read {}", path.display())),
    };

    if existing {
        yaml::edit_yaml(&path, |doc| {
            let mut context = yaml::mapping_at_path(doc, &["contexts", &name])?;
            yaml::upsert_str(&mut context, "endpoint", &endpoint);
            yaml::upsert_str(&mut context, "api_key", &api_key);
            yaml::upsert_i64(&mut context, "data_source_id", data_source_id);
            Ok(())
        })?;
    } else {
        let config = NewConfig {
            contexts: BTreeMap::from([(
                name.as_str(),
                NewContext {
                    endpoint: &endpoint,
                    api_key: &api_key,
                    data_source_id,
                },
            )]),
        };

        write_new_config(&path, &serde_yaml::to_string(&config)?)?;
    }

    eprintln!("Added context {name:?} to {}", path.display());
    Ok(())
}

fn context_rm(args: ContextRmArgs) -> anyhow::Result<()> {
    let path = config_path()?;
    let known: Vec<_> = Context::load_all()?.map(|c| c.name).collect();

    for name in &args.names {
        if !known.contains(name) {
            return Err(ConfigError::ContextNotFound(name.clone()).into());
        }
    }

    yaml::edit_yaml(&path, |doc| {
        let mut contexts = yaml::mapping_at_path(doc, &["contexts"])?;
        for name in &args.names {
            let _ = contexts.remove(name);
        }

        Ok(())
    })?;

    for name in &args.names {
        eprintln!("Removed context {name:?}");
    }

    Ok(())
}

#[derive(Serialize)]
struct NewConfig<'a> {
    contexts: BTreeMap<&'a str, NewContext<'a>>,
}

#[derive(Serialize)]
struct NewContext<'a> {
    endpoint: &'a str,
    api_key: &'a str,
    data_source_id: i64,
}

/// Write a config file that doesn't exist yet. It holds API keys, so only
/// the owner may read it.
fn write_new_config(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt as _;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
