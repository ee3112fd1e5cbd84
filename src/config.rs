use std::{
    collections::BTreeMap,
    env,
    fs::File,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// An error encountered while loading or resolving a connection context.
#[derive(thiserror::Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error("Failed to load config file")]
    Io(#[from] io::Error),
    #[error("Invalid configuration")]
    Invalid(#[from] serde_yaml::Error),
    #[error("Context '{0}' not found")]
    ContextNotFound(String),
    #[error("API key contains invalid characters")]
    InvalidApiKey,
    #[error("No API key found")]
    NoApiKey,
    #[error("No endpoint found")]
    NoEndpoint,
    #[error("Invalid endpoint")]
    InvalidEndpoint(#[from] http::uri::InvalidUri),
}

/// A fully resolved connection context: where the service lives, how to
/// authenticate against it, and which data source queries run against.
#[derive(Clone, Serialize)]
pub struct Context {
    /// The name of the context.
    pub name: String,
    /// The base URL of the service, without the `/api` suffix.
    #[serde(serialize_with = "serialize_uri")]
    pub endpoint: http::Uri,
    /// The API key to use for authentication.
    #[serde(skip)]
    pub api_key: String,
    /// The data source that queries are submitted to.
    pub data_source_id: i64,
    /// The user-agent used on requests.
    #[serde(skip)]
    pub user_agent: String,
    /// The config file this context was loaded from. Unset for contexts built
    /// with [Context::new].
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"********")
            .field("data_source_id", &self.data_source_id)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// A context as stored in the config file.
#[derive(Debug, Default, Clone, Deserialize)]
struct ConfigContext {
    endpoint: Option<String>,
    api_key: Option<String>,
    #[serde(default)]
    data_source_id: i64,
}

#[derive(Debug, Default, Clone, Deserialize)]
struct Config {
    #[serde(default)]
    contexts: BTreeMap<String, ConfigContext>,
}

impl Context {
    /// Build a context directly, without reading any configuration. Fails
    /// only if the endpoint or API key is invalid.
    pub fn new(
        name: impl Into<String>,
        endpoint: &str,
        api_key: impl Into<String>,
        data_source_id: i64,
    ) -> Result<Self, Error> {
        let raw = ConfigContext {
            endpoint: Some(endpoint.to_owned()),
            api_key: Some(api_key.into()),
            data_source_id,
        };

        Self::from_raw(raw, name.into(), None)
    }

    /// Load the named context from the config file (usually
    /// ~/.config/redac.yaml).
    ///
    /// The following environment variables override the corresponding values
    /// in the config file:
    ///
    /// | Environment Variable | Config Value |
    /// |----------------------|--------------|
    /// | `REDAC_API_KEY`      | `api_key`    |
    /// | `REDAC_ENDPOINT`     | `endpoint`   |
    pub fn from_env(name: &str) -> Result<Self, Error> {
        let path = config_path()?;
        let mut raw = read_context(&path, name)?;

        if let Ok(api_key) = env::var("REDAC_API_KEY") {
            raw.api_key = Some(api_key);
        }

        if let Ok(endpoint) = env::var("REDAC_ENDPOINT") {
            raw.endpoint = Some(endpoint);
        }

        Self::from_raw(raw, name.to_owned(), Some(path))
    }

    /// Load the named context from the given file. Does not read any
    /// environment variables.
    pub fn read(path: impl AsRef<Path>, name: &str) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = read_context(path, name)?;
        Self::from_raw(raw, name.to_owned(), Some(path.to_owned()))
    }

    /// Iterate through all contexts in the config file. A missing config file
    /// yields no contexts.
    pub fn load_all() -> Result<impl Iterator<Item = Self>, Error> {
        let path = config_path()?;
        match Self::read_all(&path) {
            Ok(contexts) => Ok(contexts.collect::<Vec<_>>().into_iter()),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file found");
                Ok(Vec::new().into_iter())
            }
            Err(e) => Err(e),
        }
    }

    /// Read all contexts from the given file.
    pub fn read_all(path: impl AsRef<Path>) -> Result<impl Iterator<Item = Self>, Error> {
        let path = path.as_ref();
        let config = read_config(path)?;

        let contexts: Result<Vec<_>, Error> = config
            .contexts
            .into_iter()
            .map(|(name, raw)| Context::from_raw(raw, name, Some(path.to_owned())))
            .collect();

        Ok(contexts?.into_iter())
    }

    fn from_raw(raw: ConfigContext, name: String, path: Option<PathBuf>) -> Result<Self, Error> {
        let ConfigContext {
            endpoint,
            api_key,
            data_source_id,
        } = raw;

        let endpoint = endpoint.ok_or(Error::NoEndpoint)?.parse()?;
        let api_key = api_key.ok_or(Error::NoApiKey)?;
        if !api_key.is_ascii() {
            return Err(Error::InvalidApiKey);
        }

        Ok(Self {
            name,
            endpoint,
            api_key,
            data_source_id,
            user_agent: format!("redac/{}", env!("CARGO_PKG_VERSION")),
            config_path: path,
        })
    }

    /// The absolute URL for an API path, such as `jobs/123`.
    pub fn api_url(&self, path: &str) -> String {
        let base = self.endpoint.to_string();
        format!("{}/api/{}", base.trim_end_matches('/'), path)
    }
}

/// Returns the path of the config file, whether or not it exists.
///
/// `REDAC_CONFIG` takes precedence. Otherwise the canonical location is
/// ~/.config/redac.yaml, with a couple of fallbacks.
pub fn config_path() -> Result<PathBuf, Error> {
    if let Some(path) = env::var_os("REDAC_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let Some(home) = env::home_dir() else {
        return Err(Error::Io(io::Error::other(
            "No $HOME found for the current user",
        )));
    };

    let canonical = home.join(".config/redac.yaml");
    if canonical.exists() {
        return Ok(canonical);
    }

    for fallback in [".config/redac.yml", ".config/redac/config.yaml"] {
        let path = home.join(fallback);
        if path.exists() {
            return Ok(path);
        }
    }

    Ok(canonical)
}

fn read_config(p: &Path) -> Result<Config, Error> {
    let file = File::open(p)?;
    let config: Option<Config> = serde_yaml::from_reader(file)?;

    debug!(path = %p.display(), "loaded config file");
    Ok(config.unwrap_or_default())
}

fn read_context(p: &Path, name: &str) -> Result<ConfigContext, Error> {
    let mut config = match read_config(p) {
        Ok(config) => config,
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::ContextNotFound(name.to_string()));
        }
        Err(e) => return Err(e),
    };

    config
        .contexts
        .remove(name)
        .ok_or_else(|| Error::ContextNotFound(name.to_string()))
}

fn serialize_uri<S: serde::Serializer>(uri: &http::Uri, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(uri)
}
