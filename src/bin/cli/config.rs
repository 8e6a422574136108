use serde::Deserialize;
use sombra_filter::query::functions::CURRENT_USER;
use sombra_filter::query::{Captured, StaticContext, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit_given = explicit.is_some();
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            Some(config_path) if explicit_given => {
                return Err(ConfigError::Missing {
                    path: config_path.clone(),
                })
            }
            _ => RawConfig::default(),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn param(&self) -> Option<&str> {
        self.data.subject.param.as_deref()
    }

    pub fn collections(&self) -> &[String] {
        &self.data.subject.collections
    }

    /// Capture table as a JSON document, or `None` when the section is empty.
    pub fn captures(&self) -> Result<Option<Captured>, ConfigError> {
        if self.data.captures.is_empty() {
            return Ok(None);
        }
        let json = serde_json::to_value(&self.data.captures)
            .map_err(|source| ConfigError::Captures { source })?;
        Ok(Some(Captured::new(json)))
    }

    pub fn context(&self) -> StaticContext {
        match self.data.context.current_user.as_ref() {
            Some(user) => StaticContext::new().with(CURRENT_USER, toml_to_value(user)),
            None => StaticContext::new(),
        }
    }
}

fn toml_to_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::from(text.as_str()),
        toml::Value::Integer(number) => Value::Int(*number),
        toml::Value::Float(number) => Value::Float(*number),
        toml::Value::Boolean(flag) => Value::Bool(*flag),
        other => Value::String(other.to_string()),
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    subject: SubjectSection,
    #[serde(default)]
    captures: toml::Table,
    #[serde(default)]
    context: ContextSection,
}

#[derive(Debug, Default, Deserialize)]
struct SubjectSection {
    param: Option<String>,
    #[serde(default)]
    collections: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContextSection {
    current_user: Option<toml::Value>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read filter config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse filter config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("filter config {path} does not exist")]
    Missing { path: PathBuf },
    #[error("captures table cannot be converted: {source}")]
    Captures { source: serde_json::Error },
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("sombra").join("filter.toml"))
}
