use std::{error::Error, fmt::Display, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CONFIG_FILE: &str = "sqlc-gen-go.toml";

#[derive(Debug, Clone)]
pub enum ConfigError {
    Unreadable { path: PathBuf, reason: String },
    OptionsNotATable,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Unreadable { path, reason } => write!(
                f,
                "encountered '{reason}' attempting to read {}",
                path.display()
            ),
            ConfigError::OptionsNotATable => {
                write!(f, "plugin options of the request must be a JSON object")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[must_use]
pub struct GeneratorConfig {
    /// Path of the generation request, read from stdin when absent.
    pub request: Option<PathBuf>,
    /// Directory the generated files are written to, stdout when absent.
    pub out: Option<PathBuf>,
    /// Plugin options applied underneath the ones carried by the request.
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub options: toml::Table,
}

impl GeneratorConfig {
    /// Loads the config file. A missing default file is not an error, an explicit one must exist.
    pub fn load(path: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (PathBuf::from(CONFIG_FILE), false),
        };
        if !explicit && !std::fs::exists(&path)? {
            tracing::info!("No {CONFIG_FILE} found, using defaults.");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|error| ConfigError::Unreadable {
            path: path.clone(),
            reason: error.to_string(),
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Fills in every option the request leaves unset.
    pub fn merge_options(&self, request_options: Value) -> Result<Value, Box<dyn Error>> {
        if self.options.is_empty() {
            return Ok(request_options);
        }
        let mut merged: Map<String, Value> = match request_options {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => return Err(ConfigError::OptionsNotATable.into()),
        };
        for (key, value) in &self.options {
            if !merged.contains_key(key) {
                merged.insert(key.clone(), serde_json::to_value(value)?);
            }
        }
        Ok(Value::Object(merged))
    }
}
