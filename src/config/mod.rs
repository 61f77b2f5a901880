//! Recipe file model
//!
//! A recipe is a YAML file naming an ordered list of steps. Parsing
//! validates the shape up front — scalar-only argument records, known
//! engines, compilable patterns — so nothing fails after workers start.

use crate::transform::{engines, ArgumentRecord, EngineKind, ScalarValue, Step, TransformError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeConfig {
    /// Recipe name; recorded in the case header
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub name: String,
    pub engine: EngineKind,
    #[serde(default)]
    pub args: BTreeMap<String, serde_yaml::Value>,
    /// Pass rewritten content through the formatter before it is applied
    #[serde(default)]
    pub format: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read recipe {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("recipe is not valid YAML")]
    Parse(#[from] serde_yaml::Error),

    #[error("recipe has no steps")]
    Empty,

    #[error("step '{step}' argument '{name}' must be a scalar")]
    NonScalarArgument { step: String, name: String },

    #[error("step '{step}' is invalid")]
    BadStep {
        step: String,
        #[source]
        source: TransformError,
    },
}

impl RecipeConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: RecipeConfig = serde_yaml::from_str(text)?;
        if config.steps.is_empty() {
            return Err(ConfigError::Empty);
        }
        Ok(config)
    }

    /// Resolve every step config into a loaded step, validating arguments
    /// and compiling patterns.
    pub fn load_steps(&self) -> Result<Vec<Step>, ConfigError> {
        self.steps.iter().map(|step| step.load()).collect()
    }
}

impl StepConfig {
    fn load(&self) -> Result<Step, ConfigError> {
        let args = self.argument_record()?;
        engines::load_step(&self.name, self.engine, args, self.format).map_err(|source| {
            ConfigError::BadStep {
                step: self.name.clone(),
                source,
            }
        })
    }

    /// Flatten the raw YAML args into a validated scalar map.
    pub fn argument_record(&self) -> Result<ArgumentRecord, ConfigError> {
        self.args
            .iter()
            .map(|(name, value)| {
                let scalar = scalar_from_yaml(value).ok_or_else(|| {
                    ConfigError::NonScalarArgument {
                        step: self.name.clone(),
                        name: name.clone(),
                    }
                })?;
                Ok((name.clone(), scalar))
            })
            .collect()
    }
}

fn scalar_from_yaml(value: &serde_yaml::Value) -> Option<ScalarValue> {
    match value {
        serde_yaml::Value::Bool(b) => Some(ScalarValue::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(ScalarValue::Int(i))
            } else {
                n.as_f64().map(ScalarValue::Float)
            }
        }
        serde_yaml::Value::String(s) => Some(ScalarValue::String(s.clone())),
        _ => None,
    }
}
