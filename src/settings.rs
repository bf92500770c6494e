//! Run settings, read from built-in defaults, an optional settings file and
//! `CONCEPTUAL_*` environment variables, in increasing order of priority.
//!
//! ```toml
//! model = "model.json"
//! purge = "context_aware"   # none | simple | context_aware
//! print_lattice = false
//! output = "text"           # text | json
//! log_filter = "info"
//! ```

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::purge::PurgeMode;

pub const DEFAULT_FILE: &str = "conceptual.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the JSON type model to analyze.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub purge: PurgeMode,
    #[serde(default)]
    pub print_lattice: bool,
    #[serde(default)]
    pub output: OutputFormat,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: None,
            purge: PurgeMode::default(),
            print_lattice: false,
            output: OutputFormat::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Loads settings. An explicitly given file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        let settings = Config::builder()
            .set_default("purge", "context_aware")?
            .set_default("print_lattice", false)?
            .set_default("output", "text")?
            .set_default("log_filter", default_log_filter())?
            .add_source(file)
            .add_source(Environment::with_prefix("CONCEPTUAL").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
