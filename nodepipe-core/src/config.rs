//! Configuration - run and parser options
//!
//! Every field has a default, so a config file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub run: RunOptions,
    #[serde(default)]
    pub parser: ParserOptions,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    /// Emit per-step diagnostics through `log`
    #[serde(default)]
    pub logging: bool,
    /// Write `output<N>.png` after every step
    #[serde(default)]
    pub save_intermediate: bool,
    #[serde(default = "default_save_directory")]
    pub save_directory: PathBuf,
}

fn default_save_directory() -> PathBuf {
    PathBuf::from("intermediate")
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            logging: false,
            save_intermediate: false,
            save_directory: default_save_directory(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserOptions {
    #[serde(default)]
    pub unknown_keyword: UnknownKeywordPolicy,
}

/// What the parser does with a keyword it does not recognise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeywordPolicy {
    /// Fail with a parse error naming the line
    #[default]
    Reject,
    /// Legacy behaviour: a parameterless line becomes Vignette and a
    /// parameterized line is read as Crop
    Fallback,
}
