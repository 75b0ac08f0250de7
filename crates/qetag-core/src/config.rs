use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{QetagError, QetagResult};

/// Top-level configuration (loaded from qetag.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QetagConfig {
    pub hash: HashConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Bytes requested per read when hashing files (default: 64 KiB)
    pub read_buffer_size: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Result format: "text" or "json"
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<etag>  <path>`, one line per input
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl QetagConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(content: &str) -> QetagResult<Self> {
        let config: QetagConfig =
            toml::from_str(content).map_err(|e| QetagError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. Returns `None` when the file does not exist so the
    /// caller can fall back to defaults and report it once logging is up.
    pub fn load(path: &Path) -> QetagResult<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::from_toml_str(&content)
            .map(Some)
            .map_err(|e| QetagError::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> QetagResult<()> {
        if self.hash.read_buffer_size == 0 {
            return Err(QetagError::Config(
                "hash.read_buffer_size must be > 0".into(),
            ));
        }
        match self.log.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(QetagError::Config(format!(
                "log.format must be \"text\" or \"json\", got \"{other}\""
            ))),
        }
    }
}
