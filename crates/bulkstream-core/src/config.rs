//! Configuration system for bulkstream.
//!
//! Resolution order: command-line flags → environment variables → config
//! file → defaults. Flags are applied by the CLI on top of what `load`
//! returns.
//!
//! Config file location:
//!   1. $BULKSTREAM_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/bulkstream/config.toml
//!   3. ~/.config/bulkstream/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkstreamConfig {
    pub target: TargetConfig,
    pub writer: WriterConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the bulk API.
    pub url: String,
    /// Index the generated documents are written to.
    pub index: String,
    /// Mapping type for action lines. Empty = omitted.
    pub doc_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Buffered bytes after which the open chunk is committed.
    pub max_chunk_size: usize,
    /// File receiving a copy of every byte sent. Unset = no mirror.
    pub debug_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Random fields per generated document.
    pub fields: usize,
    /// Number of documents to generate.
    pub docs: u32,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

/// 5 MiB.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 5 << 20;

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: String::new(),
            doc_type: String::new(),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            debug_out: None,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { fields: 1, docs: 0 }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("bulkstream")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl BulkstreamConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::from_toml(&path, &text)?
        } else {
            BulkstreamConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_toml(path: &std::path::Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("BULKSTREAM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        Self::write_default_to(&path)?;
        Ok(path)
    }

    /// Returns true if a new file was written.
    fn write_default_to(path: &std::path::Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        std::fs::write(path, BulkstreamConfig::default().to_toml()?)
            .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        Ok(true)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)
    }

    /// Apply BULKSTREAM_* overrides. `lookup` resolves a variable name.
    /// Unparseable numbers are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BULKSTREAM_TARGET__URL") {
            self.target.url = v;
        }
        if let Some(v) = lookup("BULKSTREAM_TARGET__INDEX") {
            self.target.index = v;
        }
        if let Some(v) = lookup("BULKSTREAM_TARGET__DOC_TYPE") {
            self.target.doc_type = v;
        }
        if let Some(n) = lookup("BULKSTREAM_WRITER__MAX_CHUNK_SIZE").and_then(|v| v.parse().ok()) {
            self.writer.max_chunk_size = n;
        }
        if let Some(v) = lookup("BULKSTREAM_WRITER__DEBUG_OUT") {
            self.writer.debug_out = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(n) = lookup("BULKSTREAM_GENERATOR__FIELDS").and_then(|v| v.parse().ok()) {
            self.generator.fields = n;
        }
        if let Some(n) = lookup("BULKSTREAM_GENERATOR__DOCS").and_then(|v| v.parse().ok()) {
            self.generator.docs = n;
        }
    }

    /// Check the settings a streaming run needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.url.is_empty() {
            return Err(ConfigError::Invalid("missing target url"));
        }
        if self.target.index.is_empty() {
            return Err(ConfigError::Invalid("missing target index"));
        }
        if self.generator.fields == 0 {
            return Err(ConfigError::Invalid("fields must be a positive integer"));
        }
        if self.generator.docs == 0 {
            return Err(ConfigError::Invalid("docs must be a positive integer"));
        }
        if self.writer.max_chunk_size == 0 {
            return Err(ConfigError::Invalid("max chunk size must be a positive integer"));
        }
        Ok(())
    }

    /// Mapping type for action lines, if one is configured.
    pub fn doc_type(&self) -> Option<&str> {
        Some(self.target.doc_type.as_str()).filter(|t| !t.is_empty())
    }
}
