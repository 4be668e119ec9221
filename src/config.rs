use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Connection settings for the external Meilisearch instance.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub url: String,
    #[serde(default = "default_index_name")]
    pub index: String,
    /// API key for secured instances. Falls back to `MEILI_API_KEY` in the
    /// environment; unset means an unsecured local instance.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            index: default_index_name(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_engine_url() -> String {
    "http://127.0.0.1:7700".to_string()
}
fn default_index_name() -> String {
    "documents".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

/// OCR settings for the image extractor. The recognizer is an external
/// `tesseract` process; a run that exceeds `timeout_secs` degrades to an
/// empty extraction for that file.
#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_command")]
    pub command: String,
    #[serde(default = "default_ocr_lang")]
    pub lang: String,
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            lang: default_ocr_lang(),
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}
fn default_ocr_lang() -> String {
    "jpn".to_string()
}
fn default_ocr_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8931".to_string()
}

impl EngineConfig {
    /// Effective API key: config value, else `MEILI_API_KEY` from the
    /// environment, else none.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("MEILI_API_KEY").ok())
    }
}

/// Loads configuration from a TOML file. A missing file is not an error:
/// every setting has a default, so the tool runs against a local unsecured
/// Meilisearch with zero setup.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.engine.url.trim().is_empty() {
        anyhow::bail!("engine.url must not be empty");
    }
    if config.engine.index.trim().is_empty() {
        anyhow::bail!("engine.index must not be empty");
    }
    if config.ocr.timeout_secs == 0 {
        anyhow::bail!("ocr.timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_config(Path::new("/nonexistent/docsearch.toml")).unwrap();
        assert_eq!(cfg.engine.url, "http://127.0.0.1:7700");
        assert_eq!(cfg.engine.index, "documents");
        assert_eq!(cfg.ocr.lang, "jpn");
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let cfg: Config = toml::from_str(
            r#"
            [engine]
            index = "handbook"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.engine.index, "handbook");
        assert_eq!(cfg.engine.url, "http://127.0.0.1:7700");
        assert_eq!(cfg.server.bind, "127.0.0.1:8931");
    }
}
