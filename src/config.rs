//! Assistant configuration
//!
//! TOML file with one section per collaborator: the generation endpoint,
//! the content search service, the citation corpus, and the assistant's
//! own file paths. Environment takes precedence over the file for the
//! search credential.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured search API key
pub const SEARCH_API_KEY_ENV: &str = "SEARCH_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssistantConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub assistant: AssistantSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub chat_model: String,
    pub utility_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            chat_model: "qwen2.5:7b-instruct".to_string(),
            utility_model: "qwen2.5:7b-instruct".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub bucket_primary: u64,
    /// Bucket for the translated query; the primary bucket when absent
    pub bucket_translated: Option<u64>,
    pub top_n: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groundx.ai/api/v1".to_string(),
            api_key: None,
            bucket_primary: 0,
            bucket_translated: None,
            top_n: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub docs_dir: PathBuf,
    pub base_path: String,
    /// Minimum similarity (percent) for a mention to resolve
    pub threshold: u8,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("static/docs"),
            base_path: "/static/docs".to_string(),
            threshold: 70,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSection {
    pub keywords_path: PathBuf,
    pub instruction_path: PathBuf,
    /// Subject area the retrieval gate classifies queries against
    pub topic: String,
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            keywords_path: PathBuf::from("kw.txt"),
            instruction_path: PathBuf::from("instructions.json"),
            topic: "infectologia".to_string(),
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a file, creating a default one if absent
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            let config = AssistantConfig::default();
            config.save(&config_path)?;
            return Ok(config.with_env_overrides());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: AssistantConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        Ok(config.with_env_overrides())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    /// Default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".docent").join("config.toml"))
    }

    /// Apply environment overrides (credentials never have to live on disk)
    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = env::var(SEARCH_API_KEY_ENV) {
            if !key.is_empty() {
                self.search.api_key = Some(key);
            }
        }
        self
    }

    /// Bucket used for the translated-language search
    pub fn bucket_translated(&self) -> u64 {
        self.search
            .bucket_translated
            .unwrap_or(self.search.bucket_primary)
    }
}
