//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates sections, e.g. `APP_RETRIEVAL__K_BM25=4`).
//! Paths in the settings go through `expand_path` for `~` and `${VAR}`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extracts and validates the typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    pub bm25: Bm25Settings,
    pub embedding: EmbeddingSettings,
    pub vector: VectorSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        let r = &self.retrieval;
        if !(r.w_vector >= 0.0 && r.w_bm25 >= 0.0) {
            return Err(Error::InvalidConfig("fusion weights must be non-negative".into()));
        }
        if !(0.0..=1.0).contains(&r.fallback_confidence) {
            return Err(Error::InvalidConfig("retrieval.fallback_confidence must lie in [0, 1]".into()));
        }
        if r.snippet_chars == 0 {
            return Err(Error::InvalidConfig("retrieval.snippet_chars must be positive".into()));
        }
        if self.bm25.k1 <= 0.0 || !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(Error::InvalidConfig("bm25 requires k1 > 0 and b in [0, 1]".into()));
        }
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be positive".into()));
        }
        if self.embedding.tiers.is_empty() {
            return Err(Error::InvalidConfig("embedding.tiers must name at least one tier".into()));
        }
        if self.vector.candidate_multiplier == 0 {
            return Err(Error::InvalidConfig("vector.candidate_multiplier must be positive".into()));
        }
        if self.vector.remote.enabled && self.vector.remote.uri.trim().is_empty() {
            return Err(Error::InvalidConfig("vector.remote.uri is required when the remote backend is enabled".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k_vector: usize,
    pub k_bm25: usize,
    pub w_vector: f32,
    pub w_bm25: f32,
    pub snippet_chars: usize,
    /// Confidence given to unranked evidence (fallback and padding).
    pub fallback_confidence: f32,
    /// Pad ranked results up to `k` with remaining known chunks.
    pub pad_results: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k_vector: 8,
            k_bm25: 8,
            w_vector: 0.7,
            w_bm25: 0.3,
            snippet_chars: 200,
            fallback_confidence: 0.1,
            pad_results: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Bm25Settings {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Settings {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingTier {
    Model,
    Tfidf,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub dim: usize,
    /// Directory holding `config.json`, `tokenizer.json` and `model.safetensors`.
    pub model_dir: Option<String>,
    pub max_len: usize,
    /// Tiers allowed in the fallback chain, tried in fixed priority order.
    pub tiers: Vec<EmbeddingTier>,
    pub timeout_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            dim: 384,
            model_dir: None,
            max_len: 256,
            tiers: vec![EmbeddingTier::Model, EmbeddingTier::Tfidf, EmbeddingTier::Hash],
            timeout_ms: 30_000,
        }
    }
}

impl EmbeddingSettings {
    pub fn model_path(&self) -> Option<PathBuf> {
        self.model_dir.as_deref().map(expand_path)
    }

    /// Settings restricted to the deterministic hash tier.
    pub fn hash_only(dim: usize) -> Self {
        Self { dim, tiers: vec![EmbeddingTier::Hash], ..Self::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorSettings {
    /// Candidate pool is `k * candidate_multiplier` before filtering.
    pub candidate_multiplier: usize,
    pub remote: RemoteSettings,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self { candidate_multiplier: 2, remote: RemoteSettings::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteSettings {
    pub enabled: bool,
    pub uri: String,
    pub table: String,
    pub timeout_ms: u64,
    /// Passed through to the object store (credentials, region, endpoint).
    pub storage_options: BTreeMap<String, String>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            uri: String::new(),
            table: "chunks".to_string(),
            timeout_ms: 2_000,
            storage_options: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub chunk_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { chunk_dir: "storage/chunks".to_string() }
    }
}

impl StorageSettings {
    pub fn chunk_path(&self) -> PathBuf {
        expand_path(&self.chunk_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
