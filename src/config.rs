use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QsError, Result};
use crate::search::scoring::{ReasonThresholds, ScoringWeights};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vectorizer: VectorizerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    /// Load config: explicit path (or `QSIM_CONFIG`) alone, otherwise the
    /// global file patched by `<project_root>/qsim.toml`. Env overrides last.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("QSIM_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                QsError::MissingConfig(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&project_root.join("qsim.toml"))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a complete config from TOML text (no env overrides).
    pub fn from_toml(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| QsError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("qsim/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| QsError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| QsError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.vectorizer {
            self.vectorizer.merge(patch);
        }
        if let Some(patch) = patch.scoring {
            self.scoring.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("QSIM_VECTORIZER_BACKEND") {
            self.vectorizer.backend = value;
        }
        if let Some(value) = env_parse::<usize>("QSIM_VECTOR_DIMS")? {
            self.vectorizer.dims = value;
        }
        if let Some(value) = env_parse::<usize>("QSIM_NGRAM_MAX")? {
            self.vectorizer.ngram_max = value;
        }

        if let Some(value) = env_parse::<f64>("QSIM_WEIGHT_TEXT")? {
            self.scoring.weights.text = value;
        }
        if let Some(value) = env_parse::<f64>("QSIM_WEIGHT_ANSWER")? {
            self.scoring.weights.answer = value;
        }
        if let Some(value) = env_parse::<f64>("QSIM_WEIGHT_TYPE")? {
            self.scoring.weights.question_type = value;
        }
        if let Some(value) = env_parse::<f64>("QSIM_WEIGHT_DIFFICULTY")? {
            self.scoring.weights.difficulty = value;
        }
        if let Some(value) = env_parse::<f64>("QSIM_WEIGHT_SUBJECT")? {
            self.scoring.weights.subject = value;
        }

        if let Some(value) = env_bool("QSIM_CACHE_ENABLED") {
            self.cache.enabled = value;
        }
        if env_bool("QSIM_CACHE_DISABLED").unwrap_or(false) {
            self.cache.enabled = false;
        }
        if let Some(value) = env_parse::<usize>("QSIM_CACHE_CAPACITY")? {
            self.cache.capacity = value;
        }

        if let Some(value) = env_parse::<usize>("QSIM_DEFAULT_TOP_K")? {
            self.search.default_top_k = value;
        }
        if let Some(value) = env_parse::<f64>("QSIM_DEFAULT_THRESHOLD")? {
            self.search.default_threshold = value;
        }

        Ok(())
    }

    /// Reject configurations the engine cannot run with.
    ///
    /// A zero cache capacity is not rejected here; the engine degrades to
    /// running without a cache.
    pub fn validate(&self) -> Result<()> {
        if self.vectorizer.backend != "hash" {
            return Err(QsError::Config(format!(
                "unknown vectorizer backend {} (expected hash)",
                self.vectorizer.backend
            )));
        }
        if self.vectorizer.dims == 0 {
            return Err(QsError::Config("vectorizer.dims must be at least 1".to_string()));
        }
        if self.vectorizer.ngram_max == 0 {
            return Err(QsError::Config(
                "vectorizer.ngram_max must be at least 1".to_string(),
            ));
        }
        self.scoring.weights.validate()?;
        if self.search.default_top_k == 0 {
            return Err(QsError::Config("search.default_top_k must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.search.default_threshold) {
            return Err(QsError::Config(format!(
                "search.default_threshold {} out of range 0-1",
                self.search.default_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    pub backend: String,
    pub dims: usize,
    pub ngram_max: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            dims: crate::search::embeddings::DEFAULT_DIMS,
            ngram_max: crate::search::embeddings::DEFAULT_NGRAM_MAX,
        }
    }
}

impl VectorizerConfig {
    fn merge(&mut self, patch: VectorizerPatch) {
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.dims {
            self.dims = value;
        }
        if let Some(value) = patch.ngram_max {
            self.ngram_max = value;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub reasons: ReasonThresholds,
}

impl ScoringConfig {
    fn merge(&mut self, patch: ScoringPatch) {
        if let Some(weights) = patch.weights {
            if let Some(value) = weights.text {
                self.weights.text = value;
            }
            if let Some(value) = weights.answer {
                self.weights.answer = value;
            }
            if let Some(value) = weights.question_type {
                self.weights.question_type = value;
            }
            if let Some(value) = weights.difficulty {
                self.weights.difficulty = value;
            }
            if let Some(value) = weights.subject {
                self.weights.subject = value;
            }
        }
        if let Some(reasons) = patch.reasons {
            if let Some(value) = reasons.text {
                self.reasons.text = value;
            }
            if let Some(value) = reasons.answer {
                self.reasons.answer = value;
            }
            if let Some(value) = reasons.difficulty {
                self.reasons.difficulty = value;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: crate::search::cache::DEFAULT_CAPACITY,
        }
    }
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.capacity {
            self.capacity = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_top_k: usize,
    pub default_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            default_threshold: 0.3,
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.default_top_k {
            self.default_top_k = value;
        }
        if let Some(value) = patch.default_threshold {
            self.default_threshold = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub vectorizer: Option<VectorizerPatch>,
    pub scoring: Option<ScoringPatch>,
    pub cache: Option<CachePatch>,
    pub search: Option<SearchPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VectorizerPatch {
    pub backend: Option<String>,
    pub dims: Option<usize>,
    pub ngram_max: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScoringPatch {
    pub weights: Option<WeightsPatch>,
    pub reasons: Option<ReasonsPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WeightsPatch {
    pub text: Option<f64>,
    pub answer: Option<f64>,
    pub question_type: Option<f64>,
    pub difficulty: Option<f64>,
    pub subject: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ReasonsPatch {
    pub text: Option<f64>,
    pub answer: Option<f64>,
    pub difficulty: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub enabled: Option<bool>,
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub default_top_k: Option<usize>,
    pub default_threshold: Option<f64>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|err| {
            QsError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}
