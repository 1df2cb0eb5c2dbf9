//! Sentence embedding model (BERT-style, e.g. all-MiniLM-L6-v2) on candle.
//!
//! One model per process. The first caller loads it; concurrent callers block
//! on that load. A failed load is remembered and not retried until restart.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const BATCH_SIZE: usize = 32;
const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

static SHARED: OnceLock<Option<Arc<SentenceModel>>> = OnceLock::new();
static LOAD_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

pub struct SentenceModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
    max_len: usize,
}

impl SentenceModel {
    /// Loads `config.json`, `tokenizer.json` and `model.safetensors` from `dir`.
    pub fn load(dir: &Path, max_len: usize) -> Result<Self> {
        let started = Instant::now();
        let device = select_device();

        let tokenizer_path = dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw).with_context(|| format!("parsing {}", config_path.display()))?;

        let weights_path = dir.join("model.safetensors");
        let weights = std::fs::read(&weights_path).with_context(|| format!("reading {}", weights_path.display()))?;
        let vb = VarBuilder::from_buffered_safetensors(weights, DType::F32, &device)?;
        let model = BertModel::load(vb, &config)?;

        tracing::info!(dir = %dir.display(), hidden = config.hidden_size, elapsed_ms = started.elapsed().as_millis() as u64, "embedding model loaded");
        Ok(Self { model, tokenizer, device, hidden_size: config.hidden_size, max_len })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Unit-length sentence vectors, one per input, in input order.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let enc = tokenize_batch(&self.tokenizer, batch, self.max_len, &self.device)?;
            let hidden = self.model.forward(&enc.input_ids, &enc.type_ids, Some(&enc.attention_mask))?;
            let pooled: Tensor = masked_mean_l2(&hidden, &enc.attention_mask)?;
            let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
            out.extend(rows);
        }
        Ok(out)
    }
}

/// Locates the model directory: explicit setting, `APP_MODEL_DIR`,
/// `MODEL_DIR`, then `models/all-MiniLM-L6-v2` relative to the working dir
/// or its parent.
pub fn resolve_model_dir(configured: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = configured {
        if p.exists() {
            return Ok(p);
        }
        tracing::warn!(dir = %p.display(), "configured model dir does not exist");
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() {
                tracing::debug!(var, dir = %p.display(), "using model dir from env");
                return Ok(p);
            }
        }
    }
    for base in ["models", "../models"] {
        let p = Path::new(base).join(DEFAULT_MODEL_NAME);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(anyhow!("Could not locate {} model directory", DEFAULT_MODEL_NAME))
}

/// The process-wide model, loading it on first use. `None` when the model is
/// unavailable; that outcome is cached too.
pub fn shared_model(configured: Option<PathBuf>, max_len: usize) -> Option<Arc<SentenceModel>> {
    SHARED
        .get_or_init(|| {
            LOAD_ATTEMPTS.fetch_add(1, Ordering::SeqCst);
            let loaded = resolve_model_dir(configured).and_then(|dir| SentenceModel::load(&dir, max_len));
            match loaded {
                Ok(m) => Some(Arc::new(m)),
                Err(e) => {
                    tracing::warn!(error = %e, "embedding model unavailable, later tiers will be used");
                    None
                }
            }
        })
        .clone()
}

/// Number of times a model load was attempted in this process (0 or 1).
pub fn load_attempts() -> usize {
    LOAD_ATTEMPTS.load(Ordering::SeqCst)
}
