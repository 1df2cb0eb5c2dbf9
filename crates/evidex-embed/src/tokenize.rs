use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Right-padded model inputs, each shaped `[batch, seq]`.
pub struct EncodedBatch {
    pub input_ids: Tensor,
    pub type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Encodes `texts` and pads with id 0 to the longest sequence, capped at
/// `max_len` tokens.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<EncodedBatch> {
    anyhow::ensure!(!texts.is_empty(), "cannot tokenize an empty batch");
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

    let seq = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);
    let batch = encodings.len();
    let mut ids = Vec::with_capacity(batch * seq);
    let mut types = Vec::with_capacity(batch * seq);
    let mut mask = Vec::with_capacity(batch * seq);
    for enc in &encodings {
        let n = enc.get_ids().len().min(seq);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        types.extend_from_slice(&enc.get_type_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        let pad = seq - n;
        ids.extend(std::iter::repeat(0u32).take(pad));
        types.extend(std::iter::repeat(0u32).take(pad));
        mask.extend(std::iter::repeat(0u32).take(pad));
    }

    Ok(EncodedBatch {
        input_ids: Tensor::from_vec(ids, (batch, seq), device)?,
        type_ids: Tensor::from_vec(types, (batch, seq), device)?,
        attention_mask: Tensor::from_vec(mask, (batch, seq), device)?,
    })
}
