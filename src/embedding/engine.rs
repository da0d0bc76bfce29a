// Embedding engine - local sentence embeddings via Candle BERT models
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::config::EmbeddingConfig;
use crate::embedding::{DeviceHint, EmbedOptions, Embedder, Pooling};
use crate::errors::{RagError, Result};

/// BERT-family sentence embedder running on Candle
pub struct CandleEmbedder {
    model: Arc<BertModel>,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    model_id: String,
    pooling: Pooling,
    dimension: usize,
}

impl CandleEmbedder {
    /// Download (first use) and load the configured model
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let device = select_device(config.device)?;
        info!(model = %config.model_id, device = ?device, "loading embedding model");

        let api = Api::new().map_err(|e| hub_error("create HuggingFace API client", e))?;
        let repo = api.repo(Repo::with_revision(
            config.model_id.clone(),
            RepoType::Model,
            config.revision.clone(),
        ));

        let config_path = repo
            .get("config.json")
            .map_err(|e| hub_error("download model config", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| hub_error("download tokenizer", e))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| hub_error("download model weights", e))?;

        let config_contents = std::fs::read_to_string(config_path)?;
        let raw: serde_json::Value = serde_json::from_str(&config_contents)?;
        let dimension = raw
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| RagError::Embedding("model config has no hidden_size".to_string()))?
            as usize;
        let bert_config: BertConfig = serde_json::from_str(&config_contents)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| RagError::Embedding(format!("failed to load tokenizer: {}", e)))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| RagError::Embedding(format!("failed to configure truncation: {}", e)))?;

        // SAFETY: the safetensors file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)? };
        let model = BertModel::load(vb, &bert_config)?;

        info!(model = %config.model_id, dimension, "embedding model ready");

        Ok(Self {
            model: Arc::new(model),
            tokenizer: Arc::new(tokenizer),
            device,
            model_id: config.model_id.clone(),
            pooling: config.pooling,
            dimension,
        })
    }

    /// Tokenizer shared with the chunker so chunk sizes match the model
    pub fn tokenizer(&self) -> Arc<Tokenizer> {
        Arc::clone(&self.tokenizer)
    }

    fn forward_batch(&self, texts: &[&str], normalize: bool) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RagError::Embedding(format!("tokenization failed: {}", e)))?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let batch_size = encodings.len();

        let mut flat_ids = vec![0u32; batch_size * max_len];
        let mut flat_mask = vec![0u32; batch_size * max_len];
        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let start = row * max_len;
            flat_ids[start..start + ids.len()].copy_from_slice(ids);
            flat_mask[start..start + mask.len()].copy_from_slice(mask);
        }

        let token_ids = Tensor::from_vec(flat_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(flat_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = match self.pooling {
            Pooling::Cls => hidden.i((.., 0))?,
            Pooling::Mean => mean_pool(&hidden, &attention_mask)?,
        };

        let pooled = if normalize {
            let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
            pooled.broadcast_div(&norms)?
        } else {
            pooled
        };

        Ok(pooled.to_dtype(DType::F32)?.to_vec2::<f32>()?)
    }
}

impl Embedder for CandleEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str], options: &EmbedOptions) -> Result<Vec<Vec<f32>>> {
        if options.batch_size == 0 {
            return Err(RagError::InvalidArgument("batch size must be positive".to_string()));
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(RagError::Embedding("cannot embed empty text".to_string()));
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(options.batch_size) {
            vectors.extend(self.forward_batch(batch, options.normalize)?);
        }
        debug!(count = vectors.len(), normalize = options.normalize, "texts embedded");

        Ok(vectors)
    }
}

/// Mean pooling with attention mask
fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let mask_expanded = attention_mask
        .unsqueeze(2)?
        .expand(embeddings.shape())?
        .to_dtype(embeddings.dtype())?;

    let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
    let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

    Ok(sum_embeddings.broadcast_div(&sum_mask)?)
}

fn select_device(hint: DeviceHint) -> Result<Device> {
    let device = match hint {
        DeviceHint::Auto => Device::cuda_if_available(0)?,
        DeviceHint::Cpu => Device::Cpu,
        DeviceHint::Cuda(ordinal) => Device::new_cuda(ordinal)?,
    };
    Ok(device)
}

fn hub_error(action: &str, err: hf_hub::api::sync::ApiError) -> RagError {
    RagError::Embedding(format!("failed to {}: {}", action, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        let device = Device::Cpu;
        // batch 1, seq 3, hidden 2; last token is padding
        let hidden =
            Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 100.0, 100.0], (1, 3, 2), &device).unwrap();
        let mask = Tensor::from_vec(vec![1u32, 1, 0], (1, 3), &device).unwrap();

        let pooled = mean_pool(&hidden, &mask).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(pooled, vec![vec![2.0, 3.0]]);
    }

    #[test]
    fn test_select_cpu_device() {
        assert!(matches!(select_device(DeviceHint::Cpu).unwrap(), Device::Cpu));
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_dimension_and_norm() {
        let engine = CandleEmbedder::load(&EmbeddingConfig::default()).expect("load model");
        let v = engine.embed("what is dataplex?", &EmbedOptions::default()).unwrap();
        assert_eq!(v.len(), engine.dimension());
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_batch_order() {
        let engine = CandleEmbedder::load(&EmbeddingConfig::default()).expect("load model");
        let opts = EmbedOptions { batch_size: 2, normalize: true };
        let batch = engine.embed_batch(&["alpha", "beta", "gamma"], &opts).unwrap();
        let single = engine.embed("gamma", &opts).unwrap();
        assert_eq!(batch.len(), 3);
        for (a, b) in batch[2].iter().zip(single.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }
}
