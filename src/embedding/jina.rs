//! Pretrained encoder backed by candle's Jina-BERT implementation.

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::jina_bert::{BertModel, Config};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::info;

use crate::types::IndexError;

use super::{Encoder, HiddenStates, TokenBatch};

/// Local inference over `jinaai/jina-embeddings-v2-base-en` (or a compatible
/// checkpoint): Hugging Face tokenizer plus a candle forward pass producing
/// per-token hidden states.
///
/// Model weights and tokenizer are fetched from the hub cache on
/// construction; both must be present or construction fails, which aborts
/// the run before any document is embedded.
pub struct JinaBertEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
}

impl JinaBertEncoder {
    /// Downloads (or reuses from cache) and loads `model_id`, configuring the
    /// tokenizer for pad-to-longest batches truncated at `max_tokens`.
    pub fn load(model_id: &str, max_tokens: usize) -> Result<Self, IndexError> {
        let device = Device::cuda_if_available(0).map_err(embed_err)?;

        let api = Api::new().map_err(embed_err)?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));
        let weights_path = repo.get("model.safetensors").map_err(embed_err)?;
        let tokenizer_path = repo.get("tokenizer.json").map_err(embed_err)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path).map_err(embed_err)?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                ..Default::default()
            }))
            .map_err(embed_err)?;

        let config = Config::v2_base();
        let hidden_size = config.hidden_size;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
        }
        .map_err(embed_err)?;
        let model = BertModel::new(vb, &config).map_err(embed_err)?;

        info!(model = model_id, hidden = hidden_size, device = ?device, "encoder ready");

        Ok(Self {
            model,
            tokenizer,
            device,
            hidden_size,
        })
    }
}

impl Encoder for JinaBertEncoder {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn tokenize(&self, texts: &[String]) -> Result<TokenBatch, IndexError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(embed_err)?;

        let mut input_ids = Vec::with_capacity(encodings.len());
        let mut attention_mask = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            input_ids.push(encoding.get_ids().to_vec());
            attention_mask.push(encoding.get_attention_mask().to_vec());
        }

        Ok(TokenBatch {
            input_ids,
            attention_mask,
        })
    }

    fn encode(&self, batch: &TokenBatch) -> Result<HiddenStates, IndexError> {
        if batch.input_ids.is_empty() {
            return Ok(Vec::new());
        }

        // ALiBi attention runs over the full padded batch; padding positions
        // are excluded downstream by masked mean pooling.
        let rows = batch
            .input_ids
            .iter()
            .map(|row| Tensor::new(row.as_slice(), &self.device))
            .collect::<Result<Vec<_>, _>>()
            .map_err(embed_err)?;
        let token_ids = Tensor::stack(&rows, 0).map_err(embed_err)?;

        let hidden = self.model.forward(&token_ids).map_err(embed_err)?;
        hidden.to_vec3::<f32>().map_err(embed_err)
    }
}

fn embed_err(err: impl std::fmt::Display) -> IndexError {
    IndexError::Embedding(err.to_string())
}
