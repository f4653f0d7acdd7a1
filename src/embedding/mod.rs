//! Batched text embedding: tokenize, encode, pool, normalize.
//!
//! The numeric contract lives here. Encoders are black boxes that turn token
//! ids into per-token hidden states; this module reduces those states to one
//! unit-length vector per text via masked mean pooling. Pooling only reads a
//! text's own token positions, so the result is invariant to how a run is
//! split into batches and to the padding other batch members introduce.

pub mod jina;
pub mod mock;

use tracing::debug;

use crate::types::{DEFAULT_BATCH_SIZE, IndexError};

pub use jina::JinaBertEncoder;
pub use mock::MockEncoder;

/// Floor for the pooling denominator; keeps an all-masked row finite.
const POOL_DENOM_FLOOR: f32 = 1e-9;

/// Floor for the normalization divisor, matching the usual p2-normalize eps.
const NORM_FLOOR: f32 = 1e-12;

/// A tokenized batch: one row of ids and one mask row per input text,
/// padded to the longest sequence in the batch.
///
/// Mask value 1 marks a real token, 0 a padding position.
#[derive(Clone, Debug, Default)]
pub struct TokenBatch {
    pub input_ids: Vec<Vec<u32>>,
    pub attention_mask: Vec<Vec<u32>>,
}

/// Per-token hidden states, shape `(batch, sequence, hidden)`.
pub type HiddenStates = Vec<Vec<Vec<f32>>>;

/// Capability seam over a pretrained tokenizer + encoder pair.
///
/// The two are acquired together: if either is unavailable the encoder fails
/// to construct and the run aborts, since no partial embedding is meaningful
/// without the model. [`JinaBertEncoder`] is the pretrained-backed
/// implementation; [`MockEncoder`] is a deterministic fake for tests.
pub trait Encoder: Send + Sync {
    /// Width of the hidden-state vectors this encoder produces.
    fn hidden_size(&self) -> usize;

    /// Tokenizes `texts` with padding to the batch longest and truncation at
    /// the encoder's configured token budget.
    fn tokenize(&self, texts: &[String]) -> Result<TokenBatch, IndexError>;

    /// Runs inference, returning hidden states aligned with the batch rows.
    fn encode(&self, batch: &TokenBatch) -> Result<HiddenStates, IndexError>;
}

/// Turns texts into unit-normalized fixed-dimension vectors, in input order.
pub struct Embedder<E> {
    encoder: E,
    batch_size: usize,
}

impl<E: Encoder> Embedder<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the number of texts per forward pass. Batch size bounds peak
    /// memory only; it never changes any text's vector.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Dimension of the vectors this embedder produces.
    pub fn dimension(&self) -> usize {
        self.encoder.hidden_size()
    }

    /// Embeds every text, preserving input order.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (batch_idx, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch = batch_idx, size = batch.len(), "embedding batch");
            let tokens = self.encoder.tokenize(batch)?;
            let hidden = self.encoder.encode(&tokens)?;
            if hidden.len() != batch.len() || tokens.attention_mask.len() != batch.len() {
                return Err(IndexError::Embedding(format!(
                    "encoder returned {} rows for a batch of {}",
                    hidden.len(),
                    batch.len()
                )));
            }
            for (states, mask) in hidden.iter().zip(&tokens.attention_mask) {
                let pooled = masked_mean_pool(states, mask, self.encoder.hidden_size());
                vectors.push(l2_normalize(pooled));
            }
        }
        Ok(vectors)
    }

    /// Embeds a single query string (a batch of one).
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| IndexError::Embedding("query produced no vector".into()))
    }
}

/// Mean of the hidden states over positions where the mask is 1.
///
/// The denominator is clamped to a small floor, so a fully masked row yields
/// a defined (all-zero) vector instead of NaN. Padding positions never
/// contribute, which is what makes the batch grouping irrelevant.
fn masked_mean_pool(states: &[Vec<f32>], mask: &[u32], hidden_size: usize) -> Vec<f32> {
    let mut summed = vec![0.0f32; hidden_size];
    let mut count = 0u32;
    for (state, &m) in states.iter().zip(mask) {
        if m == 0 {
            continue;
        }
        count += 1;
        for (acc, value) in summed.iter_mut().zip(state) {
            *acc += value;
        }
    }
    let denom = (count as f32).max(POOL_DENOM_FLOOR);
    for value in &mut summed {
        *value /= denom;
    }
    summed
}

/// Scales `vector` to unit Euclidean length, making cosine similarity and
/// dot product interchangeable at query time.
fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector
        .iter()
        .map(|value| value * value)
        .sum::<f32>()
        .sqrt()
        .max(NORM_FLOOR);
    for value in &mut vector {
        *value /= norm;
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(vector: &[f32]) -> f32 {
        vector.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    #[test]
    fn pooling_with_all_ones_mask_is_plain_mean() {
        let states = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let pooled = masked_mean_pool(&states, &[1, 1, 1], 2);
        assert_eq!(pooled, vec![3.0, 4.0]);
    }

    #[test]
    fn pooling_ignores_masked_positions() {
        let states = vec![vec![1.0, 2.0], vec![100.0, 100.0], vec![3.0, 4.0]];
        let pooled = masked_mean_pool(&states, &[1, 0, 1], 2);
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn fully_masked_row_is_finite() {
        let states = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let pooled = masked_mean_pool(&states, &[0, 0], 2);
        assert!(pooled.iter().all(|v| v.is_finite()));
        assert_eq!(pooled, vec![0.0, 0.0]);

        // Normalizing the degenerate vector must stay finite too.
        let normalized = l2_normalize(pooled);
        assert!(normalized.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn embeddings_are_unit_length() {
        let embedder = Embedder::new(MockEncoder::new());
        let texts = vec![
            "the quick brown fox".to_string(),
            "jumps over the lazy dog".to_string(),
            "a".to_string(),
        ];
        for vector in embedder.embed_batch(&texts).unwrap() {
            assert!((norm(&vector) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn batch_size_does_not_change_vectors() {
        // Varying lengths, so different groupings pad differently.
        let texts: Vec<String> = (0..7)
            .map(|i| format!("document number {i} {}", "filler ".repeat(i)))
            .collect();

        let whole = Embedder::new(MockEncoder::new())
            .with_batch_size(7)
            .embed_batch(&texts)
            .unwrap();
        let pairs = Embedder::new(MockEncoder::new())
            .with_batch_size(2)
            .embed_batch(&texts)
            .unwrap();
        let singles = Embedder::new(MockEncoder::new())
            .with_batch_size(1)
            .embed_batch(&texts)
            .unwrap();

        assert_eq!(whole, pairs);
        assert_eq!(whole, singles);
    }

    #[test]
    fn padding_from_longer_batch_members_has_no_effect() {
        let short = "tiny".to_string();
        let long = "a considerably longer document with many more words than the short one"
            .to_string();

        let alone = Embedder::new(MockEncoder::new())
            .embed_batch(std::slice::from_ref(&short))
            .unwrap();
        let padded = Embedder::new(MockEncoder::new())
            .with_batch_size(2)
            .embed_batch(&[short, long])
            .unwrap();

        assert_eq!(alone[0], padded[0]);
    }

    #[test]
    fn output_order_follows_input_order() {
        let embedder = Embedder::new(MockEncoder::new()).with_batch_size(2);
        let texts = vec![
            "alpha".to_string(),
            "beta".to_string(),
            "gamma".to_string(),
        ];
        let vectors = embedder.embed_batch(&texts).unwrap();
        assert_eq!(vectors.len(), 3);

        // Each single-text embedding must match its position in the batch run.
        for (text, expected) in texts.iter().zip(&vectors) {
            let single = embedder.embed_query(text).unwrap();
            assert_eq!(&single, expected);
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let embedder = Embedder::new(MockEncoder::new());
        assert!(embedder.embed_batch(&[]).unwrap().is_empty());
    }
}
