//! Deterministic fake encoder for tests and offline demos.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::types::{DEFAULT_MAX_TOKENS, IndexError};

use super::{Encoder, HiddenStates, TokenBatch};

const DEFAULT_MOCK_HIDDEN: usize = 8;

/// Vocabulary bound for hashed token ids; id 0 is reserved for padding.
const MOCK_VOCAB: u64 = 30_000;

/// A deterministic, model-free [`Encoder`].
///
/// Whitespace tokens hash to stable ids and each id maps to a fixed hidden
/// vector, so identical text always embeds identically while different text
/// diverges. Padding positions produce nonzero hidden states like a real
/// model's do, which keeps masked pooling honest in tests.
#[derive(Clone, Debug)]
pub struct MockEncoder {
    hidden_size: usize,
    max_tokens: usize,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self {
            hidden_size: DEFAULT_MOCK_HIDDEN,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    #[must_use]
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size.max(1);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for MockEncoder {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn tokenize(&self, texts: &[String]) -> Result<TokenBatch, IndexError> {
        let rows: Vec<Vec<u32>> = texts
            .iter()
            .map(|text| {
                text.split_whitespace()
                    .take(self.max_tokens)
                    .map(token_id)
                    .collect()
            })
            .collect();

        let longest = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut input_ids = Vec::with_capacity(rows.len());
        let mut attention_mask = Vec::with_capacity(rows.len());
        for mut row in rows {
            let mut mask = vec![1u32; row.len()];
            row.resize(longest, 0);
            mask.resize(longest, 0);
            input_ids.push(row);
            attention_mask.push(mask);
        }

        Ok(TokenBatch {
            input_ids,
            attention_mask,
        })
    }

    fn encode(&self, batch: &TokenBatch) -> Result<HiddenStates, IndexError> {
        Ok(batch
            .input_ids
            .iter()
            .map(|row| row.iter().map(|&id| hidden_vector(id, self.hidden_size)).collect())
            .collect())
    }
}

fn token_id(word: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    word.hash(&mut hasher);
    (hasher.finish() % (MOCK_VOCAB - 1) + 1) as u32
}

/// Fixed hidden vector per token id, independent of position and batch.
fn hidden_vector(id: u32, hidden_size: usize) -> Vec<f32> {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let seed = hasher.finish();
    (0..hidden_size)
        .map(|i| {
            let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
            (bits as f64 / u64::MAX as f64) as f32 - 0.5
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_pads_to_batch_longest() {
        let encoder = MockEncoder::new();
        let batch = encoder
            .tokenize(&["one two three".to_string(), "one".to_string()])
            .unwrap();

        assert_eq!(batch.input_ids[0].len(), 3);
        assert_eq!(batch.input_ids[1].len(), 3);
        assert_eq!(batch.attention_mask[0], vec![1, 1, 1]);
        assert_eq!(batch.attention_mask[1], vec![1, 0, 0]);
        assert_eq!(batch.input_ids[1][1], 0);
    }

    #[test]
    fn identical_words_share_ids_across_rows() {
        let encoder = MockEncoder::new();
        let batch = encoder
            .tokenize(&["shared word".to_string(), "word shared".to_string()])
            .unwrap();
        assert_eq!(batch.input_ids[0][0], batch.input_ids[1][1]);
        assert_eq!(batch.input_ids[0][1], batch.input_ids[1][0]);
    }

    #[test]
    fn encode_is_deterministic() {
        let encoder = MockEncoder::new();
        let texts = vec!["hello world".to_string(), "goodbye world".to_string()];

        let first = encoder.encode(&encoder.tokenize(&texts).unwrap()).unwrap();
        let second = encoder.encode(&encoder.tokenize(&texts).unwrap()).unwrap();
        assert_eq!(first, second);

        // Different text produces different states.
        assert_ne!(first[0], first[1]);
    }

    #[test]
    fn truncates_at_max_tokens() {
        let encoder = MockEncoder::new().with_max_tokens(2);
        let batch = encoder
            .tokenize(&["one two three four".to_string()])
            .unwrap();
        assert_eq!(batch.input_ids[0].len(), 2);
    }
}
