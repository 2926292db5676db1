use async_trait::async_trait;
use fxhash::hash64;

use crate::error::Result;
use crate::normalize::l2_normalize_in_place;
use crate::provider::EmbeddingProvider;
use crate::Embedding;

/// Deterministic offline embedder for tests, benches and local runs.
///
/// Each lowercase alphanumeric token is hashed into a pseudo-random vector and
/// the token vectors are summed, so texts sharing words land close together
/// and identical texts produce identical vectors. Text without any token
/// (including the empty string) is embedded as a single token so the result
/// is never the zero vector.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn embed_sync(&self, text: &str) -> Embedding {
        let mut out = vec![0f32; self.dimension];

        let lowered = text.to_lowercase();
        let mut tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .peekable();

        if tokens.peek().is_none() {
            accumulate(&mut out, text);
        } else {
            for token in tokens {
                accumulate(&mut out, token);
            }
        }

        l2_normalize_in_place(&mut out);
        out
    }
}

fn accumulate(out: &mut [f32], token: &str) {
    let mut state = hash64(token.as_bytes());
    for value in out.iter_mut() {
        state = splitmix64(state);
        // Top 24 bits mapped onto [-1, 1].
        *value += ((state >> 40) as f32 / (1u64 << 23) as f32) - 1.0;
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn name(&self) -> &str {
        "stub"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_sync(text))
    }
}
