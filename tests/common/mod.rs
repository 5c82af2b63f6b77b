#![allow(dead_code, reason = "each integration test uses a different subset")]

use insight_rag::Result;
use insight_rag::embeddings::Embedder;
use insight_rag::indexer::SourceDocument;

pub const DIMENSION: usize = 128;

/// Deterministic bag-of-words embedder: every word adds to a hashed bucket
pub struct HashingEmbedder;

fn bucket(word: &str) -> usize {
    let hash = word.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    (hash % DIMENSION as u64) as usize
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0_f32; DIMENSION];
                for word in text
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    vector[bucket(&word.to_lowercase())] += 1.0;
                }
                let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    vector.iter_mut().for_each(|x| *x /= norm);
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "hashing-test"
    }
}

pub fn business_documents() -> Vec<SourceDocument> {
    vec![
        SourceDocument::from_text(
            "data/revenue.txt",
            "Quarterly revenue grew twelve percent. Subscription revenue drove most of the \
             revenue growth. Enterprise revenue was flat compared to last quarter.",
        ),
        SourceDocument::from_text(
            "data/hiring.txt",
            "The engineering team hired four engineers. Onboarding new engineers takes two \
             weeks. Hiring for the support team starts next month.",
        ),
        SourceDocument::from_text(
            "data/logistics.txt",
            "Warehouse shipping delays fell after the carrier contract was renegotiated. \
             Average delivery time is now three days.",
        ),
    ]
}
