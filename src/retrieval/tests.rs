use super::*;
use crate::database::ChunkMetadata;
use tempfile::TempDir;

const DIMENSION: usize = 256;

/// Bag-of-words embedder: each word lands in a hashed bucket, vectors are unit length
struct HashingEmbedder;

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

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::Embedding("model crashed".to_string()))
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "failing-test"
    }
}

struct BrokenLog;

impl QueryLog for BrokenLog {
    fn record(&self, _entry: &QueryLogEntry) -> Result<()> {
        Err(RagError::Io(std::io::Error::other("disk full")))
    }
}

const DOCUMENTS: [(&str, &str); 3] = [
    (
        "revenue.txt",
        "Quarterly revenue growth reached twelve percent. Revenue from subscriptions \
         drove most of the revenue increase this quarter.",
    ),
    (
        "hiring.txt",
        "The engineering team hired four people. Onboarding takes two weeks for new staff.",
    ),
    (
        "logistics.txt",
        "Warehouse shipping delays fell after the carrier contract was renegotiated.",
    ),
];

fn populated_store(dir: &TempDir) -> Arc<VectorStore> {
    let store = Arc::new(
        VectorStore::new(dir.path().join("chunks.idx"), DIMENSION).expect("should create store"),
    );
    let texts: Vec<String> = DOCUMENTS.iter().map(|(_, text)| text.to_string()).collect();
    let vectors = HashingEmbedder.embed(&texts).expect("should embed");
    let metadata = DOCUMENTS
        .iter()
        .map(|(path, text)| ChunkMetadata {
            file_path: path.to_string(),
            title: path.to_string(),
            chunk_index: 0,
            text: text.to_string(),
        })
        .collect();
    store.add(&vectors, metadata).expect("should add");
    store
}

fn engine(store: Arc<VectorStore>) -> RetrievalEngine {
    RetrievalEngine::new(store, Arc::new(HashingEmbedder), 5)
}

#[test]
fn retrieve_before_any_index_is_not_found() {
    let dir = TempDir::new().expect("should create temp dir");
    let store = Arc::new(
        VectorStore::new(dir.path().join("chunks.idx"), DIMENSION).expect("should create store"),
    );

    let err = engine(store).retrieve("revenue").expect_err("should fail");
    assert!(err.is_not_found());
}

#[test]
fn blank_query_is_rejected() {
    let dir = TempDir::new().expect("should create temp dir");
    let engine = engine(populated_store(&dir));

    assert!(matches!(
        engine.retrieve("   "),
        Err(RagError::InvalidInput(_))
    ));
}

#[test]
fn most_relevant_document_comes_first() {
    let dir = TempDir::new().expect("should create temp dir");
    let engine = engine(populated_store(&dir));

    let results = engine.retrieve_top("revenue", 5).expect("should retrieve");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].metadata.file_path, "revenue.txt");
    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
    for result in &results {
        assert!(result.relevance > 0.0 && result.relevance <= 1.0);
        assert!((result.relevance - 1.0 / (1.0 + result.distance)).abs() < f32::EPSILON);
    }
}

#[test]
fn top_k_limits_results() {
    let dir = TempDir::new().expect("should create temp dir");
    let engine = engine(populated_store(&dir));

    assert_eq!(engine.retrieve_top("shipping delays", 1).expect("should retrieve").len(), 1);
    assert!(engine.retrieve_top("shipping delays", 0).expect("should retrieve").is_empty());
    assert_eq!(engine.default_top_k(), 5);
}

#[test]
fn retrievals_are_logged() {
    let dir = TempDir::new().expect("should create temp dir");
    let log = Arc::new(MemoryQueryLog::new());
    let engine = engine(populated_store(&dir)).with_query_log(Arc::clone(&log) as Arc<dyn QueryLog>);

    let results = engine.retrieve_top("engineering onboarding", 2).expect("should retrieve");

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].query, "engineering onboarding");
    assert_eq!(entries[0].results.len(), 2);
    assert_eq!(entries[0].results[0].id, results[0].id);
    assert_eq!(entries[0].results[0].file_path, "hiring.txt");
    assert!(entries[0].response_time_ms >= 0.0);
}

#[test]
fn failing_query_log_does_not_fail_retrieval() {
    let dir = TempDir::new().expect("should create temp dir");
    let engine = engine(populated_store(&dir)).with_query_log(Arc::new(BrokenLog));

    assert_eq!(engine.retrieve("revenue").expect("should retrieve").len(), 3);
}

#[test]
fn embedding_failure_propagates() {
    let dir = TempDir::new().expect("should create temp dir");
    let engine = RetrievalEngine::new(populated_store(&dir), Arc::new(FailingEmbedder), 5);

    assert!(matches!(
        engine.retrieve("revenue"),
        Err(RagError::Embedding(_))
    ));
}

#[test]
fn dimension_mismatch_is_reported() {
    struct NarrowEmbedder;

    impl Embedder for NarrowEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 8]).collect())
        }

        fn dimension(&self) -> usize {
            8
        }

        fn model_name(&self) -> &str {
            "narrow"
        }
    }

    let dir = TempDir::new().expect("should create temp dir");
    let engine = RetrievalEngine::new(populated_store(&dir), Arc::new(NarrowEmbedder), 5);

    assert!(matches!(
        engine.retrieve("revenue"),
        Err(RagError::Config(_))
    ));
}
