// Database module
// Exact vector index, chunk metadata, and their durable pairing on disk

pub mod consistency;
pub mod index;
pub mod metadata;
pub mod persistence;
pub mod vector_store;

pub use consistency::ConsistencyReport;
pub use index::{FlatIndex, Neighbor, relevance_score};
pub use metadata::{ChunkMetadata, MetadataStore};
pub use persistence::{IndexPersistence, IndexState, Manifest};
pub use vector_store::VectorStore;
