//! Document indexing and date-range search over an append-only inverted index.

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod persist;
pub mod query;
pub mod searcher;
pub mod timestamp;
pub mod tokenizer;
pub mod writer;

pub use config::EngineConfig;
pub use engine::SearchEngine;
pub use error::{EngineError, ErrorKind, Result};
pub use index::{
    ContentModel, DocId, Document, IndexSnapshot, Posting, Segment, SegmentBuilder, SegmentId, SegmentMeta,
    StoredDocument,
};
pub use searcher::SearchHit;
