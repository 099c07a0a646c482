use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub type DocId = u64;
pub type SegmentId = u64;

/// Caller-facing document: free text plus a creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub created_date: time::PrimitiveDateTime,
}

impl Document {
    pub fn new(content: impl Into<String>, created_date: time::PrimitiveDateTime) -> Self {
        Self { content: content.into(), created_date }
    }
}

/// Shape of a search result handed back to callers.
pub type ContentModel = Document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocId,
    /// Stored verbatim for retrieval.
    pub content: String,
    /// `YYYYMMDDHHMMSS`, see [`crate::timestamp::encode`].
    pub created_date_encoded: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,
    pub positions: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub id: SegmentId,
    pub first_doc_id: DocId,
    /// One past the highest doc id the segment covers.
    pub end_doc_id: DocId,
    pub doc_count: u64,
}

/// Postings and documents written by one commit, or by merging adjacent segments.
/// Immutable once published.
///
/// Doc ids inside a segment are ascending within `first_doc_id..end_doc_id`
/// (ids burned by failed batches leave gaps), and every segment starts after
/// the previous one ends, so postings concatenated across segments stay
/// sorted by doc id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub meta: SegmentMeta,
    pub postings: HashMap<String, Vec<Posting>>, // postings sorted by doc_id
    /// Persisted separately under the document keys.
    #[serde(skip)]
    pub docs: Vec<StoredDocument>,
}

impl Segment {
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn doc(&self, doc_id: DocId) -> Option<&StoredDocument> {
        let idx = self.docs.binary_search_by_key(&doc_id, |d| d.id).ok()?;
        self.docs.get(idx)
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        (self.meta.first_doc_id..self.meta.end_doc_id).contains(&doc_id)
    }

    /// Fold `newer` into `older`, keeping `older`'s id. `newer` must start at or
    /// after the end of `older`.
    pub fn merge(older: &Segment, newer: &Segment) -> Segment {
        debug_assert!(older.meta.end_doc_id <= newer.meta.first_doc_id);
        let mut postings = older.postings.clone();
        for (term, list) in &newer.postings {
            postings.entry(term.clone()).or_default().extend(list.iter().cloned());
        }
        let mut docs = Vec::with_capacity(older.docs.len() + newer.docs.len());
        docs.extend(older.docs.iter().cloned());
        docs.extend(newer.docs.iter().cloned());
        Segment {
            meta: SegmentMeta {
                id: older.meta.id,
                first_doc_id: older.meta.first_doc_id,
                end_doc_id: newer.meta.end_doc_id,
                doc_count: older.meta.doc_count + newer.meta.doc_count,
            },
            postings,
            docs,
        }
    }
}

/// Accumulates one pending batch before commit.
#[derive(Debug)]
pub struct SegmentBuilder {
    meta: SegmentMeta,
    postings: HashMap<String, Vec<Posting>>,
    docs: Vec<StoredDocument>,
}

impl SegmentBuilder {
    pub fn new(id: SegmentId, first_doc_id: DocId) -> Self {
        Self {
            meta: SegmentMeta { id, first_doc_id, end_doc_id: first_doc_id, doc_count: 0 },
            postings: HashMap::new(),
            docs: Vec::new(),
        }
    }

    /// Next doc id this builder will hand out.
    pub fn next_doc_id(&self) -> DocId {
        self.meta.end_doc_id
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Append a document with its analyzed terms; returns the assigned id.
    pub fn add(&mut self, content: String, created_date_encoded: String, tokens: Vec<(String, usize)>) -> DocId {
        let doc_id = self.next_doc_id();
        let mut per_term: HashMap<String, Vec<u32>> = HashMap::new();
        for (term, pos) in tokens {
            per_term.entry(term).or_default().push(pos as u32);
        }
        for (term, positions) in per_term {
            // doc ids only grow within a builder, so pushing keeps each list sorted
            self.postings.entry(term).or_default().push(Posting {
                doc_id,
                term_freq: positions.len() as u32,
                positions,
            });
        }
        self.docs.push(StoredDocument { id: doc_id, content, created_date_encoded });
        self.meta.doc_count += 1;
        self.meta.end_doc_id += 1;
        doc_id
    }

    pub fn build(self) -> Segment {
        Segment { meta: self.meta, postings: self.postings, docs: self.docs }
    }
}

/// Point-in-time view of the committed index.
#[derive(Debug, Default, Clone)]
pub struct IndexSnapshot {
    pub segments: Vec<Arc<Segment>>,
    pub num_docs: u64,
    /// Bumped by every commit published after open.
    pub generation: u64,
}

impl IndexSnapshot {
    pub fn new(segments: Vec<Arc<Segment>>) -> Self {
        let num_docs = segments.iter().map(|s| s.meta.doc_count).sum();
        Self { segments, num_docs, generation: 0 }
    }

    /// The view that follows this one once `segments` is published; `self` is left untouched.
    pub fn succeed(&self, segments: Vec<Arc<Segment>>) -> Self {
        Self { generation: self.generation + 1, ..Self::new(segments) }
    }

    pub fn is_empty(&self) -> bool {
        self.num_docs == 0
    }

    /// Number of documents containing `term`.
    pub fn doc_freq(&self, term: &str) -> u64 {
        self.segments.iter().map(|s| s.postings(term).len() as u64).sum()
    }

    pub fn doc(&self, doc_id: DocId) -> Option<&StoredDocument> {
        // segments are ordered by first_doc_id
        let idx = self.segments.partition_point(|s| s.meta.first_doc_id <= doc_id).checked_sub(1)?;
        let segment = &self.segments[idx];
        if segment.contains(doc_id) {
            segment.doc(doc_id)
        } else {
            None
        }
    }

    pub fn docs(&self) -> impl Iterator<Item = &StoredDocument> {
        self.segments.iter().flat_map(|s| s.docs.iter())
    }
}
