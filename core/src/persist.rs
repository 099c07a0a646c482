use crate::error::{EngineError, Result};
use crate::{DocId, Segment, SegmentId, SegmentMeta, StoredDocument};
use serde::{Deserialize, Serialize};
use std::path::Path;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

const META_KEY: &[u8] = b"meta";
const DOC_PREFIX: &[u8] = b"doc/";
const SEG_PREFIX: &[u8] = b"seg/";

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub next_doc_id: DocId,
    pub next_segment_id: SegmentId,
    pub num_docs: u64,
    pub committed_at: String,
}

impl Default for IndexMeta {
    fn default() -> Self {
        Self { version: FORMAT_VERSION, next_doc_id: 0, next_segment_id: 0, num_docs: 0, committed_at: String::new() }
    }
}

/// Directory-backed store holding documents, segment postings and metadata in one sled tree.
///
/// Layout:
/// - `meta`             JSON [`IndexMeta`]
/// - `doc/<u64 BE>`     bincode [`StoredDocument`]
/// - `seg/<u64 BE>`     bincode [`Segment`] without its documents
pub struct IndexStore {
    db: sled::Db,
    flush_on_commit: bool,
    #[cfg(test)]
    fail_next_flush: AtomicBool,
}

fn doc_key(doc_id: DocId) -> Vec<u8> {
    let mut k = DOC_PREFIX.to_vec();
    k.extend_from_slice(&doc_id.to_be_bytes());
    k
}

fn seg_key(segment_id: SegmentId) -> Vec<u8> {
    let mut k = SEG_PREFIX.to_vec();
    k.extend_from_slice(&segment_id.to_be_bytes());
    k
}

impl IndexStore {
    pub fn open<P: AsRef<Path>>(root: P, flush_on_commit: bool) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let db = sled::open(root.as_ref())?;
        Ok(Self::with_db(db, flush_on_commit))
    }

    /// Store backed by a scratch directory that sled removes on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::with_db(db, false))
    }

    fn with_db(db: sled::Db, flush_on_commit: bool) -> Self {
        Self {
            db,
            flush_on_commit,
            #[cfg(test)]
            fail_next_flush: AtomicBool::new(false),
        }
    }

    pub fn load_meta(&self) -> Result<Option<IndexMeta>> {
        match self.db.get(META_KEY)? {
            Some(bytes) => {
                let meta: IndexMeta = serde_json::from_slice(&bytes)?;
                if meta.version > FORMAT_VERSION {
                    return Err(EngineError::Storage(format!(
                        "index format {} is newer than supported {}",
                        meta.version, FORMAT_VERSION
                    )));
                }
                Ok(Some(meta))
            }
            None => Ok(None),
        }
    }

    /// Read every committed segment, with its documents, in segment id order.
    pub fn load_segments(&self) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        for kv in self.db.scan_prefix(SEG_PREFIX) {
            let (_, bytes) = kv?;
            let mut segment: Segment = bincode::deserialize(&bytes)?;
            segment.docs = self.load_docs(&segment)?;
            segments.push(segment);
        }
        Ok(segments)
    }

    fn load_docs(&self, segment: &Segment) -> Result<Vec<StoredDocument>> {
        let SegmentMeta { first_doc_id: first, end_doc_id: end, doc_count: count, .. } = segment.meta;
        let mut docs = Vec::with_capacity(count as usize);
        for kv in self.db.range(doc_key(first)..doc_key(end)) {
            let (_, bytes) = kv?;
            let doc: StoredDocument = bincode::deserialize(&bytes)?;
            docs.push(doc);
        }
        if docs.len() as u64 != count {
            return Err(EngineError::Storage(format!(
                "segment {} expects {count} documents in {first}..{end}, found {}",
                segment.meta.id,
                docs.len()
            )));
        }
        Ok(docs)
    }

    /// Apply a segment, its documents and the new metadata as one atomic batch.
    ///
    /// Once this returns `Ok` the batch is committed: later reads and every
    /// later flush include it. Durability follows at the next [`IndexStore::sync`].
    pub fn commit_segment(&self, segment: &Segment, meta: &IndexMeta) -> Result<()> {
        let mut batch = sled::Batch::default();
        for doc in &segment.docs {
            batch.insert(doc_key(doc.id), bincode::serialize(doc)?);
        }
        batch.insert(seg_key(segment.meta.id), bincode::serialize(segment)?);
        batch.insert(META_KEY, serde_json::to_vec_pretty(meta)?);
        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Replace `merged`'s id with the merged postings and drop the absorbed segment, atomically.
    /// Documents stay where they are.
    pub fn replace_segments(&self, merged: &Segment, absorbed: SegmentId) -> Result<()> {
        let mut batch = sled::Batch::default();
        batch.insert(seg_key(merged.meta.id), bincode::serialize(merged)?);
        batch.remove(seg_key(absorbed));
        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Flush if this store flushes on every commit.
    pub fn sync(&self) -> Result<()> {
        if self.flush_on_commit {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        #[cfg(test)]
        {
            if self.fail_next_flush.swap(false, Ordering::SeqCst) {
                return Err(EngineError::Storage("flush failed".into()));
            }
        }
        self.db.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn fail_next_flush(&self) {
        self.fail_next_flush.store(true, Ordering::SeqCst);
    }
}
