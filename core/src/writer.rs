use crate::error::{EngineError, Result};
use crate::persist::{IndexMeta, IndexStore, FORMAT_VERSION};
use crate::timestamp::{self, Clock};
use crate::tokenizer::tokenize;
use crate::{DocId, Document, Segment, SegmentBuilder, SegmentId};
use std::sync::Arc;

/// Sole mutator of the document store and inverted index.
///
/// Documents are staged into a pending segment by [`IndexWriter::add_documents`]
/// and become durable (and publishable) only through [`IndexWriter::commit`].
pub struct IndexWriter {
    store: Arc<IndexStore>,
    clock: Arc<dyn Clock>,
    next_doc_id: DocId,
    next_segment_id: SegmentId,
    num_docs: u64,
    pending: Option<SegmentBuilder>,
}

impl IndexWriter {
    pub fn new(store: Arc<IndexStore>, meta: &IndexMeta, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            next_doc_id: meta.next_doc_id,
            next_segment_id: meta.next_segment_id,
            num_docs: meta.num_docs,
            pending: None,
        }
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn pending_docs(&self) -> usize {
        self.pending.as_ref().map(|p| p.next_doc_id() - self.next_doc_id).unwrap_or(0) as usize
    }

    /// Stage a batch. Either every document is staged or none is.
    pub fn add_documents(&mut self, docs: &[Document]) -> Result<Vec<DocId>> {
        if docs.is_empty() {
            return Err(EngineError::Validation("document batch is empty".into()));
        }
        // Encoding is the only fallible step; finish it for the whole batch before touching state.
        let encoded = docs
            .iter()
            .map(|d| timestamp::encode(d.created_date))
            .collect::<Result<Vec<_>>>()?;

        let next_segment_id = self.next_segment_id;
        let first_doc_id = self.next_doc_id;
        let builder = self
            .pending
            .get_or_insert_with(|| SegmentBuilder::new(next_segment_id, first_doc_id));
        let ids = docs
            .iter()
            .zip(encoded)
            .map(|(doc, date)| builder.add(doc.content.clone(), date, tokenize(&doc.content)))
            .collect();
        Ok(ids)
    }

    /// Persist the pending segment. Returns `None` when nothing was staged.
    ///
    /// If the batch write fails the pending batch is dropped and its doc ids are
    /// not handed out again. Once the write lands the batch counts as committed,
    /// even if the flush that follows fails; that flush is retried by the next
    /// commit or by close.
    pub fn commit(&mut self) -> Result<Option<Arc<Segment>>> {
        let builder = match self.pending.take() {
            Some(b) if !b.is_empty() => b,
            _ => return Ok(None),
        };
        let next_doc_id = builder.next_doc_id();
        let segment = builder.build();
        let meta = IndexMeta {
            version: FORMAT_VERSION,
            next_doc_id,
            next_segment_id: segment.meta.id + 1,
            num_docs: self.num_docs + segment.meta.doc_count,
            committed_at: timestamp::format_output(self.clock.now()).unwrap_or_default(),
        };

        // ids and the segment id are consumed whether or not the write lands
        self.next_doc_id = next_doc_id;
        self.next_segment_id = meta.next_segment_id;

        self.store.commit_segment(&segment, &meta)?;
        self.num_docs = meta.num_docs;
        tracing::info!(segment = segment.meta.id, docs = segment.meta.doc_count, total = self.num_docs, "committed segment");
        if let Err(e) = self.store.sync() {
            tracing::error!(error = %e, segment = segment.meta.id, "flush after commit failed");
        }
        Ok(Some(Arc::new(segment)))
    }

    /// Merge the newest segments while the older of the last two holds no more
    /// documents than the newer. Segment counts then stay logarithmic in the
    /// number of commits. `segments` is updated in step with the store; if a
    /// merge cannot be written it is left as it was before that merge.
    pub fn merge_tail(&mut self, segments: &mut Vec<Arc<Segment>>) -> Result<usize> {
        let mut merges = 0;
        while let [.., older, newer] = segments.as_slice() {
            if older.meta.doc_count > newer.meta.doc_count {
                break;
            }
            let merged = Segment::merge(older, newer);
            self.store.replace_segments(&merged, newer.meta.id)?;
            tracing::debug!(segment = merged.meta.id, absorbed = newer.meta.id, docs = merged.meta.doc_count, "merged segments");
            segments.truncate(segments.len() - 2);
            segments.push(Arc::new(merged));
            merges += 1;
        }
        if merges > 0 {
            self.store.sync()?;
        }
        Ok(merges)
    }

    /// Discard staged documents.
    pub fn rollback(&mut self) -> usize {
        let dropped = self.pending_docs();
        if let Some(b) = self.pending.take() {
            self.next_doc_id = b.next_doc_id();
        }
        dropped
    }
}
