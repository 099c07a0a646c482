use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::filter::RangeFilter;
use crate::persist::IndexStore;
use crate::query;
use crate::searcher::{SearchHit, Searcher};
use crate::timestamp::{Clock, SystemClock};
use crate::writer::IndexWriter;
use crate::{ContentModel, Document, IndexSnapshot};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use time::PrimitiveDateTime;

/// The single index instance, shared by `Arc` with whatever issues operations.
///
/// Writes are serialized through the writer mutex. Each search clones the
/// current snapshot `Arc` and evaluates against it without holding any lock,
/// so a commit that lands mid-search never changes what that search sees.
pub struct SearchEngine {
    config: EngineConfig,
    store: Arc<IndexStore>,
    writer: Mutex<IndexWriter>,
    current: RwLock<Arc<IndexSnapshot>>,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

impl SearchEngine {
    pub fn open(config: EngineConfig) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Open with an explicit source of "now" for the range upper bound.
    pub fn open_with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = match &config.index_dir {
            Some(dir) => IndexStore::open(dir, config.flush_on_commit)?,
            None => IndexStore::temporary()?,
        };
        let meta = store.load_meta()?.unwrap_or_default();
        let segments: Vec<_> = store.load_segments()?.into_iter().map(Arc::new).collect();
        let snapshot = IndexSnapshot::new(segments);
        if snapshot.num_docs != meta.num_docs {
            return Err(EngineError::Storage(format!(
                "metadata records {} documents but segments hold {}",
                meta.num_docs, snapshot.num_docs
            )));
        }
        tracing::info!(
            dir = ?config.index_dir,
            num_docs = snapshot.num_docs,
            segments = snapshot.segments.len(),
            "opened index"
        );
        let store = Arc::new(store);
        Ok(Self {
            writer: Mutex::new(IndexWriter::new(store.clone(), &meta, clock.clone())),
            store,
            current: RwLock::new(Arc::new(snapshot)),
            clock,
            closed: AtomicBool::new(false),
            config,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(EngineError::IndexState("index is closed".into()))
        } else {
            Ok(())
        }
    }

    /// Current committed view. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Result<Arc<IndexSnapshot>> {
        self.ensure_open()?;
        Ok(self.current.read().clone())
    }

    pub fn num_docs(&self) -> u64 {
        self.current.read().num_docs
    }

    /// Stage and commit a batch. On `Ok` every later search sees the whole batch;
    /// on `Err` none of it is visible.
    pub fn index_content(&self, docs: &[Document]) -> Result<usize> {
        self.ensure_open()?;
        let mut writer = self.writer.lock();
        // close() takes the writer lock after marking the engine closed
        self.ensure_open()?;
        let result = writer.add_documents(docs).and_then(|ids| {
            let segment = writer.commit()?;
            Ok((ids.len(), segment))
        });
        match result {
            Ok((count, Some(segment))) => {
                // only the writer replaces `current`, and we hold the writer lock
                let previous = self.current.read().clone();
                let mut segments = previous.segments.clone();
                segments.push(segment);
                if let Err(e) = writer.merge_tail(&mut segments) {
                    tracing::warn!(error = %e, "segment merge failed");
                }
                *self.current.write() = Arc::new(previous.succeed(segments));
                Ok(count)
            }
            Ok((count, None)) => Ok(count),
            Err(e) => {
                writer.rollback();
                tracing::error!(error = %e, batch = docs.len(), "indexing failed");
                Err(e)
            }
        }
    }

    /// Ranked hits for `search_key` created between `lower` and now, both inclusive.
    pub fn search(&self, search_key: &str, lower: PrimitiveDateTime) -> Result<Vec<SearchHit>> {
        self.ensure_open()?;
        let result = query::parse(search_key).and_then(|parsed| {
            let filter = RangeFilter::new(lower, self.clock.now())?;
            let snapshot = self.current.read().clone();
            Searcher::new(&snapshot).search(&parsed, &filter, self.config.max_results)
        });
        match &result {
            Ok(hits) => tracing::debug!(query = search_key, hits = hits.len(), "search"),
            Err(e) => tracing::error!(error = %e, query = search_key, "search failed"),
        }
        result
    }

    /// `search` reduced to the stored fields. No match is an empty `Vec`.
    pub fn search_content(&self, search_key: &str, lower: PrimitiveDateTime) -> Result<Vec<ContentModel>> {
        Ok(self.search(search_key, lower)?.into_iter().map(ContentModel::from).collect())
    }

    /// Flush and refuse further operations. Snapshots already handed out stay readable.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _writer = self.writer.lock();
        self.store.flush()?;
        tracing::info!(dir = ?self.config.index_dir, "closed index");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
