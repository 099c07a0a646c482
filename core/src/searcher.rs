use crate::error::{EngineError, Result};
use crate::filter::RangeFilter;
use crate::query::Query;
use crate::timestamp;
use crate::{ContentModel, DocId, IndexSnapshot, Posting, Segment};
use std::collections::HashMap;
use time::PrimitiveDateTime;

/// Upper bound on the number of ranked results returned by one search.
pub const DEFAULT_MAX_RESULTS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f32,
    pub content: String,
    pub created_date: PrimitiveDateTime,
}

impl From<SearchHit> for ContentModel {
    fn from(hit: SearchHit) -> Self {
        ContentModel { content: hit.content, created_date: hit.created_date }
    }
}

/// Evaluates queries against a single snapshot.
///
/// Scoring is tf-idf: a term contributes `(1 + ln tf) * ln(1 + N / df)` and a
/// phrase contributes `(1 + ln pf)` times the summed idf of its terms, where
/// `pf` counts the exact in-order occurrences.
pub struct Searcher<'a> {
    snapshot: &'a IndexSnapshot,
}

impl<'a> Searcher<'a> {
    pub fn new(snapshot: &'a IndexSnapshot) -> Self {
        Self { snapshot }
    }

    /// Matching doc ids with scores, highest first, ties by doc id ascending.
    pub fn top_docs(&self, query: &Query, filter: &RangeFilter, limit: usize) -> Vec<(DocId, f32)> {
        if filter.is_empty() || self.snapshot.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(DocId, f32)> = self
            .evaluate(query)
            .into_iter()
            .filter(|(doc_id, _)| self.snapshot.doc(*doc_id).is_some_and(|d| filter.matches(d)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(limit);
        scored
    }

    /// Ranked hits with their stored fields restored.
    pub fn search(&self, query: &Query, filter: &RangeFilter, limit: usize) -> Result<Vec<SearchHit>> {
        self.top_docs(query, filter, limit)
            .into_iter()
            .map(|(doc_id, score)| {
                let doc = self.snapshot.doc(doc_id).ok_or_else(|| {
                    EngineError::Storage(format!("doc {doc_id} is indexed but not stored"))
                })?;
                Ok(SearchHit {
                    doc_id,
                    score,
                    content: doc.content.clone(),
                    created_date: timestamp::decode(&doc.created_date_encoded)?,
                })
            })
            .collect()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.snapshot.num_docs.max(1) as f32;
        let df = self.snapshot.doc_freq(term).max(1) as f32;
        (1.0 + n / df).ln()
    }

    fn evaluate(&self, query: &Query) -> HashMap<DocId, f32> {
        match query {
            Query::MatchAll => self.snapshot.docs().map(|d| (d.id, 1.0)).collect(),
            Query::Term(term) => self.term_scores(term),
            Query::Phrase(terms) => self.phrase_scores(terms),
            Query::Bool { must, should, must_not } => self.bool_scores(must, should, must_not),
        }
    }

    fn term_scores(&self, term: &str) -> HashMap<DocId, f32> {
        let idf = self.idf(term);
        self.snapshot
            .segments
            .iter()
            .flat_map(|s| s.postings(term))
            .map(|p| (p.doc_id, tf_weight(p.term_freq) * idf))
            .collect()
    }

    fn phrase_scores(&self, terms: &[String]) -> HashMap<DocId, f32> {
        let idf: f32 = terms.iter().map(|t| self.idf(t)).sum();
        let mut scores = HashMap::new();
        for segment in &self.snapshot.segments {
            for (doc_id, pf) in phrase_freqs(segment, terms) {
                scores.insert(doc_id, tf_weight(pf) * idf);
            }
        }
        scores
    }

    fn bool_scores(&self, must: &[Query], should: &[Query], must_not: &[Query]) -> HashMap<DocId, f32> {
        let mut acc: HashMap<DocId, f32> = if must.is_empty() {
            if should.is_empty() {
                // only exclusions: start from everything
                self.evaluate(&Query::MatchAll)
            } else {
                let mut union = HashMap::new();
                for clause in should {
                    for (doc_id, s) in self.evaluate(clause) {
                        *union.entry(doc_id).or_insert(0.0) += s;
                    }
                }
                union
            }
        } else {
            let mut clauses = must.iter();
            let mut acc = clauses.next().map(|q| self.evaluate(q)).unwrap_or_default();
            for clause in clauses {
                if acc.is_empty() {
                    break;
                }
                let scores = self.evaluate(clause);
                acc = acc
                    .into_iter()
                    .filter_map(|(doc_id, s)| scores.get(&doc_id).map(|x| (doc_id, s + x)))
                    .collect();
            }
            for clause in should {
                for (doc_id, s) in self.evaluate(clause) {
                    if let Some(v) = acc.get_mut(&doc_id) {
                        *v += s;
                    }
                }
            }
            acc
        };
        for clause in must_not {
            if acc.is_empty() {
                break;
            }
            for doc_id in self.evaluate(clause).into_keys() {
                acc.remove(&doc_id);
            }
        }
        acc
    }
}

fn tf_weight(freq: u32) -> f32 {
    if freq > 0 { 1.0 + (freq as f32).ln() } else { 0.0 }
}

/// Count in-order occurrences of `terms` per document in one segment.
fn phrase_freqs(segment: &Segment, terms: &[String]) -> Vec<(DocId, u32)> {
    let lists: Vec<&[Posting]> = terms.iter().map(|t| segment.postings(t)).collect();
    if lists.iter().any(|l| l.is_empty()) {
        return Vec::new();
    }
    let mut out = Vec::new();
    'docs: for first in lists[0] {
        let mut rest = Vec::with_capacity(lists.len() - 1);
        for list in &lists[1..] {
            match list.binary_search_by_key(&first.doc_id, |p| p.doc_id) {
                Ok(i) => rest.push(&list[i]),
                Err(_) => continue 'docs,
            }
        }
        let pf = first
            .positions
            .iter()
            .filter(|&&start| {
                rest.iter()
                    .enumerate()
                    .all(|(i, p)| p.positions.binary_search(&(start + i as u32 + 1)).is_ok())
            })
            .count() as u32;
        if pf > 0 {
            out.push((first.doc_id, pf));
        }
    }
    out
}
