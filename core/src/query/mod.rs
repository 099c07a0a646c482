//! Query model over the content field and the parser that produces it.

mod lexer;
mod parser;

pub use parser::parse;

/// Parsed query tree. Terms are already normalized by the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Every document; produced by a blank query string.
    MatchAll,
    Term(String),
    /// Consecutive terms, in order.
    Phrase(Vec<String>),
    Bool {
        must: Vec<Query>,
        should: Vec<Query>,
        must_not: Vec<Query>,
    },
}

impl Query {
    pub fn term(t: impl Into<String>) -> Self {
        Query::Term(t.into())
    }

    pub fn phrase<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::Phrase(terms.into_iter().map(Into::into).collect())
    }

    pub fn and(must: Vec<Query>) -> Self {
        Query::Bool { must, should: vec![], must_not: vec![] }
    }

    pub fn or(should: Vec<Query>) -> Self {
        Query::Bool { must: vec![], should, must_not: vec![] }
    }

    pub fn not(must_not: Vec<Query>) -> Self {
        Query::Bool { must: vec![], should: vec![], must_not }
    }
}
