use crate::error::Result;
use crate::timestamp;
use crate::StoredDocument;
use time::PrimitiveDateTime;

/// Inclusive range over the encoded creation date.
///
/// Both bounds are compared as encoded strings, which order the same way as
/// the timestamps they encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeFilter {
    lower: String,
    upper: String,
}

impl RangeFilter {
    pub fn new(lower: PrimitiveDateTime, upper: PrimitiveDateTime) -> Result<Self> {
        Ok(Self { lower: timestamp::encode(lower)?, upper: timestamp::encode(upper)? })
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn upper(&self) -> &str {
        &self.upper
    }

    /// An inverted range admits nothing.
    pub fn is_empty(&self) -> bool {
        self.lower > self.upper
    }

    pub fn matches_encoded(&self, encoded: &str) -> bool {
        self.lower.as_str() <= encoded && encoded <= self.upper.as_str()
    }

    pub fn matches(&self, doc: &StoredDocument) -> bool {
        self.matches_encoded(&doc.created_date_encoded)
    }
}
