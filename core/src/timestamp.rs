//! Timestamp handling: the sortable on-disk encoding, parsing of caller-supplied
//! dates, and the clock that provides the upper bound of every range query.
//!
//! Timestamps are naive (`PrimitiveDateTime`) with second precision. Inputs that
//! carry an offset are converted to UTC first, and `SystemClock` reads UTC.

use crate::error::{EngineError, Result};
use parking_lot::Mutex;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Width of an encoded timestamp, `YYYYMMDDHHMMSS`.
pub const ENCODED_LEN: usize = 14;

/// Encode to `YYYYMMDDHHMMSS`. Byte order of the output equals chronological order.
///
/// Subsecond precision is dropped. Years outside 0000..=9999 cannot be represented
/// in four digits and are rejected.
pub fn encode(ts: PrimitiveDateTime) -> Result<String> {
    if !(0..=9999).contains(&ts.year()) {
        return Err(EngineError::Encoding(format!(
            "year {} is outside 0000..=9999",
            ts.year()
        )));
    }
    ts.format(format_description!("[year][month][day][hour][minute][second]"))
        .map_err(|e| EngineError::Encoding(e.to_string()))
}

/// Inverse of [`encode`].
pub fn decode(encoded: &str) -> Result<PrimitiveDateTime> {
    if encoded.len() != ENCODED_LEN || !encoded.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EngineError::Encoding(format!(
            "expected {ENCODED_LEN} digits, got {encoded:?}"
        )));
    }
    PrimitiveDateTime::parse(
        encoded,
        format_description!("[year][month][day][hour][minute][second]"),
    )
    .map_err(|e| EngineError::Encoding(format!("{encoded:?}: {e}")))
}

/// Parse a date supplied at the service boundary.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS` (optionally with fractional seconds), RFC 3339
/// with an offset, or a bare `YYYY-MM-DD` meaning midnight.
pub fn parse_input(input: &str) -> Result<PrimitiveDateTime> {
    let s = input.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        let utc = dt.to_offset(UtcOffset::UTC);
        return Ok(PrimitiveDateTime::new(utc.date(), utc.time()));
    }
    if let Ok(dt) = PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(dt);
    }
    if let Ok(dt) = PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    ) {
        return Ok(dt);
    }
    if let Ok(d) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        return Ok(d.midnight());
    }
    Err(EngineError::Validation(format!("unrecognised date {input:?}")))
}

/// Render a timestamp the way the service returns it, `YYYY-MM-DDTHH:MM:SS`.
pub fn format_output(ts: PrimitiveDateTime) -> Result<String> {
    ts.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second]"
    ))
    .map_err(|e| EngineError::Encoding(e.to_string()))
}

/// Source of "now" for range queries.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

/// Wall clock in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc();
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// Manually driven clock for reproducible range queries.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<PrimitiveDateTime>,
}

impl FixedClock {
    pub fn new(now: PrimitiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: PrimitiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        *self.now.lock()
    }
}
