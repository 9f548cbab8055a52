//! Byte ranges and the translation of recorded offsets into absolute file positions.
//!
//! Producers record the position of every field relative to the start of the structure that
//! owns it, so a field three structures deep has to be shifted by each ancestor in turn. Some
//! producers store offsets that are already absolute instead. Which convention applies is fixed
//! once per tree build through [`OffsetMode`] rather than guessed per field.

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Half-open interval `[start, end)` of byte offsets into the source file.
pub struct ByteRange {
    /// Offset of the first byte covered (inclusive).
    pub start: u64,
    /// Offset one past the last byte covered (exclusive).
    pub end: u64,
}

impl ByteRange {
    /// Creates a range from bounds the caller has already ordered.
    ///
    /// An inverted pair collapses to the empty range at `start`. Bounds read from producer
    /// metadata go through [`ByteRange::checked`] instead.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Creates a range, or `None` if `end` comes before `start`.
    #[must_use]
    pub fn checked(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Zero-width range at `offset`, the shape of a caret with no selection.
    #[must_use]
    pub fn point(offset: u64) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Number of bytes covered.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// True for zero-width ranges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `other` lies entirely inside this range.
    #[must_use]
    pub fn contains_range(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Shifts both bounds forward by `anchor`.
    #[must_use]
    pub fn offset_by(&self, anchor: u64) -> Self {
        Self {
            start: self.start.saturating_add(anchor),
            end: self.end.saturating_add(anchor),
        }
    }

    /// Re-expresses an absolute range relative to `anchor`, inverting [`OffsetMode::Relative`].
    ///
    /// Returns `None` when the range begins before the anchor.
    #[must_use]
    pub fn to_relative(&self, anchor: u64) -> Option<Self> {
        Some(Self {
            start: self.start.checked_sub(anchor)?,
            end: self.end.checked_sub(anchor)?,
        })
    }

    /// Slice of `data` covered by this range, clamped to the buffer.
    #[must_use]
    pub fn slice<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let len = u64::try_from(data.len()).unwrap_or(u64::MAX);
        let start = usize::try_from(self.start.min(len)).unwrap_or(data.len());
        let end = usize::try_from(self.end.min(len)).unwrap_or(data.len());
        &data[start..end]
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// How recorded field and element offsets relate to absolute file positions.
pub enum OffsetMode {
    /// Offsets count from the start of the owning structure or array.
    #[default]
    Relative,
    /// Offsets are already absolute file positions.
    Absolute,
    /// Decide per offset: anything smaller than the anchor's start is taken as relative.
    ///
    /// Only for producers whose convention is unknown. An offset recorded relative to a
    /// structure that itself starts at 0 is indistinguishable from an absolute one.
    Inferred,
}

impl OffsetMode {
    /// Converts a recorded `(start, end)` pair into an absolute range anchored at `anchor`, the
    /// absolute span of the owning structure or array.
    ///
    /// Relative offsets cannot be placed without an anchor, so they yield `None` under a
    /// spanless owner. Absolute offsets never need one, and the inferred rule keeps unanchored
    /// offsets as they were recorded. An inverted pair is malformed and yields `None`.
    #[must_use]
    pub fn translate(self, anchor: Option<ByteRange>, start: u64, end: u64) -> Option<ByteRange> {
        let recorded = ByteRange::checked(start, end)?;
        let shift = match (self, anchor) {
            (Self::Relative, None) => return None,
            (Self::Relative, Some(anchor)) => anchor.start,
            (Self::Inferred, Some(anchor)) if recorded.start < anchor.start => anchor.start,
            (Self::Absolute | Self::Inferred, _) => 0,
        };
        Some(recorded.offset_by(shift))
    }
}

impl FromStr for OffsetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relative" => Ok(Self::Relative),
            "absolute" => Ok(Self::Absolute),
            "inferred" => Ok(Self::Inferred),
            other => Err(format!(
                "unknown offset mode `{other}` (expected relative, absolute or inferred)"
            )),
        }
    }
}

impl fmt::Display for OffsetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Relative => "relative",
            Self::Absolute => "absolute",
            Self::Inferred => "inferred",
        })
    }
}

#[cfg(test)]
#[path = "tests/span.rs"]
mod tests;
