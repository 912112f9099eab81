use std::ops::Range;
use thiserror::Error;

/// Out-of-bounds argument passed to a [`TextStorage`](crate::TextStorage) call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("code unit index {index} is out of bounds for length {len}")]
    CodeUnitIndexOutOfRange { index: usize, len: usize },

    #[error("code unit range {range:?} is out of bounds for length {len}")]
    CodeUnitRangeOutOfRange { range: Range<usize>, len: usize },

    #[error("line {line} is out of bounds for {line_count} lines")]
    LineIndexOutOfRange { line: usize, line_count: usize },
}
