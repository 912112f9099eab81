use super::{CodeUnitSource, SplitResolver};
use crate::buffer::{CR, LF};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineTerminator {
    Crlf,
    Lf,
    None,
}

impl LineTerminator {
    pub fn len(self) -> usize {
        match self {
            LineTerminator::Crlf => 2,
            LineTerminator::Lf => 1,
            LineTerminator::None => 0,
        }
    }

    pub fn is_empty(self) -> bool {
        self == LineTerminator::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineTerminator::Crlf => "\r\n",
            LineTerminator::Lf => "\n",
            LineTerminator::None => "",
        }
    }

    /// Kind of the terminator whose `\n` sits at `lf_offset` on a line starting at `line_start`.
    pub fn classify<S: CodeUnitSource + ?Sized>(
        source: &S,
        line_start: usize,
        lf_offset: usize,
    ) -> LineTerminator {
        if lf_offset > line_start && source.unit_at(lf_offset - 1) == CR {
            LineTerminator::Crlf
        } else {
            LineTerminator::Lf
        }
    }
}

/// True when `offset` sits between the `\r` and `\n` of a pair.
pub fn splits_crlf<S: CodeUnitSource + ?Sized>(source: &S, offset: usize) -> bool {
    offset > 0
        && offset < source.len()
        && source.unit_at(offset - 1) == CR
        && source.unit_at(offset) == LF
}

/// The `\r\n` pair containing the code unit at `offset`, if any.
pub fn crlf_pair_at<S: CodeUnitSource + ?Sized>(source: &S, offset: usize) -> Option<Range<usize>> {
    match source.unit_at(offset) {
        CR if offset + 1 < source.len() && source.unit_at(offset + 1) == LF => {
            Some(offset..offset + 2)
        }
        LF if offset > 0 && source.unit_at(offset - 1) == CR => Some(offset - 1..offset + 1),
        _ => None,
    }
}

/// Keeps `\r\n` pairs whole and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrlfResolver;

impl SplitResolver for CrlfResolver {
    fn split_point<S: CodeUnitSource + ?Sized>(&self, source: &S, offset: usize) -> usize {
        if splits_crlf(source, offset) {
            offset - 1
        } else {
            offset
        }
    }

    fn widen<S: CodeUnitSource + ?Sized>(&self, source: &S, range: Range<usize>) -> Range<usize> {
        if range.is_empty() {
            return range;
        }
        let start = self.split_point(source, range.start);
        let end = if splits_crlf(source, range.end) {
            range.end + 1
        } else {
            range.end
        };
        start..end
    }
}
