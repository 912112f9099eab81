use piece_tree::{LineContent, LineTerminator};
use std::fmt;
use std::ops::Range;

/// One line of a [`TextStorage`](crate::TextStorage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub index: usize,
    /// Code unit range of `text`, terminator excluded.
    pub range: Range<usize>,
    pub terminator: LineTerminator,
    pub text: String,
}

impl Line {
    pub(crate) fn from_content(index: usize, content: LineContent) -> Self {
        Self {
            index,
            text: String::from_utf16_lossy(&content.text),
            range: content.range,
            terminator: content.terminator,
        }
    }

    pub fn range_with_terminator(&self) -> Range<usize> {
        self.range.start..self.range.end + self.terminator.len()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.terminator {
            LineTerminator::Crlf => "CRLF",
            LineTerminator::Lf => "LF",
            LineTerminator::None => "NO",
        };
        write!(
            f,
            "line {} [{}..{}) {}: {:?}",
            self.index, self.range.start, self.range.end, kind, self.text
        )
    }
}
