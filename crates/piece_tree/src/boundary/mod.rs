mod crlf;
mod grapheme;

pub use crlf::{CrlfResolver, LineTerminator, crlf_pair_at, splits_crlf};
pub use grapheme::{GraphemeResolver, cluster_at};

use std::ops::Range;

/// Random access to a sequence of UTF-16 code units.
pub trait CodeUnitSource {
    fn len(&self) -> usize;

    fn unit_at(&self, offset: usize) -> u16;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_range(&self, range: Range<usize>) -> Vec<u16> {
        range.map(|offset| self.unit_at(offset)).collect()
    }
}

impl CodeUnitSource for [u16] {
    fn len(&self) -> usize {
        <[u16]>::len(self)
    }

    fn unit_at(&self, offset: usize) -> u16 {
        self[offset]
    }

    fn read_range(&self, range: Range<usize>) -> Vec<u16> {
        self[range].to_vec()
    }
}

/// Decides where an edit may cut the text.
pub trait SplitResolver {
    /// Offset at which an insertion requested at `offset` actually happens.
    fn split_point<S: CodeUnitSource + ?Sized>(&self, source: &S, offset: usize) -> usize;

    /// Smallest range covering `range` whose ends are legal cut points.
    fn widen<S: CodeUnitSource + ?Sized>(&self, source: &S, range: Range<usize>) -> Range<usize>;
}
