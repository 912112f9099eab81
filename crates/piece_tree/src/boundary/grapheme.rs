use super::crlf::crlf_pair_at;
use super::{CodeUnitSource, SplitResolver};
use crate::buffer::{CR, LF};
use std::ops::Range;
use unicode_segmentation::{GraphemeCursor, GraphemeIncomplete};

// Code units read on each side of the target before decoding.
const INITIAL_CONTEXT: usize = 16;

// Below U+0300 nothing extends, prepends or joins a cluster.
const FIRST_COMBINING_UNIT: u16 = 0x0300;

/// Range of the extended grapheme cluster covering the code unit at `offset`.
///
/// `\r\n` always forms one cluster. Unpaired surrogates form clusters of their own.
pub fn cluster_at<S: CodeUnitSource + ?Sized>(source: &S, offset: usize) -> Range<usize> {
    let len = source.len();
    assert!(offset < len, "offset {offset} out of range 0..{len}");

    if let Some(pair) = crlf_pair_at(source, offset) {
        return pair;
    }
    if is_isolated(source, offset) {
        return offset..offset + 1;
    }

    let mut context = INITIAL_CONTEXT;
    loop {
        let start = window_start(source, offset.saturating_sub(context));
        let end = window_end(source, (offset + context + 1).min(len));
        let window = DecodedWindow::new(&source.read_range(start..end));
        // Text cut off on either side counts as one virtual byte, so the cursor
        // asks for context instead of treating the window edge as a text edge.
        let chunk_start = usize::from(start > 0);
        let total = chunk_start + window.text.len() + usize::from(end < len);

        if let Ok(cluster) = window.cluster_containing(offset - start, chunk_start, total) {
            let cluster = start + cluster.start..start + cluster.end;
            let open_left = cluster.start == start && start > 0;
            let open_right = cluster.end == end && end < len;
            if !(open_left || open_right) {
                return cluster;
            }
        }
        context *= 2;
    }
}

fn is_isolated<S: CodeUnitSource + ?Sized>(source: &S, offset: usize) -> bool {
    let plain = |unit: u16| unit < FIRST_COMBINING_UNIT;
    let unit = source.unit_at(offset);
    if unit == CR || unit == LF {
        return true;
    }
    plain(unit)
        && (offset == 0 || plain(source.unit_at(offset - 1)))
        && (offset + 1 == source.len() || plain(source.unit_at(offset + 1)))
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..0xDC00).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..0xE000).contains(&unit)
}

// U+1F1E6..=U+1F1FF encode as D83C DDE6..=DDFF.
fn is_regional_indicator_at<S: CodeUnitSource + ?Sized>(source: &S, offset: usize) -> bool {
    offset + 1 < source.len()
        && source.unit_at(offset) == 0xD83C
        && (0xDDE6..=0xDDFF).contains(&source.unit_at(offset + 1))
}

fn window_start<S: CodeUnitSource + ?Sized>(source: &S, mut start: usize) -> usize {
    if start > 0
        && is_low_surrogate(source.unit_at(start))
        && is_high_surrogate(source.unit_at(start - 1))
    {
        start -= 1;
    }
    // Flag pairing depends on the parity of the whole indicator run.
    if is_regional_indicator_at(source, start) {
        while start >= 2 && is_regional_indicator_at(source, start - 2) {
            start -= 2;
        }
    }
    start
}

fn window_end<S: CodeUnitSource + ?Sized>(source: &S, end: usize) -> usize {
    if end < source.len()
        && is_low_surrogate(source.unit_at(end))
        && is_high_surrogate(source.unit_at(end - 1))
    {
        end + 1
    } else {
        end
    }
}

/// UTF-16 window decoded to UTF-8 with offset maps in both directions.
struct DecodedWindow {
    text: String,
    unit_to_byte: Vec<usize>,
    byte_to_unit: Vec<usize>,
}

impl DecodedWindow {
    fn new(units: &[u16]) -> Self {
        let mut text = String::with_capacity(units.len());
        let mut unit_to_byte = Vec::with_capacity(units.len() + 1);
        let mut byte_to_unit = Vec::with_capacity(units.len() * 3 + 1);
        let mut unit = 0;
        for decoded in char::decode_utf16(units.iter().copied()) {
            let (ch, width) = match decoded {
                Ok(ch) => (ch, ch.len_utf16()),
                Err(_) => (char::REPLACEMENT_CHARACTER, 1),
            };
            let byte = text.len();
            unit_to_byte.extend(std::iter::repeat_n(byte, width));
            text.push(ch);
            byte_to_unit.resize(text.len(), unit);
            unit += width;
        }
        unit_to_byte.push(text.len());
        byte_to_unit.push(unit);
        Self {
            text,
            unit_to_byte,
            byte_to_unit,
        }
    }

    /// Cluster around window unit `unit`, with the window placed at byte
    /// `chunk_start` of a text `total` bytes long.
    fn cluster_containing(
        &self,
        unit: usize,
        chunk_start: usize,
        total: usize,
    ) -> Result<Range<usize>, GraphemeIncomplete> {
        let byte = chunk_start + self.unit_to_byte[unit];
        let chunk_end = chunk_start + self.text.len();

        let mut backward = GraphemeCursor::new(byte, total, true);
        let lower = if backward.is_boundary(&self.text, chunk_start)? {
            byte
        } else {
            backward
                .prev_boundary(&self.text, chunk_start)?
                .unwrap_or(chunk_start)
        };

        let mut forward = GraphemeCursor::new(byte, total, true);
        let upper = forward
            .next_boundary(&self.text, chunk_start)?
            .unwrap_or(chunk_end);

        if lower < chunk_start || upper > chunk_end {
            return Err(GraphemeIncomplete::InvalidOffset);
        }
        Ok(self.byte_to_unit[lower - chunk_start]..self.byte_to_unit[upper - chunk_start])
    }
}

/// Keeps extended grapheme clusters whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphemeResolver;

impl SplitResolver for GraphemeResolver {
    fn split_point<S: CodeUnitSource + ?Sized>(&self, source: &S, offset: usize) -> usize {
        if offset < source.len() {
            cluster_at(source, offset).start
        } else {
            offset
        }
    }

    fn widen<S: CodeUnitSource + ?Sized>(&self, source: &S, range: Range<usize>) -> Range<usize> {
        if range.is_empty() {
            return range;
        }
        let start = cluster_at(source, range.start).start;
        let end = cluster_at(source, range.end - 1).end;
        start..end
    }
}
