use tracing::trace;

pub const LF: u16 = 0x000A;
pub const CR: u16 = 0x000D;

pub type BufferIndex = usize;

/// Position inside a buffer as (line start index, column from that line start).
///
/// Cursors handed out by the pool are normalized: `line` is the last line start
/// at or before the position, so the line feeds between two cursors of the same
/// buffer are `end.line - start.line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferCursor {
    pub line: usize,
    pub column: usize,
}

impl BufferCursor {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Original,
    Add,
}

/// A contiguous run of code units inside one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub buffer_idx: BufferIndex,
    pub start: BufferCursor,
    pub end: BufferCursor,
    pub length: usize,
    pub line_feed_cnt: usize,
}

impl Piece {
    pub fn new(
        buffer_idx: BufferIndex,
        start: BufferCursor,
        end: BufferCursor,
        length: usize,
        line_feed_cnt: usize,
    ) -> Self {
        Self {
            buffer_idx,
            start,
            end,
            length,
            line_feed_cnt,
        }
    }

    /// True when `next` starts exactly where this piece ends in the same buffer.
    pub fn is_extended_by(&self, next: &Piece) -> bool {
        self.buffer_idx == next.buffer_idx && self.end == next.start
    }

    pub fn extended_by(&self, next: &Piece) -> Piece {
        debug_assert!(self.is_extended_by(next));
        Piece::new(
            self.buffer_idx,
            self.start,
            next.end,
            self.length + next.length,
            self.line_feed_cnt + next.line_feed_cnt,
        )
    }
}

#[derive(Debug, Clone)]
pub struct StringBuffer {
    kind: BufferKind,
    buffer: Vec<u16>,
    line_starts: Vec<usize>,
}

impl StringBuffer {
    pub fn new(kind: BufferKind, buffer: Vec<u16>) -> Self {
        let line_starts = Self::create_line_starts(&buffer);
        Self {
            kind,
            buffer,
            line_starts,
        }
    }

    /// Offsets just past every `\n`, led by 0. A lone `\r` does not start a line.
    pub fn create_line_starts(text: &[u16]) -> Vec<usize> {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.iter()
                .enumerate()
                .filter(|&(_, &unit)| unit == LF)
                .map(|(i, _)| i + 1),
        );
        line_starts
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.buffer
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    pub fn offset_of(&self, cursor: BufferCursor) -> usize {
        self.line_starts[cursor.line] + cursor.column
    }

    pub fn end_cursor(&self) -> BufferCursor {
        let line = self.line_starts.len() - 1;
        BufferCursor::new(line, self.buffer.len() - self.line_starts[line])
    }

    fn append(&mut self, text: &[u16]) -> (BufferCursor, BufferCursor) {
        let start = self.end_cursor();
        let base = self.buffer.len();
        self.buffer.extend_from_slice(text);
        for (i, &unit) in text.iter().enumerate() {
            if unit == LF {
                self.line_starts.push(base + i + 1);
            }
        }
        (start, self.end_cursor())
    }
}

/// Append-only storage behind every piece.
///
/// Original buffers come first, one per construction chunk. Inserted text goes
/// to the current add buffer, which is replaced by a fresh one once it would
/// grow past the configured capacity.
#[derive(Debug, Clone)]
pub struct BufferPool {
    buffers: Vec<StringBuffer>,
    current_add: Option<BufferIndex>,
    add_buffer_capacity: usize,
}

impl BufferPool {
    pub fn new(originals: Vec<Vec<u16>>, add_buffer_capacity: usize) -> Self {
        let buffers = originals
            .into_iter()
            .map(|chunk| StringBuffer::new(BufferKind::Original, chunk))
            .collect();
        Self {
            buffers,
            current_add: None,
            add_buffer_capacity,
        }
    }

    pub fn buffer(&self, idx: BufferIndex) -> &StringBuffer {
        &self.buffers[idx]
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// One piece per non-empty original buffer, in document order.
    pub fn original_pieces(&self) -> Vec<Piece> {
        self.buffers
            .iter()
            .enumerate()
            .filter(|(_, buffer)| buffer.kind() == BufferKind::Original && !buffer.is_empty())
            .map(|(idx, buffer)| {
                let end = buffer.end_cursor();
                Piece::new(idx, BufferCursor::default(), end, buffer.len(), end.line)
            })
            .collect()
    }

    pub fn append_to_current_add_buffer(&mut self, text: &[u16]) -> (BufferIndex, BufferCursor) {
        let (idx, start, _) = self.append(text);
        (idx, start)
    }

    pub fn slice_code_units(
        &self,
        idx: BufferIndex,
        start: BufferCursor,
        end: BufferCursor,
    ) -> &[u16] {
        let buffer = &self.buffers[idx];
        &buffer.as_slice()[buffer.offset_of(start)..buffer.offset_of(end)]
    }

    pub fn line_start_offsets(&self, idx: BufferIndex) -> &[usize] {
        self.buffers[idx].line_starts()
    }

    pub fn piece_slice(&self, piece: &Piece) -> &[u16] {
        self.slice_code_units(piece.buffer_idx, piece.start, piece.end)
    }

    /// Stores `text` and returns the piece covering it.
    pub fn build_piece(&mut self, text: &[u16]) -> Piece {
        let (idx, start, end) = self.append(text);
        Piece::new(idx, start, end, text.len(), end.line - start.line)
    }

    /// Cursor of the code unit `remainder` units into `piece`.
    pub fn position_in_piece(&self, piece: &Piece, remainder: usize) -> BufferCursor {
        debug_assert!(remainder <= piece.length);
        let buffer = &self.buffers[piece.buffer_idx];
        let offset = buffer.offset_of(piece.start) + remainder;
        let starts = &buffer.line_starts()[piece.start.line..=piece.end.line];
        let idx = starts.partition_point(|&start| start <= offset) - 1;
        BufferCursor::new(piece.start.line + idx, offset - starts[idx])
    }

    /// Keeps the part of `piece` before `pos`.
    pub fn trim_piece_right(&self, piece: &Piece, pos: BufferCursor) -> Piece {
        let buffer = &self.buffers[piece.buffer_idx];
        let length = buffer.offset_of(pos) - buffer.offset_of(piece.start);
        Piece::new(
            piece.buffer_idx,
            piece.start,
            pos,
            length,
            pos.line - piece.start.line,
        )
    }

    /// Keeps the part of `piece` from `pos` on.
    pub fn trim_piece_left(&self, piece: &Piece, pos: BufferCursor) -> Piece {
        let buffer = &self.buffers[piece.buffer_idx];
        let length = buffer.offset_of(piece.end) - buffer.offset_of(pos);
        Piece::new(
            piece.buffer_idx,
            pos,
            piece.end,
            length,
            piece.end.line - pos.line,
        )
    }

    fn append(&mut self, text: &[u16]) -> (BufferIndex, BufferCursor, BufferCursor) {
        let idx = match self.current_add {
            Some(idx)
                if self.buffers[idx].is_empty()
                    || self.buffers[idx].len() + text.len() <= self.add_buffer_capacity =>
            {
                idx
            }
            _ => {
                self.buffers
                    .push(StringBuffer::new(BufferKind::Add, Vec::new()));
                let idx = self.buffers.len() - 1;
                trace!(buffer = idx, "opened add buffer");
                self.current_add = Some(idx);
                idx
            }
        };
        let (start, end) = self.buffers[idx].append(text);
        (idx, start, end)
    }
}
