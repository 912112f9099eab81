//! Persistent piece tree over UTF-16 text.
//!
//! Text lives in append-only buffers; the document is an ordered sequence of
//! pieces referencing them, kept in a path-copying red-black tree whose nodes
//! cache the length and line feed count of their left subtree. Old roots stay
//! valid after edits, which makes undo and snapshots free.

mod boundary;
mod buffer;
mod config;
mod history;
mod node;
mod view;

pub use boundary::{
    CodeUnitSource, CrlfResolver, GraphemeResolver, LineTerminator, SplitResolver, cluster_at,
    crlf_pair_at, splits_crlf,
};
pub use buffer::{BufferCursor, BufferIndex, BufferKind, BufferPool, CR, LF, Piece, StringBuffer};
pub use config::{DEFAULT_ADD_BUFFER_CAPACITY, PieceTreeConfig};
pub use node::{NodeColor, NodeData, RedBlackTree, TreeNode};
pub use view::{LineContent, NodePosition, TreeView, TreeWalker};

use history::History;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

static NEXT_TREE_ID: AtomicUsize = AtomicUsize::new(0);

/// A retained document state of one [`PieceTree`].
#[derive(Debug, Clone)]
pub struct Snapshot {
    owner: usize,
    root: RedBlackTree,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.root.length()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.root.line_feed_count() + 1
    }
}

#[derive(Debug)]
pub struct PieceTree {
    id: usize,
    buffers: BufferPool,
    root: RedBlackTree,
    history: History<RedBlackTree>,
    config: PieceTreeConfig,
}

// A copy gets its own id: both trees append to their add buffers independently,
// so a snapshot of one means nothing to the other.
impl Clone for PieceTree {
    fn clone(&self) -> Self {
        Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            buffers: self.buffers.clone(),
            root: self.root.clone(),
            history: self.history.clone(),
            config: self.config.clone(),
        }
    }
}

impl Default for PieceTree {
    fn default() -> Self {
        Self::from_chunks(Vec::new(), PieceTreeConfig::default())
    }
}

impl PieceTree {
    pub fn new(text: &[u16]) -> Self {
        Self::with_config(text, PieceTreeConfig::default())
    }

    pub fn with_config(text: &[u16], config: PieceTreeConfig) -> Self {
        Self::from_chunks(vec![text.to_vec()], config)
    }

    /// Every chunk becomes an original buffer; the document is their concatenation.
    pub fn from_chunks(chunks: Vec<Vec<u16>>, config: PieceTreeConfig) -> Self {
        let buffers = BufferPool::new(chunks, config.add_buffer_capacity);
        let mut tree = Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            history: History::new(config.history_limit),
            buffers,
            root: RedBlackTree::new(),
            config,
        };

        let mut boundaries = Vec::new();
        for piece in tree.buffers.original_pieces() {
            let at = tree.root.length();
            tree.root = tree.root.insert(piece, at);
            boundaries.push(tree.root.length());
        }
        boundaries.pop();
        for boundary in boundaries {
            tree.heal_crlf_at(boundary);
        }
        debug!(
            length = tree.len(),
            lines = tree.line_count(),
            "piece tree built"
        );
        tree
    }

    pub fn config(&self) -> &PieceTreeConfig {
        &self.config
    }

    pub fn view(&self) -> TreeView<'_> {
        TreeView::new(&self.buffers, &self.root)
    }

    /// Read-only view of a state captured earlier from this tree.
    pub fn view_at<'a>(&'a self, snapshot: &'a Snapshot) -> TreeView<'a> {
        assert_eq!(snapshot.owner, self.id, "snapshot belongs to another tree");
        TreeView::new(&self.buffers, &snapshot.root)
    }

    pub fn len(&self) -> usize {
        self.root.length()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.root.line_feed_count() + 1
    }

    /// Inserts `text` at `offset`, moving the point off the middle of a `\r\n`
    /// pair first. Returns the offset the text was actually inserted at.
    pub fn insert(&mut self, offset: usize, text: &[u16]) -> usize {
        self.insert_with(&CrlfResolver, offset, text)
    }

    pub fn insert_with<R: SplitResolver>(
        &mut self,
        resolver: &R,
        offset: usize,
        text: &[u16],
    ) -> usize {
        assert!(
            offset <= self.len(),
            "insert offset {offset} out of range 0..={}",
            self.len()
        );
        let offset = resolver.split_point(&self.view(), offset);
        if text.is_empty() {
            return offset;
        }
        trace!(offset, len = text.len(), "insert");
        self.insert_piece(offset, text);
        self.heal_crlf_at(offset);
        self.heal_crlf_at(offset + text.len());
        offset
    }

    /// Removes `length` code units at `offset`, widened so that no grapheme
    /// cluster or `\r\n` pair is cut. Returns the range actually removed.
    pub fn remove(&mut self, offset: usize, length: usize) -> Range<usize> {
        self.remove_with(&GraphemeResolver, offset, length)
    }

    pub fn remove_with<R: SplitResolver>(
        &mut self,
        resolver: &R,
        offset: usize,
        length: usize,
    ) -> Range<usize> {
        if length == 0 {
            return offset..offset;
        }
        let end = offset + length;
        assert!(
            end <= self.len(),
            "remove range {offset}..{end} out of range 0..{}",
            self.len()
        );
        let range = resolver.widen(&self.view(), offset..end);
        trace!(start = range.start, end = range.end, "remove");
        self.remove_range(range.start, range.len());
        self.heal_crlf_at(range.start);
        range
    }

    pub fn code_unit_at(&self, offset: usize) -> u16 {
        self.view().code_unit_at(offset)
    }

    /// Grapheme cluster covering `offset` and its range.
    pub fn composed_sequence_at(&self, offset: usize) -> (Vec<u16>, Range<usize>) {
        self.view().composed_sequence_at(offset)
    }

    /// 1-based line holding `offset`.
    pub fn line_index_at(&self, offset: usize) -> usize {
        self.view().line_at(offset)
    }

    pub fn line_content(&self, line: usize) -> LineContent {
        self.view().line_content(line)
    }

    pub fn line_start(&self, line: usize) -> usize {
        self.view().line_start(line)
    }

    pub fn line_range_with_newline(&self, line: usize) -> Range<usize> {
        self.view().line_range_with_newline(line)
    }

    pub fn piece_at(&self, offset: usize) -> Option<NodePosition> {
        self.view().node_at(offset)
    }

    pub fn piece_at_line(&self, line: usize) -> Option<NodePosition> {
        self.view().node_at_line(line)
    }

    pub fn enumerate_composed_sequences<F>(&self, range: Range<usize>, visit: F)
    where
        F: FnMut(&[u16], Range<usize>) -> bool,
    {
        self.view().enumerate_composed_sequences(range, visit);
    }

    pub fn walker(&self, offset: usize) -> TreeWalker<'_> {
        self.view().walker(offset)
    }

    pub fn read_range(&self, range: Range<usize>) -> Vec<u16> {
        self.view().read_range(range)
    }

    pub fn text(&self) -> Vec<u16> {
        self.view().text()
    }

    pub fn commit(&mut self) {
        debug!(length = self.len(), "commit");
        self.history.commit(self.root.clone());
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.root.clone()) {
            Some(root) => {
                self.root = root;
                debug!(length = self.len(), "undo");
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.root.clone()) {
            Some(root) => {
                self.root = root;
                debug!(length = self.len(), "redo");
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            owner: self.id,
            root: self.root.clone(),
        }
    }

    /// Makes a captured state current again. The undo history is untouched.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        assert_eq!(snapshot.owner, self.id, "snapshot belongs to another tree");
        self.root = snapshot.root.clone();
    }

    /// Validates tree shape, cached aggregates and piece boundaries.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.root.check()?;
        let mut offset = 0;
        let mut previous_last = None;
        for piece in self.root.pieces() {
            if piece.length == 0 {
                return Err(format!("empty piece at {offset}"));
            }
            let units = self.buffers.piece_slice(&piece);
            if units.len() != piece.length {
                return Err(format!("piece at {offset} has stale length"));
            }
            let line_feeds = units.iter().filter(|&&unit| unit == LF).count();
            if line_feeds != piece.line_feed_cnt {
                return Err(format!("piece at {offset} has stale line feed count"));
            }
            if previous_last == Some(CR) && units[0] == LF {
                return Err(format!("\\r\\n pair split at {offset}"));
            }
            previous_last = units.last().copied();
            offset += piece.length;
        }
        Ok(())
    }

    fn insert_piece(&mut self, offset: usize, text: &[u16]) {
        let new_piece = self.buffers.build_piece(text);
        let Some(position) = self.view().node_at(offset) else {
            self.root = self.root.insert(new_piece, 0);
            return;
        };

        if position.remainder == 0 {
            if offset > 0 && self.try_extend(offset - 1, &new_piece) {
                return;
            }
            self.root = self.root.insert(new_piece, offset);
            return;
        }

        if position.remainder == position.piece.length {
            if self.try_extend(offset - 1, &new_piece) {
                return;
            }
            self.root = self.root.insert(new_piece, offset);
            return;
        }

        let split = self
            .buffers
            .position_in_piece(&position.piece, position.remainder);
        let left = self.buffers.trim_piece_right(&position.piece, split);
        let right = self.buffers.trim_piece_left(&position.piece, split);
        self.root = self
            .root
            .update(position.start_offset, left)
            .insert(new_piece, offset)
            .insert(right, offset + new_piece.length);
    }

    // Grows the piece holding `last_offset` when `next` continues it in its buffer.
    fn try_extend(&mut self, last_offset: usize, next: &Piece) -> bool {
        if !self.config.coalesce_inserts {
            return false;
        }
        let Some(previous) = self.view().node_at(last_offset) else {
            return false;
        };
        if !previous.piece.is_extended_by(next) {
            return false;
        }
        self.root = self
            .root
            .update(previous.start_offset, previous.piece.extended_by(next));
        true
    }

    fn remove_range(&mut self, offset: usize, count: usize) {
        let Some(first) = self.view().node_at(offset) else {
            return;
        };
        let head = (first.remainder > 0).then(|| {
            let pos = self.buffers.position_in_piece(&first.piece, first.remainder);
            self.buffers.trim_piece_right(&first.piece, pos)
        });

        let span = offset + count - first.start_offset;
        let mut removed = 0;
        let mut last = first.piece;
        while removed < span {
            let Some(position) = self.view().node_at(first.start_offset) else {
                break;
            };
            debug_assert_eq!(position.remainder, 0);
            removed += position.piece.length;
            last = position.piece;
            self.root = self.root.remove(first.start_offset);
        }

        if removed > span {
            let keep = removed - span;
            let pos = self.buffers.position_in_piece(&last, last.length - keep);
            let tail = self.buffers.trim_piece_left(&last, pos);
            self.root = self.root.insert(tail, first.start_offset);
        }
        if let Some(head) = head {
            self.root = self.root.insert(head, first.start_offset);
        }
    }

    // Re-joins a `\r` ending one piece with the `\n` starting the next.
    fn heal_crlf_at(&mut self, offset: usize) {
        let view = self.view();
        if !splits_crlf(&view, offset) {
            return;
        }
        let (Some(left), Some(right)) = (view.node_at(offset - 1), view.node_at(offset)) else {
            return;
        };
        if right.remainder != 0 {
            return;
        }
        trace!(offset, "re-joining \\r\\n across pieces");

        let left_end = self
            .buffers
            .position_in_piece(&left.piece, left.piece.length - 1);
        let left_keep = self.buffers.trim_piece_right(&left.piece, left_end);
        let right_start = self.buffers.position_in_piece(&right.piece, 1);
        let right_keep = self.buffers.trim_piece_left(&right.piece, right_start);
        let pair = self.buffers.build_piece(&[CR, LF]);

        let mut root = self
            .root
            .remove(right.start_offset)
            .remove(left.start_offset);
        if right_keep.length > 0 {
            root = root.insert(right_keep, left.start_offset);
        }
        root = root.insert(pair, left.start_offset);
        if left_keep.length > 0 {
            root = root.insert(left_keep, left.start_offset);
        }
        self.root = root;
    }
}
