use crate::boundary::{CodeUnitSource, LineTerminator, cluster_at};
use crate::buffer::{BufferPool, Piece};
use crate::node::RedBlackTree;
use std::ops::Range;

/// Where an offset lands in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePosition {
    pub piece: Piece,
    /// Offset of the target inside `piece`.
    pub remainder: usize,
    /// Document offset of the first code unit of `piece`.
    pub start_offset: usize,
    /// 1-based line of the target.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineContent {
    /// Line text without its terminator.
    pub text: Vec<u16>,
    pub terminator: LineTerminator,
    /// Document range of `text`.
    pub range: Range<usize>,
}

/// Read-only access to one tree root.
#[derive(Debug, Clone, Copy)]
pub struct TreeView<'a> {
    buffers: &'a BufferPool,
    root: &'a RedBlackTree,
}

impl<'a> TreeView<'a> {
    pub(crate) fn new(buffers: &'a BufferPool, root: &'a RedBlackTree) -> Self {
        Self { buffers, root }
    }

    pub fn len(&self) -> usize {
        self.root.length()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn line_feed_count(&self) -> usize {
        self.root.line_feed_count()
    }

    pub fn line_count(&self) -> usize {
        self.root.line_feed_count() + 1
    }

    /// An offset equal to the length resolves to the end of the last piece.
    /// `None` only for an empty document.
    pub fn node_at(&self, offset: usize) -> Option<NodePosition> {
        let mut tree = self.root;
        let mut offset = offset;
        let mut start_offset = 0;
        let mut line_feeds = 0;
        while let Some(node) = tree.root() {
            let data = node.data();
            let piece = data.piece;
            if data.left_subtree_length > offset {
                tree = node.left();
            } else if data.left_subtree_length + piece.length > offset {
                let remainder = offset - data.left_subtree_length;
                let pos = self.buffers.position_in_piece(&piece, remainder);
                return Some(NodePosition {
                    piece,
                    remainder,
                    start_offset: start_offset + data.left_subtree_length,
                    line: line_feeds + data.left_subtree_lf_count + (pos.line - piece.start.line) + 1,
                });
            } else if node.right().is_empty() {
                return Some(NodePosition {
                    piece,
                    remainder: piece.length,
                    start_offset: start_offset + data.left_subtree_length,
                    line: line_feeds + data.left_subtree_lf_count + piece.line_feed_cnt + 1,
                });
            } else {
                let skipped = data.left_subtree_length + piece.length;
                offset -= skipped;
                start_offset += skipped;
                line_feeds += data.left_subtree_lf_count + piece.line_feed_cnt;
                tree = node.right();
            }
        }
        None
    }

    /// Piece holding the first code unit of 1-based `line`.
    pub fn node_at_line(&self, line: usize) -> Option<NodePosition> {
        self.node_at(self.line_start(line))
    }

    /// Document offset where 1-based `line` begins.
    pub fn line_start(&self, line: usize) -> usize {
        assert!(
            line >= 1 && line <= self.line_count(),
            "line {line} out of range 1..={}",
            self.line_count()
        );
        let mut target = line - 1;
        let mut offset = 0;
        let mut tree = self.root;
        while target > 0 {
            let Some(node) = tree.root() else { break };
            let data = node.data();
            let piece = data.piece;
            if data.left_subtree_lf_count >= target {
                tree = node.left();
            } else if data.left_subtree_lf_count + piece.line_feed_cnt >= target {
                let nth = target - data.left_subtree_lf_count;
                let buffer = self.buffers.buffer(piece.buffer_idx);
                let piece_start = buffer.offset_of(piece.start);
                let line_start = buffer.line_starts()[piece.start.line + nth];
                return offset + data.left_subtree_length + (line_start - piece_start);
            } else {
                target -= data.left_subtree_lf_count + piece.line_feed_cnt;
                offset += data.left_subtree_length + piece.length;
                tree = node.right();
            }
        }
        offset
    }

    /// Range of 1-based `line` without its terminator, and the terminator kind.
    pub fn line_range(&self, line: usize) -> (Range<usize>, LineTerminator) {
        let start = self.line_start(line);
        if line == self.line_count() {
            return (start..self.len(), LineTerminator::None);
        }
        let lf_offset = self.line_start(line + 1) - 1;
        let terminator = LineTerminator::classify(self, start, lf_offset);
        (start..lf_offset + 1 - terminator.len(), terminator)
    }

    /// Range of 1-based `line` including its terminator.
    pub fn line_range_with_newline(&self, line: usize) -> Range<usize> {
        let start = self.line_start(line);
        if line == self.line_count() {
            start..self.len()
        } else {
            start..self.line_start(line + 1)
        }
    }

    pub fn line_content(&self, line: usize) -> LineContent {
        let (range, terminator) = self.line_range(line);
        LineContent {
            text: self.read_range(range.clone()),
            terminator,
            range,
        }
    }

    /// 1-based line holding `offset`; the length maps to the last line.
    pub fn line_at(&self, offset: usize) -> usize {
        assert!(offset <= self.len(), "offset {offset} out of range 0..={}", self.len());
        self.node_at(offset).map_or(1, |position| position.line)
    }

    pub fn code_unit_at(&self, offset: usize) -> u16 {
        assert!(offset < self.len(), "offset {offset} out of range 0..{}", self.len());
        let position = self
            .node_at(offset)
            .expect("non-empty document has a node for every offset");
        self.buffers.piece_slice(&position.piece)[position.remainder]
    }

    pub fn composed_sequence_at(&self, offset: usize) -> (Vec<u16>, Range<usize>) {
        let range = cluster_at(self, offset);
        (self.read_range(range.clone()), range)
    }

    /// Visits every grapheme cluster that intersects `range`, in order, until
    /// `visit` returns `false`. The first and last clusters may reach outside `range`.
    pub fn enumerate_composed_sequences<F>(&self, range: Range<usize>, mut visit: F)
    where
        F: FnMut(&[u16], Range<usize>) -> bool,
    {
        assert!(
            range.start <= range.end && range.end <= self.len(),
            "range {range:?} out of range 0..{}",
            self.len()
        );
        let mut offset = range.start;
        while offset < range.end {
            let cluster = cluster_at(self, offset);
            let units: Vec<u16> = self.walker(cluster.start).take(cluster.len()).collect();
            if !visit(&units, cluster.clone()) {
                return;
            }
            offset = cluster.end;
        }
    }

    pub fn walker(&self, offset: usize) -> TreeWalker<'a> {
        TreeWalker::new(self.buffers, self.root, offset)
    }

    pub fn read_range(&self, range: Range<usize>) -> Vec<u16> {
        assert!(
            range.start <= range.end && range.end <= self.len(),
            "range {range:?} out of range 0..{}",
            self.len()
        );
        let mut out = Vec::with_capacity(range.len());
        out.extend(self.walker(range.start).take(range.len()));
        out
    }

    pub fn text(&self) -> Vec<u16> {
        self.read_range(0..self.len())
    }

    pub fn pieces(&self) -> Vec<Piece> {
        self.root.pieces()
    }
}

impl CodeUnitSource for TreeView<'_> {
    fn len(&self) -> usize {
        TreeView::len(self)
    }

    fn unit_at(&self, offset: usize) -> u16 {
        self.code_unit_at(offset)
    }

    fn read_range(&self, range: Range<usize>) -> Vec<u16> {
        TreeView::read_range(self, range)
    }
}

/// In-order code unit iterator starting at an arbitrary offset.
#[derive(Debug, Clone)]
pub struct TreeWalker<'a> {
    buffers: &'a BufferPool,
    // Nodes whose piece comes next, their left subtrees already consumed.
    stack: Vec<RedBlackTree>,
    current: std::slice::Iter<'a, u16>,
    offset: usize,
}

impl<'a> TreeWalker<'a> {
    fn new(buffers: &'a BufferPool, root: &RedBlackTree, offset: usize) -> Self {
        let mut walker = Self {
            buffers,
            stack: Vec::new(),
            current: [].iter(),
            offset,
        };
        walker.fast_forward(root.clone(), offset);
        walker
    }

    /// Document offset of the next code unit.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn exhausted(&self) -> bool {
        self.current.len() == 0 && self.stack.is_empty()
    }

    fn fast_forward(&mut self, mut tree: RedBlackTree, mut offset: usize) {
        loop {
            let Some(node) = tree.root() else { return };
            let data = *node.data();
            if data.left_subtree_length > offset {
                let left = node.left().clone();
                self.stack.push(tree);
                tree = left;
            } else if data.left_subtree_length + data.piece.length > offset {
                let remainder = offset - data.left_subtree_length;
                self.current = self.buffers.piece_slice(&data.piece)[remainder..].iter();
                let right = node.right().clone();
                self.push_left_spine(right);
                return;
            } else {
                offset -= data.left_subtree_length + data.piece.length;
                let right = node.right().clone();
                tree = right;
            }
        }
    }

    fn push_left_spine(&mut self, mut tree: RedBlackTree) {
        while let Some(node) = tree.root() {
            let left = node.left().clone();
            self.stack.push(tree);
            tree = left;
        }
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        loop {
            if let Some(&unit) = self.current.next() {
                self.offset += 1;
                return Some(unit);
            }
            let tree = self.stack.pop()?;
            let Some(node) = tree.root() else { continue };
            self.current = self.buffers.piece_slice(&node.data().piece).iter();
            let right = node.right().clone();
            self.push_left_spine(right);
        }
    }
}
