use crate::buffer::Piece;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeColor {
    Red,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeData {
    pub piece: Piece,
    pub left_subtree_length: usize,
    pub left_subtree_lf_count: usize,
}

#[derive(Debug)]
pub struct TreeNode {
    color: NodeColor,
    left: RedBlackTree,
    data: NodeData,
    right: RedBlackTree,
    subtree_length: usize,
    subtree_lf_count: usize,
}

impl TreeNode {
    pub fn color(&self) -> NodeColor {
        self.color
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn left(&self) -> &RedBlackTree {
        &self.left
    }

    pub fn right(&self) -> &RedBlackTree {
        &self.right
    }
}

/// Persistent red-black tree of pieces ordered by document position.
///
/// Nodes are never modified once built. Every edit copies the path from the
/// root to the touched node, so cloning a tree is a snapshot.
#[derive(Debug, Clone, Default)]
pub struct RedBlackTree {
    root: Option<Rc<TreeNode>>,
}

impl RedBlackTree {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn length(&self) -> usize {
        self.root.as_ref().map_or(0, |node| node.subtree_length)
    }

    pub fn line_feed_count(&self) -> usize {
        self.root.as_ref().map_or(0, |node| node.subtree_lf_count)
    }

    pub fn ptr_eq(&self, other: &RedBlackTree) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Inserts `piece` so that it starts at document offset `at`.
    pub fn insert(&self, piece: Piece, at: usize) -> RedBlackTree {
        debug_assert!(piece.length > 0, "empty pieces are never stored");
        let tree = self.ins(piece, at, 0);
        tree.blacken()
    }

    /// Removes the node starting at document offset `at`.
    pub fn remove(&self, at: usize) -> RedBlackTree {
        let tree = self.rem(at, 0);
        if tree.is_empty() {
            return tree;
        }
        tree.blacken()
    }

    /// Replaces the piece of the node starting at `at`; shape and colors stay.
    pub fn update(&self, at: usize, piece: Piece) -> RedBlackTree {
        debug_assert!(piece.length > 0, "empty pieces are never stored");
        self.upd(at, 0, piece)
    }

    /// Pieces in document order.
    pub fn pieces(&self) -> Vec<Piece> {
        let mut out = Vec::new();
        self.collect_pieces(&mut out);
        out
    }

    fn collect_pieces(&self, out: &mut Vec<Piece>) {
        if let Some(node) = self.root() {
            node.left.collect_pieces(out);
            out.push(node.data.piece);
            node.right.collect_pieces(out);
        }
    }

    /// Checks colouring, black height and cached aggregates; returns the black height.
    pub fn check(&self) -> Result<usize, String> {
        let Some(node) = self.root() else {
            return Ok(1);
        };
        if node.color == NodeColor::Red && (node.left.is_red() || node.right.is_red()) {
            return Err(format!("red node {:?} has a red child", node.data.piece));
        }
        let left_height = node.left.check()?;
        let right_height = node.right.check()?;
        if left_height != right_height {
            return Err(format!(
                "black height mismatch {left_height} != {right_height} at {:?}",
                node.data.piece
            ));
        }
        if node.data.left_subtree_length != node.left.length()
            || node.data.left_subtree_lf_count != node.left.line_feed_count()
        {
            return Err(format!("stale left aggregates at {:?}", node.data.piece));
        }
        let length = node.left.length() + node.data.piece.length + node.right.length();
        let lf = node.left.line_feed_count()
            + node.data.piece.line_feed_cnt
            + node.right.line_feed_count();
        if node.subtree_length != length || node.subtree_lf_count != lf {
            return Err(format!("stale subtree aggregates at {:?}", node.data.piece));
        }
        Ok(left_height + usize::from(node.color == NodeColor::Black))
    }

    fn node(color: NodeColor, left: RedBlackTree, piece: Piece, right: RedBlackTree) -> Self {
        let data = NodeData {
            piece,
            left_subtree_length: left.length(),
            left_subtree_lf_count: left.line_feed_count(),
        };
        let subtree_length = data.left_subtree_length + piece.length + right.length();
        let subtree_lf_count =
            data.left_subtree_lf_count + piece.line_feed_cnt + right.line_feed_count();
        Self {
            root: Some(Rc::new(TreeNode {
                color,
                left,
                data,
                right,
                subtree_length,
                subtree_lf_count,
            })),
        }
    }

    fn inner(&self) -> &TreeNode {
        self.root
            .as_deref()
            .expect("red-black invariant guarantees a node here")
    }

    fn color(&self) -> NodeColor {
        self.root().map_or(NodeColor::Black, |node| node.color)
    }

    fn is_red(&self) -> bool {
        self.color() == NodeColor::Red
    }

    fn is_black_node(&self) -> bool {
        self.root()
            .is_some_and(|node| node.color == NodeColor::Black)
    }

    fn piece(&self) -> Piece {
        self.inner().data.piece
    }

    fn left(&self) -> RedBlackTree {
        self.inner().left.clone()
    }

    fn right(&self) -> RedBlackTree {
        self.inner().right.clone()
    }

    fn paint(&self, color: NodeColor) -> RedBlackTree {
        let node = self.inner();
        Self::node(color, node.left.clone(), node.data.piece, node.right.clone())
    }

    fn blacken(&self) -> RedBlackTree {
        if self.color() == NodeColor::Black {
            return self.clone();
        }
        self.paint(NodeColor::Black)
    }

    fn doubled_left(&self) -> bool {
        self.is_red() && self.inner().left.is_red()
    }

    fn doubled_right(&self) -> bool {
        self.is_red() && self.inner().right.is_red()
    }

    fn ins(&self, piece: Piece, at: usize, total: usize) -> RedBlackTree {
        let Some(node) = self.root() else {
            return Self::node(NodeColor::Red, Self::new(), piece, Self::new());
        };
        let node_start = total + node.data.left_subtree_length;
        if at < node_start + node.data.piece.length {
            Self::balance(
                node.color,
                node.left.ins(piece, at, total),
                node.data.piece,
                node.right.clone(),
            )
        } else {
            Self::balance(
                node.color,
                node.left.clone(),
                node.data.piece,
                node.right
                    .ins(piece, at, node_start + node.data.piece.length),
            )
        }
    }

    fn upd(&self, at: usize, total: usize, piece: Piece) -> RedBlackTree {
        let node = self.inner();
        let node_start = total + node.data.left_subtree_length;
        if at < node_start {
            Self::node(
                node.color,
                node.left.upd(at, total, piece),
                node.data.piece,
                node.right.clone(),
            )
        } else if at == node_start {
            Self::node(node.color, node.left.clone(), piece, node.right.clone())
        } else {
            Self::node(
                node.color,
                node.left.clone(),
                node.data.piece,
                node.right
                    .upd(at, node_start + node.data.piece.length, piece),
            )
        }
    }

    fn rem(&self, at: usize, total: usize) -> RedBlackTree {
        let Some(node) = self.root() else {
            return Self::new();
        };
        let node_start = total + node.data.left_subtree_length;
        if at < node_start {
            self.remove_left(at, total)
        } else if at == node_start {
            Self::fuse(&node.left, &node.right)
        } else {
            self.remove_right(at, node_start + node.data.piece.length)
        }
    }

    fn remove_left(&self, at: usize, total: usize) -> RedBlackTree {
        let node = self.inner();
        let new_left = node.left.rem(at, total);
        let new_node = Self::node(NodeColor::Red, new_left, node.data.piece, node.right.clone());
        if node.left.is_black_node() {
            Self::balance_left(&new_node)
        } else {
            new_node
        }
    }

    fn remove_right(&self, at: usize, total: usize) -> RedBlackTree {
        let node = self.inner();
        let new_right = node.right.rem(at, total);
        let new_node = Self::node(NodeColor::Red, node.left.clone(), node.data.piece, new_right);
        if node.right.is_black_node() {
            Self::balance_right(&new_node)
        } else {
            new_node
        }
    }

    fn fuse(left: &RedBlackTree, right: &RedBlackTree) -> RedBlackTree {
        if left.is_empty() {
            return right.clone();
        }
        if right.is_empty() {
            return left.clone();
        }
        match (left.color(), right.color()) {
            (NodeColor::Black, NodeColor::Red) => Self::node(
                NodeColor::Red,
                Self::fuse(left, &right.left()),
                right.piece(),
                right.right(),
            ),
            (NodeColor::Red, NodeColor::Black) => Self::node(
                NodeColor::Red,
                left.left(),
                left.piece(),
                Self::fuse(&left.right(), right),
            ),
            (NodeColor::Red, NodeColor::Red) => {
                let fused = Self::fuse(&left.right(), &right.left());
                if fused.is_red() {
                    let new_left = Self::node(NodeColor::Red, left.left(), left.piece(), fused.left());
                    let new_right =
                        Self::node(NodeColor::Red, fused.right(), right.piece(), right.right());
                    Self::node(NodeColor::Red, new_left, fused.piece(), new_right)
                } else {
                    let new_right = Self::node(NodeColor::Red, fused, right.piece(), right.right());
                    Self::node(NodeColor::Red, left.left(), left.piece(), new_right)
                }
            }
            (NodeColor::Black, NodeColor::Black) => {
                let fused = Self::fuse(&left.right(), &right.left());
                if fused.is_red() {
                    let new_left =
                        Self::node(NodeColor::Black, left.left(), left.piece(), fused.left());
                    let new_right =
                        Self::node(NodeColor::Black, fused.right(), right.piece(), right.right());
                    Self::node(NodeColor::Red, new_left, fused.piece(), new_right)
                } else {
                    let new_right =
                        Self::node(NodeColor::Black, fused, right.piece(), right.right());
                    let new_node = Self::node(NodeColor::Red, left.left(), left.piece(), new_right);
                    Self::balance_left(&new_node)
                }
            }
        }
    }

    // `tree.left()` lost one black level.
    fn balance_left(tree: &RedBlackTree) -> RedBlackTree {
        let left = tree.left();
        let right = tree.right();
        if left.is_red() {
            return Self::node(
                NodeColor::Red,
                left.paint(NodeColor::Black),
                tree.piece(),
                right,
            );
        }
        if right.is_black_node() {
            return Self::balance_node(&Self::node(
                NodeColor::Black,
                left,
                tree.piece(),
                right.paint(NodeColor::Red),
            ));
        }
        if right.is_red() && right.left().is_black_node() {
            let right_left = right.left();
            let unbalanced_new_right = Self::node(
                NodeColor::Black,
                right_left.right(),
                right.piece(),
                right.right().paint(NodeColor::Red),
            );
            let new_right = Self::balance_node(&unbalanced_new_right);
            let new_left = Self::node(NodeColor::Black, left, tree.piece(), right_left.left());
            return Self::node(NodeColor::Red, new_left, right_left.piece(), new_right);
        }
        debug_assert!(false, "balance_left reached an unbalanced shape");
        tree.clone()
    }

    // `tree.right()` lost one black level.
    fn balance_right(tree: &RedBlackTree) -> RedBlackTree {
        let left = tree.left();
        let right = tree.right();
        if right.is_red() {
            return Self::node(
                NodeColor::Red,
                left,
                tree.piece(),
                right.paint(NodeColor::Black),
            );
        }
        if left.is_black_node() {
            return Self::balance_node(&Self::node(
                NodeColor::Black,
                left.paint(NodeColor::Red),
                tree.piece(),
                right,
            ));
        }
        if left.is_red() && left.right().is_black_node() {
            let left_right = left.right();
            let unbalanced_new_left = Self::node(
                NodeColor::Black,
                left.left().paint(NodeColor::Red),
                left.piece(),
                left_right.left(),
            );
            let new_left = Self::balance_node(&unbalanced_new_left);
            let new_right = Self::node(NodeColor::Black, left_right.right(), tree.piece(), right);
            return Self::node(NodeColor::Red, new_left, left_right.piece(), new_right);
        }
        debug_assert!(false, "balance_right reached an unbalanced shape");
        tree.clone()
    }

    fn balance_node(tree: &RedBlackTree) -> RedBlackTree {
        let left = tree.left();
        let right = tree.right();
        if left.is_red() && right.is_red() {
            return Self::node(
                NodeColor::Red,
                left.paint(NodeColor::Black),
                tree.piece(),
                right.paint(NodeColor::Black),
            );
        }
        Self::balance(tree.color(), left, tree.piece(), right)
    }

    fn balance(
        color: NodeColor,
        left: RedBlackTree,
        piece: Piece,
        right: RedBlackTree,
    ) -> RedBlackTree {
        if color == NodeColor::Black {
            if left.doubled_left() {
                return Self::node(
                    NodeColor::Red,
                    left.left().paint(NodeColor::Black),
                    left.piece(),
                    Self::node(NodeColor::Black, left.right(), piece, right),
                );
            }
            if left.doubled_right() {
                let left_right = left.right();
                return Self::node(
                    NodeColor::Red,
                    Self::node(NodeColor::Black, left.left(), left.piece(), left_right.left()),
                    left_right.piece(),
                    Self::node(NodeColor::Black, left_right.right(), piece, right),
                );
            }
            if right.doubled_left() {
                let right_left = right.left();
                return Self::node(
                    NodeColor::Red,
                    Self::node(NodeColor::Black, left, piece, right_left.left()),
                    right_left.piece(),
                    Self::node(NodeColor::Black, right_left.right(), right.piece(), right.right()),
                );
            }
            if right.doubled_right() {
                return Self::node(
                    NodeColor::Red,
                    Self::node(NodeColor::Black, left, piece, right.left()),
                    right.piece(),
                    right.right().paint(NodeColor::Black),
                );
            }
        }
        Self::node(color, left, piece, right)
    }
}
