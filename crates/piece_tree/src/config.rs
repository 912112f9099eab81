pub const DEFAULT_ADD_BUFFER_CAPACITY: usize = 64 * 1024;

/// Construction-time knobs for [`PieceTree`](crate::PieceTree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceTreeConfig {
    /// Code units an add buffer may hold before a fresh one is opened.
    pub add_buffer_capacity: usize,
    /// Extend the preceding piece instead of inserting a new one when typed
    /// text lands right after it in the add buffer.
    pub coalesce_inserts: bool,
    /// Maximum entries kept on each of the undo and redo stacks.
    pub history_limit: Option<usize>,
}

impl Default for PieceTreeConfig {
    fn default() -> Self {
        Self {
            add_buffer_capacity: DEFAULT_ADD_BUFFER_CAPACITY,
            coalesce_inserts: true,
            history_limit: None,
        }
    }
}

impl PieceTreeConfig {
    pub fn with_add_buffer_capacity(mut self, capacity: usize) -> Self {
        self.add_buffer_capacity = capacity;
        self
    }

    pub fn with_coalesce_inserts(mut self, coalesce: bool) -> Self {
        self.coalesce_inserts = coalesce;
        self
    }

    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }
}
