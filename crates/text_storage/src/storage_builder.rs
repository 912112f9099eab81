use crate::storage::TextStorage;
use piece_tree::{PieceTree, PieceTreeConfig};

/// Collects text in chunks and builds a [`TextStorage`] without joining them first.
#[derive(Default, Debug)]
pub struct TextStorageBuilder {
    chunks: Vec<Vec<u16>>,
    config: PieceTreeConfig,
}

impl TextStorageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PieceTreeConfig) -> Self {
        Self {
            chunks: Vec::new(),
            config,
        }
    }

    /// Accept a chunk of text (may include multiple lines).
    pub fn accept_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.chunks.push(chunk.encode_utf16().collect());
    }

    /// Finish building and return a `TextStorage`.
    pub fn finish(mut self) -> TextStorage {
        let chunks = std::mem::take(&mut self.chunks);
        TextStorage::from_tree(PieceTree::from_chunks(chunks, self.config))
    }
}
