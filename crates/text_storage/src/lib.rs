mod error;
mod line;
mod storage;
mod storage_builder;

pub use crate::error::IndexError;
pub use crate::line::Line;
pub use crate::storage::TextStorage;
pub use crate::storage_builder::TextStorageBuilder;
pub use piece_tree::{LineTerminator, PieceTreeConfig};
