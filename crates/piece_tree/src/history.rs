use std::collections::VecDeque;

/// Undo and redo stacks of whole-document states.
#[derive(Debug, Clone)]
pub struct History<T> {
    undo: VecDeque<T>,
    redo: VecDeque<T>,
    limit: Option<usize>,
}

impl<T> History<T> {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            limit,
        }
    }

    pub fn commit(&mut self, current: T) {
        Self::push_bounded(&mut self.undo, current, self.limit);
        self.redo.clear();
    }

    /// Returns the state to restore, keeping `current` for redo.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo.pop_back()?;
        Self::push_bounded(&mut self.redo, current, self.limit);
        Some(previous)
    }

    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop_back()?;
        Self::push_bounded(&mut self.undo, current, self.limit);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    fn push_bounded(stack: &mut VecDeque<T>, item: T, limit: Option<usize>) {
        stack.push_back(item);
        if let Some(limit) = limit {
            while stack.len() > limit {
                stack.pop_front();
            }
        }
    }
}
