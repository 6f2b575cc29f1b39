// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract with the host application's undo/redo collaborator.

/// An undoable action, pushed once per finalized stroke.
pub struct HistoryEntry {
    pub label: &'static str,
    pub redo: Box<dyn FnMut() + Send>,
    pub undo: Box<dyn FnMut() + Send>,
}

impl std::fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Receiver for undoable actions. Implemented by the host's history stack;
/// a plain `Vec<HistoryEntry>` works for tests.
pub trait History {
    fn push(&mut self, entry: HistoryEntry);
}

impl History for Vec<HistoryEntry> {
    fn push(&mut self, entry: HistoryEntry) {
        Vec::push(self, entry);
    }
}
