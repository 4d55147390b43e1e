//! Dense per-cell search arena shared by consecutive searches.

use std::{cmp::Reverse, collections::BinaryHeap};

use gridnav_core::{CellCoord, CollisionView};

/// Lifecycle of a cell within a single search. A cell is in exactly one state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum NodeState {
    #[default]
    Unvisited,
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, Default)]
struct Node {
    state: NodeState,
    g: u32,
    h: u32,
    parent: Option<usize>,
}

impl Node {
    fn f(&self) -> u32 {
        self.g.saturating_add(self.h)
    }
}

/// Open-set entry ordered by `f`, then `h`, then row-major index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    f: u32,
    h: u32,
    index: usize,
}

#[derive(Debug, Default)]
pub(crate) struct SearchScratch {
    nodes: Vec<Node>,
    open: BinaryHeap<Reverse<OpenEntry>>,
}

impl SearchScratch {
    /// Clears every node, reallocating only when the grid size changed.
    pub(crate) fn reset(&mut self, cell_count: usize) {
        if self.nodes.len() != cell_count {
            self.nodes = vec![Node::default(); cell_count];
        } else {
            self.nodes.fill(Node::default());
        }
        self.open.clear();
    }

    pub(crate) fn state(&self, index: usize) -> NodeState {
        self.nodes[index].state
    }

    pub(crate) fn g(&self, index: usize) -> u32 {
        self.nodes[index].g
    }

    pub(crate) fn open(&mut self, index: usize, g: u32, h: u32, parent: Option<usize>) {
        let node = Node {
            state: NodeState::Open,
            g,
            h,
            parent,
        };
        self.nodes[index] = node;
        self.open.push(Reverse(OpenEntry {
            f: node.f(),
            h,
            index,
        }));
    }

    /// Opens the cell or lowers its cost when `g` improves on the recorded one.
    pub(crate) fn relax(&mut self, index: usize, g: u32, h: u32, parent: usize) {
        let node = self.nodes[index];
        match node.state {
            NodeState::Unvisited => self.open(index, g, h, Some(parent)),
            NodeState::Open if g < node.g => self.open(index, g, h, Some(parent)),
            _ => {}
        }
    }

    pub(crate) fn close(&mut self, index: usize) {
        self.nodes[index].state = NodeState::Closed;
    }

    /// Extracts the open cell with the lowest `f`, skipping superseded entries.
    pub(crate) fn pop_open(&mut self) -> Option<usize> {
        while let Some(Reverse(entry)) = self.open.pop() {
            let node = self.nodes[entry.index];
            if node.state == NodeState::Open && node.f() == entry.f {
                return Some(entry.index);
            }
        }
        None
    }

    /// Walks parent links back from `goal`, returning cells in travel order
    /// without the start cell.
    pub(crate) fn reconstruct(&self, view: &CollisionView<'_>, goal: usize) -> Vec<CellCoord> {
        let mut cells = Vec::new();
        let mut current = goal;
        while let Some(parent) = self.nodes[current].parent {
            cells.push(view.cell_at(current));
            current = parent;
        }
        cells.reverse();
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_reuses_allocation_for_same_grid() {
        let mut scratch = SearchScratch::default();
        scratch.reset(16);
        scratch.open(3, 0, 5, None);
        scratch.close(3);
        let before = scratch.nodes.as_ptr();

        scratch.reset(16);

        assert_eq!(before, scratch.nodes.as_ptr());
        assert_eq!(scratch.state(3), NodeState::Unvisited);
        assert_eq!(scratch.pop_open(), None);
    }

    #[test]
    fn pop_skips_superseded_entries() {
        let mut scratch = SearchScratch::default();
        scratch.reset(4);
        scratch.open(0, 0, 0, None);
        scratch.relax(1, 30, 1, 0);
        scratch.relax(2, 20, 1, 0);
        scratch.relax(1, 10, 1, 0);
        scratch.close(0);

        assert_eq!(scratch.pop_open(), Some(1));
        scratch.close(1);
        assert_eq!(scratch.pop_open(), Some(2));
        scratch.close(2);
        assert_eq!(scratch.pop_open(), None);
    }

    #[test]
    fn ties_break_on_heuristic_then_index() {
        let mut scratch = SearchScratch::default();
        scratch.reset(4);
        scratch.open(3, 10, 2, None);
        scratch.open(2, 11, 1, None);
        scratch.open(1, 10, 2, None);

        assert_eq!(scratch.pop_open(), Some(2));
        assert_eq!(scratch.pop_open(), Some(1));
        assert_eq!(scratch.pop_open(), Some(3));
    }
}
