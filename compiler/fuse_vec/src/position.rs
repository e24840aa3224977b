//! Position Indexer: sequential index of every instruction in a block.
//!
//! An index is a snapshot. Any insertion or erasure in the block makes it
//! stale, so the pass rebuilds it after every rewrite instead of patching.

use rustc_hash::FxHashMap;

use fuse_ir::{Block, InstId};

/// `InstId` to position map for one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionIndex {
    positions: FxHashMap<InstId, usize>,
}

impl PositionIndex {
    /// Number every live instruction of `block` from 0 in program order.
    pub fn build(block: &Block) -> Self {
        let positions = block
            .insts()
            .iter()
            .enumerate()
            .map(|(pos, &id)| (id, pos))
            .collect();
        Self { positions }
    }

    /// Position of `inst`, or `None` if it is not in the indexed block.
    #[inline]
    pub fn position(&self, inst: InstId) -> Option<usize> {
        self.positions.get(&inst).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
