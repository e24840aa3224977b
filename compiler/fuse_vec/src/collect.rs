//! Fusion Candidate Collector.
//!
//! One traversal of a run counts its scalar `i32` additions, records their
//! operands in program order, and remembers the last one as the anchor
//! (where the vector code is inserted).

use smallvec::SmallVec;

use fuse_ir::{BlockId, Function, Inst, InstClass, InstId, Value};

use crate::position::PositionIndex;
use crate::segment::Run;

/// One scalar addition selected for fusion, in lane order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FusionLane {
    pub add: InstId,
    pub lhs: Value,
    pub rhs: Value,
}

/// The additions of one run, to be replaced by vector adds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FusionGroup {
    pub lanes: SmallVec<[FusionLane; 8]>,
    /// The last addition of the run.
    pub anchor: InstId,
}

impl FusionGroup {
    #[inline]
    pub fn num_adds(&self) -> usize {
        self.lanes.len()
    }
}

/// Collect the additions of `run`. `None` when the run has none.
pub fn collect_group(func: &Function, block: BlockId, run: Run) -> Option<FusionGroup> {
    let insts = func.block(block).insts();
    let mut lanes: SmallVec<[FusionLane; 8]> = SmallVec::new();
    for &id in &insts[run.positions()] {
        let data = func.inst(id);
        if data.class() != InstClass::BinaryAdd {
            continue;
        }
        if let Inst::Binary { lhs, rhs, .. } = *data.inst() {
            lanes.push(FusionLane { add: id, lhs, rhs });
        }
    }
    let anchor = lanes.last()?.add;
    Some(FusionGroup { lanes, anchor })
}

/// A use of a group member that the rewritten code could not reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EarlyUse {
    pub add: InstId,
    pub user: InstId,
}

/// Find a use of a group member at or before the anchor in the same block.
///
/// Extracted lanes are defined just before the anchor, so such a use (for
/// instance `t2 = add t1, c` inside the group) would end up reading a
/// value before its definition. Uses in other blocks are always reachable.
pub fn first_early_use(
    group: &FusionGroup,
    func: &Function,
    index: &PositionIndex,
) -> Option<EarlyUse> {
    let anchor_pos = index.position(group.anchor)?;
    group.lanes.iter().find_map(|lane| {
        func.uses(lane.add)
            .iter()
            .find(|u| index.position(u.user).is_some_and(|pos| pos <= anchor_pos))
            .map(|u| EarlyUse {
                add: lane.add,
                user: u.user,
            })
    })
}
