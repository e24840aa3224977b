//! Use Rewiring and Cleanup.
//!
//! For each lane, extract the lane's scalar from the vector sum, point every
//! use of the original addition at it, and erase the addition. A consumer
//! that is a store additionally gets a second store of the same value to
//! the same destination.
//!
//! The duplicate store is emitted before the anchor, right after the lane's
//! extract, so it stays in the fused block (already cleared by the aliasing
//! guard) even when the consumer lives in a later block. If an operand of
//! the store is only defined after the anchor, the duplicate goes right
//! after the consumer instead, provided the consumer is in the fused block.
//! Otherwise no duplicate is emitted.
//!
//! Lanes are handled in order and the anchor is always the last lane of the
//! last chunk, so it stays in place as the insertion point until every
//! extract has been emitted.

use smallvec::SmallVec;

use fuse_ir::{Builder, Function, Inst, InstClass, InstId, IrError, Use, Value};

use crate::collect::FusionLane;

/// Counts from rewiring one chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewireStats {
    pub rewired_uses: usize,
    pub duplicated_stores: usize,
}

/// Redirect every use of `lanes` to lanes of `sum` and erase the additions.
pub fn rewire_lanes(
    func: &mut Function,
    lanes: &[FusionLane],
    sum: Value,
    anchor: InstId,
    duplicate_stores: bool,
) -> Result<RewireStats, IrError> {
    let mut stats = RewireStats::default();

    for (lane, member) in (0u32..).zip(lanes) {
        let extracted = Builder::before(func, anchor).extract_element(sum, lane);

        let uses: SmallVec<[Use; 4]> = SmallVec::from_slice(func.uses(member.add));
        for Use { user, slot } in uses {
            func.set_operand(user, slot, extracted)?;
            stats.rewired_uses += 1;

            if !duplicate_stores || func.inst(user).class() != InstClass::StorageWrite {
                continue;
            }
            if let Inst::Store { value, dest } = *func.inst(user).inst() {
                if duplicate_store(func, user, value, dest, anchor) {
                    stats.duplicated_stores += 1;
                }
            }
        }

        func.erase(member.add)?;
    }

    Ok(stats)
}

/// Emit `store value, dest` in the fused block. Returns whether it was emitted.
fn duplicate_store(
    func: &mut Function,
    consumer: InstId,
    value: Value,
    dest: Value,
    anchor: InstId,
) -> bool {
    if defined_before(func, value, anchor) && defined_before(func, dest, anchor) {
        Builder::before(func, anchor).store(value, dest);
        return true;
    }
    if func.inst(consumer).block() == func.inst(anchor).block() {
        Builder::after(func, consumer).store(value, dest);
        return true;
    }
    tracing::trace!(
        function = func.name(),
        consumer = consumer.raw(),
        "store operand defined after the anchor, not duplicated"
    );
    false
}

/// Whether `value` is available at the position of `anchor`.
fn defined_before(func: &Function, value: Value, anchor: InstId) -> bool {
    let Value::Inst(def) = value else {
        return true;
    };
    let def_block = func.inst(def).block();
    let anchor_block = func.inst(anchor).block();
    if def_block != anchor_block {
        return def_block.index() < anchor_block.index();
    }
    match (
        func.position_of(def_block, def),
        func.position_of(anchor_block, anchor),
    ) {
        (Some(def_pos), Some(anchor_pos)) => def_pos < anchor_pos,
        _ => false,
    }
}
