//! Vector Synthesizer.
//!
//! Packs the left and right operands of `n` scalar additions into two
//! `<n x i32>` vectors, lane `i` holding the operands of the `i`-th
//! addition, and adds the vectors. Everything is inserted before the
//! anchor, where every lane operand is already defined.

use fuse_ir::{Builder, Function, InstId, Value};

use crate::collect::FusionLane;

/// Emit the packed vector add for `lanes` before `anchor` and return it.
pub fn synthesize(func: &mut Function, lanes: &[FusionLane], anchor: InstId) -> Value {
    let width = u32::try_from(lanes.len())
        .unwrap_or_else(|_| panic!("fusion group of {} lanes exceeds u32::MAX", lanes.len()));
    debug_assert!(width > 0, "synthesizing an empty fusion group");

    let mut bld = Builder::before(func, anchor);
    let mut left = bld.splat(width, 0);
    let mut right = bld.splat(width, 0);
    for (lane, member) in (0..width).zip(lanes) {
        left = bld.insert_element(left, member.lhs, lane);
        right = bld.insert_element(right, member.rhs, lane);
    }
    bld.add(left, right)
}
