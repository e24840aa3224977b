//! Structural checks over a [`Function`].
//!
//! Blocks are treated as laid out in dominance order: a definition dominates
//! a use when it sits earlier in the same block or in an earlier block.
//! That is exact for the straight-line bodies the add-fusion pass rewrites
//! and conservative otherwise.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::ir::{BlockId, Function, InstId, Use, Value};

/// A single inconsistency found by [`verify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// An operand names an erased or unplaced instruction.
    DanglingOperand {
        user: InstId,
        slot: u32,
        target: InstId,
    },
    /// An operand names an instruction that does not precede the user.
    UseBeforeDef {
        user: InstId,
        slot: u32,
        target: InstId,
    },
    /// An operand has no matching entry in the target's use-list.
    MissingUse {
        user: InstId,
        slot: u32,
        target: InstId,
    },
    /// A use-list entry whose user slot does not read the target.
    StaleUse { target: InstId, entry: Use },
    /// A tombstoned instruction is still listed in a block.
    ErasedInBlock { block: BlockId, inst: InstId },
    /// An instruction is listed in a block other than the one it records.
    WrongBlock { inst: InstId, listed_in: BlockId },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::DanglingOperand { user, slot, target } => write!(
                f,
                "instruction {} operand {} refers to erased instruction {}",
                user.raw(),
                slot,
                target.raw()
            ),
            VerifyError::UseBeforeDef { user, slot, target } => write!(
                f,
                "instruction {} operand {} uses instruction {} before its definition",
                user.raw(),
                slot,
                target.raw()
            ),
            VerifyError::MissingUse { user, slot, target } => write!(
                f,
                "instruction {} operand {} is missing from the use-list of instruction {}",
                user.raw(),
                slot,
                target.raw()
            ),
            VerifyError::StaleUse { target, entry } => write!(
                f,
                "use-list of instruction {} lists instruction {} slot {}, which does not read it",
                target.raw(),
                entry.user.raw(),
                entry.slot
            ),
            VerifyError::ErasedInBlock { block, inst } => write!(
                f,
                "erased instruction {} is still listed in block {}",
                inst.raw(),
                block.raw()
            ),
            VerifyError::WrongBlock { inst, listed_in } => write!(
                f,
                "instruction {} is listed in block {} but records another block",
                inst.raw(),
                listed_in.raw()
            ),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Check operand validity, definition order and use-list consistency.
///
/// Returns every problem found, in layout order.
pub fn verify(func: &Function) -> Result<(), Vec<VerifyError>> {
    let mut errors = Vec::new();

    // (block index, position) of every listed instruction.
    let mut order: FxHashMap<InstId, (usize, usize)> = FxHashMap::default();
    for block in func.blocks() {
        for (pos, &id) in block.insts().iter().enumerate() {
            order.insert(id, (block.id().index(), pos));
            let data = func.inst(id);
            if data.is_erased() {
                errors.push(VerifyError::ErasedInBlock {
                    block: block.id(),
                    inst: id,
                });
            } else if data.block() != block.id() {
                errors.push(VerifyError::WrongBlock {
                    inst: id,
                    listed_in: block.id(),
                });
            }
        }
    }

    for block in func.blocks() {
        for &user in block.insts() {
            let user_at = order[&user];
            for (slot, operand) in func.inst(user).inst().operands().into_iter().enumerate() {
                let Value::Inst(target) = operand else {
                    continue;
                };
                let slot = u32::try_from(slot)
                    .unwrap_or_else(|_| panic!("operand slot exceeds u32::MAX"));
                let placed = order.get(&target).copied();
                match placed {
                    Some(def_at) if !func.inst(target).is_erased() => {
                        if def_at >= user_at {
                            errors.push(VerifyError::UseBeforeDef { user, slot, target });
                        }
                    }
                    _ => {
                        errors.push(VerifyError::DanglingOperand { user, slot, target });
                        continue;
                    }
                }
                if !func.uses(target).contains(&Use { user, slot }) {
                    errors.push(VerifyError::MissingUse { user, slot, target });
                }
            }
        }
    }

    for target in func.live_insts() {
        for &entry in func.uses(target) {
            let reads_target = !func.inst(entry.user).is_erased()
                && func.inst(entry.user).inst().operand(entry.slot) == Some(Value::Inst(target));
            if !reads_target {
                errors.push(VerifyError::StaleUse { target, entry });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
