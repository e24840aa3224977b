//! Aliasing Guard.
//!
//! Without alias analysis the pass cannot tell whether reordering around a
//! store is safe, so it refuses to touch a block where two stores name the
//! same destination operand. Destination identity is plain `Value`
//! equality: two different pointer values that happen to alias are not
//! detected.

use std::fmt;

use rustc_hash::FxHashSet;

use fuse_ir::{BlockId, Function, Inst, InstClass, InstId, Value};

/// A destination written by more than one store in the same block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnsafeAliasing {
    pub block: BlockId,
    /// The second store to `dest`.
    pub store: InstId,
    pub dest: Value,
}

impl fmt::Display for UnsafeAliasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} stores to the same destination twice (second store is instruction {})",
            self.block.raw(),
            self.store.raw()
        )
    }
}

impl std::error::Error for UnsafeAliasing {}

/// Scan the stores of `block` in program order for a repeated destination.
pub fn check_block(func: &Function, block: BlockId) -> Result<(), UnsafeAliasing> {
    let mut written: FxHashSet<Value> = FxHashSet::default();
    for &id in func.block(block).insts() {
        let data = func.inst(id);
        if data.class() != InstClass::StorageWrite {
            continue;
        }
        let Inst::Store { dest, .. } = *data.inst() else {
            continue;
        };
        if !written.insert(dest) {
            tracing::debug!(
                function = func.name(),
                block = block.raw(),
                store = id.raw(),
                "duplicate store destination, refusing to vectorize"
            );
            return Err(UnsafeAliasing {
                block,
                store: id,
                dest,
            });
        }
    }
    Ok(())
}

/// Guard every block of `func`, stopping at the first failure.
pub fn check_function(func: &Function) -> Result<(), UnsafeAliasing> {
    for block in func.block_ids() {
        check_block(func, block)?;
    }
    Ok(())
}
