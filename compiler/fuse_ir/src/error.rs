//! Errors raised by IR mutation.

use std::fmt;

use crate::InstId;

/// A mutation request the arena cannot honor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrError {
    /// Erasing an instruction whose result is still referenced.
    StillUsed { inst: InstId, uses: usize },
    /// The instruction was already erased.
    Erased { inst: InstId },
    /// The instruction has no operand slot with this index.
    BadSlot { inst: InstId, slot: u32 },
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrError::StillUsed { inst, uses } => write!(
                f,
                "cannot erase instruction {}: {} use(s) still reference it",
                inst.raw(),
                uses
            ),
            IrError::Erased { inst } => {
                write!(f, "instruction {} has already been erased", inst.raw())
            }
            IrError::BadSlot { inst, slot } => {
                write!(f, "instruction {} has no operand slot {}", inst.raw(), slot)
            }
        }
    }
}

impl std::error::Error for IrError {}
