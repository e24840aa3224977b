//! Region Segmenter: split a block into call-free runs.
//!
//! # Algorithm
//!
//! One linear scan over the block with a two-state machine:
//!
//! | state             | call                       | anything else      |
//! |-------------------|----------------------------|--------------------|
//! | `Idle`            | stay idle                  | open run `[p, p]`  |
//! | `InRun{start,end}`| emit `[start,end]`, idle   | extend to `end = p`|
//!
//! A run is therefore always closed by the call right after it, at
//! `end + 1`. A run still open when the block ends has no closing call and
//! is dropped unless the caller asks for it to be flushed.

use std::ops::RangeInclusive;

use fuse_ir::{BlockId, Function, InstClass};

/// An inclusive range of instruction positions free of calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub end: usize,
}

impl Run {
    #[inline]
    pub fn positions(self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    Idle,
    InRun { start: usize, end: usize },
}

/// Runs of `block` in program order.
///
/// With `flush_trailing` set, a run reaching the end of the block is
/// emitted as well.
pub fn segment_block(func: &Function, block: BlockId, flush_trailing: bool) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut state = ScanState::Idle;

    for (pos, &id) in func.block(block).insts().iter().enumerate() {
        let is_call = func.inst(id).class() == InstClass::Call;
        state = match (state, is_call) {
            (ScanState::Idle, true) => ScanState::Idle,
            (ScanState::Idle, false) => ScanState::InRun {
                start: pos,
                end: pos,
            },
            (ScanState::InRun { start, end }, true) => {
                runs.push(Run { start, end });
                ScanState::Idle
            }
            (ScanState::InRun { start, .. }, false) => ScanState::InRun { start, end: pos },
        };
    }

    if let ScanState::InRun { start, end } = state {
        if flush_trailing {
            runs.push(Run { start, end });
        } else {
            tracing::trace!(
                function = func.name(),
                block = block.raw(),
                start,
                end,
                "dropping trailing run with no closing call"
            );
        }
    }

    runs
}
