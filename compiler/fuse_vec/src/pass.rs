//! Add-fusion pass entry points.
//!
//! # Algorithm
//!
//! Blocks are processed in layout order. For each block:
//!
//! 1. **Guard.** Refuse the whole function if a store destination is
//!    written twice (see [`guard`](crate::guard)).
//! 2. **Segment.** Split the block into call-free runs.
//! 3. **Fuse.** For the first run not yet visited, collect its additions,
//!    synthesize the vector add before the last one, rewire every use and
//!    erase the scalar additions.
//! 4. **Rescan.** The rewrite shifted positions, so the block is segmented
//!    again and scanning resumes right after the call that closed the run
//!    just processed.
//!
//! # Abort
//!
//! A guard failure stops the pass. With [`GuardScope::PerBlock`] blocks
//! processed before the failing one keep their rewrites unless
//! [`AbortPolicy::Rollback`] restores the function from a snapshot taken
//! before the pass started.

use std::fmt;

use fuse_ir::{BlockId, Function, InstId, IrError};

use crate::collect::{collect_group, first_early_use};
use crate::config::{AbortPolicy, GuardScope, VectorizeConfig};
use crate::guard::{self, UnsafeAliasing};
use crate::position::PositionIndex;
use crate::rewire::rewire_lanes;
use crate::segment::{segment_block, Run};
use crate::synth::synthesize;

// ── Statistics ──────────────────────────────────────────────────────

/// What the pass did to one function (or, merged, to many).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FusionStats {
    /// Runs visited.
    pub runs: usize,
    /// Runs left alone: no additions, or an addition used too early.
    pub skipped_runs: usize,
    pub fused_groups: usize,
    /// Vector additions emitted (more than one per group when chunked).
    pub vector_adds: usize,
    /// Scalar additions replaced.
    pub fused_adds: usize,
    pub rewired_uses: usize,
    pub duplicated_stores: usize,
}

impl FusionStats {
    pub fn merge(&mut self, other: &FusionStats) {
        self.runs += other.runs;
        self.skipped_runs += other.skipped_runs;
        self.fused_groups += other.fused_groups;
        self.vector_adds += other.vector_adds;
        self.fused_adds += other.fused_adds;
        self.rewired_uses += other.rewired_uses;
        self.duplicated_stores += other.duplicated_stores;
    }

    /// Whether the function was changed.
    #[inline]
    pub fn changed(&self) -> bool {
        self.fused_groups > 0
    }
}

impl fmt::Display for FusionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} runs ({} skipped), {} groups fused: {} scalar adds into {} vector adds, \
             {} uses rewired, {} stores duplicated",
            self.runs,
            self.skipped_runs,
            self.fused_groups,
            self.fused_adds,
            self.vector_adds,
            self.rewired_uses,
            self.duplicated_stores
        )
    }
}

// ── Errors ──────────────────────────────────────────────────────────

/// Why the pass stopped early.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VectorizeError {
    /// The aliasing guard fired. Not a bug: the function is simply unsafe
    /// to rewrite without alias analysis.
    UnsafeAliasing(UnsafeAliasing),
    /// An IR mutation failed, which means the pass broke an invariant.
    Ir(IrError),
}

impl fmt::Display for VectorizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorizeError::UnsafeAliasing(err) => write!(f, "unsafe aliasing: {err}"),
            VectorizeError::Ir(err) => write!(f, "IR mutation failed: {err}"),
        }
    }
}

impl std::error::Error for VectorizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VectorizeError::UnsafeAliasing(err) => Some(err),
            VectorizeError::Ir(err) => Some(err),
        }
    }
}

impl From<UnsafeAliasing> for VectorizeError {
    fn from(err: UnsafeAliasing) -> Self {
        VectorizeError::UnsafeAliasing(err)
    }
}

impl From<IrError> for VectorizeError {
    fn from(err: IrError) -> Self {
        VectorizeError::Ir(err)
    }
}

// ── Entry points ────────────────────────────────────────────────────

/// Run add fusion over every block of `func`.
///
/// On error the function is left as the abort policy says: partially
/// rewritten, or restored to its input.
pub fn vectorize_function(
    func: &mut Function,
    config: &VectorizeConfig,
) -> Result<FusionStats, VectorizeError> {
    let snapshot = (config.on_abort == AbortPolicy::Rollback).then(|| func.clone());
    tracing::trace!(function = func.name(), "before add fusion:\n{func}");

    match fuse_blocks(func, config) {
        Ok(stats) => {
            if stats.changed() {
                tracing::debug!(
                    function = func.name(),
                    groups = stats.fused_groups,
                    adds = stats.fused_adds,
                    vector_adds = stats.vector_adds,
                    "fused scalar additions"
                );
            }
            tracing::trace!(function = func.name(), "after add fusion:\n{func}");
            Ok(stats)
        }
        Err(err) => {
            if let Some(original) = snapshot {
                *func = original;
                tracing::debug!(function = func.name(), "rolled back partial rewrite");
            }
            Err(err)
        }
    }
}

/// Pass-manager contract: `true` once the pass ran to completion, even if
/// nothing was fused, and `false` when it aborted.
pub fn run_on_function(func: &mut Function, config: &VectorizeConfig) -> bool {
    match vectorize_function(func, config) {
        Ok(_) => true,
        Err(err) => {
            tracing::debug!(function = func.name(), error = %err, "add fusion aborted");
            false
        }
    }
}

/// The result of running the pass over one function of a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionOutcome {
    pub function: String,
    pub result: Result<FusionStats, VectorizeError>,
}

/// Per-function outcomes of [`vectorize_module`], in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleReport {
    pub outcomes: Vec<FunctionOutcome>,
}

impl ModuleReport {
    /// Statistics summed over every function that completed.
    pub fn totals(&self) -> FusionStats {
        let mut totals = FusionStats::default();
        for stats in self.outcomes.iter().filter_map(|o| o.result.as_ref().ok()) {
            totals.merge(stats);
        }
        totals
    }

    /// Functions the pass aborted on.
    pub fn aborted(&self) -> impl Iterator<Item = &FunctionOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Run the pass over each function independently. An abort in one
/// function does not affect the others.
pub fn vectorize_module(funcs: &mut [Function], config: &VectorizeConfig) -> ModuleReport {
    let outcomes = funcs
        .iter_mut()
        .map(|func| FunctionOutcome {
            result: vectorize_function(func, config),
            function: func.name().to_owned(),
        })
        .collect();
    ModuleReport { outcomes }
}

// ── Driver ──────────────────────────────────────────────────────────

fn fuse_blocks(
    func: &mut Function,
    config: &VectorizeConfig,
) -> Result<FusionStats, VectorizeError> {
    if config.guard_scope == GuardScope::Function {
        guard::check_function(func)?;
    }

    let mut stats = FusionStats::default();
    for block in func.block_ids() {
        if config.guard_scope == GuardScope::PerBlock {
            guard::check_block(func, block)?;
        }
        fuse_block(func, block, config, &mut stats)?;
    }
    Ok(stats)
}

fn fuse_block(
    func: &mut Function,
    block: BlockId,
    config: &VectorizeConfig,
    stats: &mut FusionStats,
) -> Result<(), IrError> {
    // The call that closed the last processed run. It is never rewritten,
    // so its fresh position is where scanning resumes.
    let mut resume_after: Option<InstId> = None;

    loop {
        let index = PositionIndex::build(func.block(block));
        let resume = match resume_after {
            Some(call) => index.position(call).map_or(index.len(), |pos| pos + 1),
            None => 0,
        };

        let Some(run) = segment_block(func, block, config.flush_trailing_run)
            .into_iter()
            .find(|run| run.start >= resume)
        else {
            break;
        };
        stats.runs += 1;
        let closing = func.block(block).insts().get(run.end + 1).copied();

        fuse_run(func, block, run, &index, config, stats)?;

        match closing {
            Some(call) => resume_after = Some(call),
            None => break,
        }
    }
    Ok(())
}

fn fuse_run(
    func: &mut Function,
    block: BlockId,
    run: Run,
    index: &PositionIndex,
    config: &VectorizeConfig,
    stats: &mut FusionStats,
) -> Result<(), IrError> {
    let Some(group) = collect_group(func, block, run) else {
        stats.skipped_runs += 1;
        return Ok(());
    };

    if config.require_uses_after_anchor {
        if let Some(early) = first_early_use(&group, func, index) {
            tracing::debug!(
                function = func.name(),
                block = block.raw(),
                add = early.add.raw(),
                user = early.user.raw(),
                "addition used before the fused value exists, skipping run"
            );
            stats.skipped_runs += 1;
            return Ok(());
        }
    }

    let chunk_len = config.chunk_len(group.num_adds());
    for lanes in group.lanes.chunks(chunk_len) {
        let sum = synthesize(func, lanes, group.anchor);
        let rewired = rewire_lanes(func, lanes, sum, group.anchor, config.duplicate_stores)?;
        stats.vector_adds += 1;
        stats.fused_adds += lanes.len();
        stats.rewired_uses += rewired.rewired_uses;
        stats.duplicated_stores += rewired.duplicated_stores;
    }
    stats.fused_groups += 1;

    tracing::debug!(
        function = func.name(),
        block = block.raw(),
        start = run.start,
        end = run.end,
        adds = group.num_adds(),
        chunk_len,
        "fused run"
    );
    Ok(())
}

#[cfg(test)]
mod tests;
