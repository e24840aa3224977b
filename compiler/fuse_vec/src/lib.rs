//! Add-fusion autovectorizer.
//!
//! Rewrites straight-line scalar `i32` additions inside one basic block
//! into a single SIMD addition:
//!
//! ```text
//! %t1 = add i32 %a, %b            %l = <a, c>   %r = <b, d>
//! %t2 = add i32 %c, %d     ==>    %s = add <2 x i32> %l, %r
//! store %t1, %p                   store (extract %s, 0), %p
//! store %t2, %q                   store (extract %s, 1), %q
//! call void @f()                  call void @f()
//! ```
//!
//! The pass is split into the pieces it is built from:
//!
//! - **Position Indexer** ([`PositionIndex`]) — instruction positions within
//!   a block, rebuilt after every rewrite.
//! - **Aliasing Guard** ([`guard`]) — refuses blocks where a store
//!   destination is written twice.
//! - **Region Segmenter** ([`segment_block`]) — call-free [`Run`]s.
//! - **Candidate Collector** ([`collect_group`]) — the additions of a run and
//!   the anchor they are fused at.
//! - **Vector Synthesizer** ([`synthesize`]) and **Use Rewiring**
//!   ([`rewire_lanes`]) — build the vector add and redirect every use.
//! - **Entry points** ([`vectorize_function`], [`run_on_function`],
//!   [`vectorize_module`]) configured by [`VectorizeConfig`].
//!
//! # Crate Dependencies
//!
//! `fuse_vec` depends only on `fuse_ir` for the IR it mutates. It never
//! initializes logging; it emits `tracing` events and leaves subscriber
//! setup to the driver.

mod collect;
mod config;
pub mod guard;
mod pass;
mod position;
mod rewire;
mod segment;
mod synth;

#[cfg(test)]
mod test_helpers;

pub use collect::{collect_group, first_early_use, EarlyUse, FusionGroup, FusionLane};
pub use config::{AbortPolicy, GuardScope, VectorizeConfig};
pub use guard::UnsafeAliasing;
pub use pass::{
    run_on_function, vectorize_function, vectorize_module, FunctionOutcome, FusionStats,
    ModuleReport, VectorizeError,
};
pub use position::PositionIndex;
pub use rewire::{rewire_lanes, RewireStats};
pub use segment::{segment_block, Run};
pub use synth::synthesize;
