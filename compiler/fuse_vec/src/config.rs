//! Pass configuration.

use std::num::NonZeroU32;

/// When the aliasing guard inspects a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GuardScope {
    /// Guard each block just before it is rewritten. Blocks processed
    /// earlier keep their rewrites when a later block trips the guard.
    #[default]
    PerBlock,
    /// Guard every block of the function before rewriting any of them.
    Function,
}

/// What happens to already-rewritten blocks when the guard aborts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum AbortPolicy {
    /// Leave earlier rewrites in place.
    #[default]
    KeepPartial,
    /// Restore the function to its state before the pass started.
    Rollback,
}

/// Add-fusion pass configuration.
///
/// The defaults reproduce the reference behavior of the pass exactly,
/// with one safety check added (`require_uses_after_anchor`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorizeConfig {
    /// Maximum lanes per vector add. Longer groups are split into chunks.
    /// `None` fuses a whole group into one vector, however wide.
    pub max_width: Option<NonZeroU32>,

    /// Fuse a run still open at the end of its block. Off by default: only
    /// runs closed by a call are fused.
    pub flush_trailing_run: bool,

    /// After rewiring a store, emit a second store of the same value to the
    /// same destination. On by default.
    pub duplicate_stores: bool,

    /// Reject a group when one of its additions is used at or before the
    /// anchor, which would otherwise produce a use before definition.
    pub require_uses_after_anchor: bool,

    pub guard_scope: GuardScope,

    pub on_abort: AbortPolicy,
}

impl Default for VectorizeConfig {
    fn default() -> Self {
        Self {
            max_width: None,
            flush_trailing_run: false,
            duplicate_stores: true,
            require_uses_after_anchor: true,
            guard_scope: GuardScope::PerBlock,
            on_abort: AbortPolicy::KeepPartial,
        }
    }
}

impl VectorizeConfig {
    /// Create a config capping vectors at `max_width` lanes (`0` = unbounded).
    pub fn with_max_width(max_width: u32) -> Self {
        Self {
            max_width: NonZeroU32::new(max_width),
            ..Default::default()
        }
    }

    /// Lanes per chunk for a group of `group_len` additions. Never zero.
    #[inline]
    pub fn chunk_len(&self, group_len: usize) -> usize {
        let len = match self.max_width {
            Some(cap) => usize::try_from(cap.get()).map_or(group_len, |cap| cap.min(group_len)),
            None => group_len,
        };
        len.max(1)
    }
}
