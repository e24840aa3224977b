//! Shared test utilities for the pass modules.
//!
//! Functions are written in the textual IR and parsed, which keeps each
//! test's input readable next to its assertions. Only compiled in test
//! builds.

use fuse_ir::{parse_function, BlockId, Function, InstId};

/// Parse a single-function source, panicking on syntax errors.
pub(crate) fn func(source: &str) -> Function {
    parse_function(source).unwrap_or_else(|e| panic!("test IR does not parse: {e}"))
}

/// Shorthand for `BlockId::new(n)`.
pub(crate) fn b(n: u32) -> BlockId {
    BlockId::new(n)
}

/// The instruction at `pos` in `block`.
pub(crate) fn at(func: &Function, block: BlockId, pos: usize) -> InstId {
    func.block(block).insts()[pos]
}

/// The block `[add a,b -> t1; add c,d -> t2; store t1 -> p; store t2 -> q; call f()]`.
pub(crate) const TWO_ADDS: &str = "\
fn @two_adds(%a: i32, %b: i32, %c: i32, %d: i32, %p: ptr, %q: ptr) {
entry:
  %t1 = add i32 %a, %b
  %t2 = add i32 %c, %d
  store %t1, %p
  store %t2, %q
  call void @f()
  ret
}
";
