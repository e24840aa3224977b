//! Command-line options.

use std::num::NonZeroU32;

use fuse_vec::{AbortPolicy, GuardScope, VectorizeConfig};

/// Options for one `fusec` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config: VectorizeConfig,
    /// Run the IR verifier on every function after the pass.
    pub verify: bool,
    /// Print per-function statistics to stderr.
    pub stats: bool,
}

/// Parse the flags following the input file.
///
/// Unknown flags and malformed values produce a warning and are otherwise
/// ignored.
pub fn parse_options(args: &[String]) -> CliOptions {
    let mut options = CliOptions::default();

    for arg in args {
        if let Some(width) = arg.strip_prefix("--max-width=") {
            if let Ok(n) = width.parse::<u32>() {
                // 0 lifts the cap.
                options.config.max_width = NonZeroU32::new(n);
            } else {
                eprintln!("warning: invalid max width '{width}', ignoring");
            }
        } else if arg == "--flush-trailing" {
            options.config.flush_trailing_run = true;
        } else if arg == "--no-duplicate-stores" {
            options.config.duplicate_stores = false;
        } else if arg == "--allow-early-uses" {
            options.config.require_uses_after_anchor = false;
        } else if let Some(scope) = arg.strip_prefix("--guard=") {
            match scope {
                "block" => options.config.guard_scope = GuardScope::PerBlock,
                "function" => options.config.guard_scope = GuardScope::Function,
                _ => eprintln!("warning: unknown guard scope '{scope}', options: block, function"),
            }
        } else if arg == "--rollback" {
            options.config.on_abort = AbortPolicy::Rollback;
        } else if arg == "--verify" {
            options.verify = true;
        } else if arg == "--stats" {
            options.stats = true;
        } else {
            eprintln!("warning: unknown option '{arg}'");
        }
    }

    options
}
