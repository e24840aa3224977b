//! Load, vectorize, verify and print a `.fir` module.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use fuse_ir::{parse_module, verify, VerifyError};
use fuse_vec::{vectorize_module, ModuleReport};

use crate::options::CliOptions;

/// Why a file could not be processed.
#[derive(Debug)]
pub enum DriverError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        line: usize,
        col: usize,
        message: String,
    },
    /// The verifier rejected a function after the pass.
    Verify {
        function: String,
        errors: Vec<VerifyError>,
    },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io { path, source } => {
                write!(f, "cannot read '{}': {source}", path.display())
            }
            DriverError::Parse { line, col, message } => write!(f, "{line}:{col}: {message}"),
            DriverError::Verify { function, errors } => {
                write!(f, "@{function} fails verification:")?;
                for err in errors {
                    write!(f, "\n  {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Io { source, .. } => Some(source),
            DriverError::Parse { .. } | DriverError::Verify { .. } => None,
        }
    }
}

/// The transformed module and what the pass did to it.
#[derive(Debug)]
pub struct Output {
    /// Every function, printed in input order.
    pub ir: String,
    pub report: ModuleReport,
}

/// Vectorize every function of `source`.
pub fn process_source(source: &str, options: &CliOptions) -> Result<Output, DriverError> {
    let mut funcs = parse_module(source).map_err(|err| {
        let (line, col) = err.line_col(source);
        DriverError::Parse {
            line,
            col,
            message: err.message,
        }
    })?;
    tracing::debug!(functions = funcs.len(), "parsed module");

    let report = vectorize_module(&mut funcs, &options.config);

    if options.verify {
        for func in &funcs {
            verify(func).map_err(|errors| DriverError::Verify {
                function: func.name().to_owned(),
                errors,
            })?;
        }
    }

    let ir = funcs.iter().map(ToString::to_string).collect();
    Ok(Output { ir, report })
}

/// Read `path` and vectorize it.
pub fn compile_file(path: &Path, options: &CliOptions) -> Result<Output, DriverError> {
    let source = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_owned(),
        source,
    })?;
    process_source(&source, options)
}

/// One line per function: its statistics, or why the pass aborted.
pub fn render_report(report: &ModuleReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        // Writing to a String cannot fail.
        let _ = match &outcome.result {
            Ok(stats) => writeln!(out, "@{}: {stats}", outcome.function),
            Err(err) => writeln!(out, "@{}: aborted, {err}", outcome.function),
        };
    }
    let _ = writeln!(out, "total: {}", report.totals());
    out
}
