//! Add-fusion autovectorizer CLI.

use std::path::Path;

use fusec::{compile_file, init_tracing, parse_options, render_report};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        std::process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let options = parse_options(&args[2..]);

    match compile_file(Path::new(&args[1]), &options) {
        Ok(output) => {
            print!("{}", output.ir);
            if options.stats {
                eprint!("{}", render_report(&output.report));
            } else {
                for outcome in output.report.aborted() {
                    if let Err(err) = &outcome.result {
                        eprintln!("warning: @{} left unchanged: {err}", outcome.function);
                    }
                }
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: fusec <file.fir> [options]");
    eprintln!();
    eprintln!("Fuses scalar i32 additions in each basic block into one vector add");
    eprintln!("and prints the transformed functions.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --max-width=<n>         Cap vector width at n lanes (0 = unbounded)");
    eprintln!("  --flush-trailing        Also fuse a run not closed by a call");
    eprintln!("  --no-duplicate-stores   Do not re-emit stores whose value was rewired");
    eprintln!("  --allow-early-uses      Fuse even when a sum is used before the last add");
    eprintln!("  --guard=<scope>         Aliasing guard scope: block (default), function");
    eprintln!("  --rollback              Restore a function when the guard aborts");
    eprintln!("  --verify                Verify every function after the pass");
    eprintln!("  --stats                 Print per-function statistics to stderr");
    eprintln!();
    eprintln!("Set RUST_LOG=fuse_vec=debug for pass decisions, =trace for IR dumps.");
}
