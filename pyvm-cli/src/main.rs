//! pyvm CLI: assemble, check and run instruction listings.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input/assembly error
//! - 2: Validation failure
//! - 3: Runtime error

mod commands;

use std::process;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a stderr subscriber filtered by `RUST_LOG`, only when it is set.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "run" => commands::run(&args[2..]),
        "check" => commands::check(&args[2..]),
        "disassemble" => commands::disassemble(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

fn print_usage() {
    eprintln!("Usage: pyvm <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run [FILE|-] [--locals] [--max-depth N] [--no-check]");
    eprintln!("                               Assemble, validate and execute a listing");
    eprintln!("  check <FILE>                 Assemble and validate a listing");
    eprintln!("  disassemble <FILE>           Print a listing in canonical form");
    eprintln!();
    eprintln!("`run` reads standard input when FILE is omitted or '-'.");
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=pyvm_vm=trace) to log execution to stderr.");
}
