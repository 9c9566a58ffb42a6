//! CLI command implementations.

use std::fs;
use std::io::{self, Read};

use pyvm_common::InstructionStream;
use pyvm_vm::{Vm, VmConfig};

/// Options accepted by `run`.
#[derive(Debug, Default)]
struct RunOptions {
    input: Option<String>,
    show_locals: bool,
    no_check: bool,
    max_depth: Option<usize>,
}

fn parse_run_options(args: &[String]) -> Result<RunOptions, i32> {
    let mut options = RunOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--locals" => options.show_locals = true,
            "--no-check" => options.no_check = true,
            "--max-depth" => {
                let value = iter.next().ok_or_else(|| {
                    eprintln!("error: --max-depth requires a value");
                    1
                })?;
                let depth = value.parse::<usize>().map_err(|_| {
                    eprintln!("error: invalid --max-depth '{value}'");
                    1
                })?;
                options.max_depth = Some(depth);
            }
            flag if flag.starts_with("--") => {
                eprintln!("error: unknown option '{flag}'");
                eprintln!("Usage: pyvm run [FILE|-] [--locals] [--max-depth N] [--no-check]");
                return Err(1);
            }
            path => {
                if options.input.is_some() {
                    eprintln!("error: unexpected argument '{path}'");
                    return Err(1);
                }
                options.input = Some(path.to_string());
            }
        }
    }
    Ok(options)
}

/// Read a listing from `input`, or from stdin when it is absent or `-`.
fn read_listing(input: Option<&str>) -> Result<String, i32> {
    match input {
        None | Some("-") => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map_err(|e| {
                eprintln!("error: cannot read stdin: {e}");
                1
            })?;
            Ok(text)
        }
        Some(path) => fs::read_to_string(path).map_err(|e| {
            eprintln!("error: cannot read '{path}': {e}");
            1
        }),
    }
}

fn assemble(text: &str) -> Result<InstructionStream, i32> {
    let stream = pyvm_assembler::assemble(text).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    tracing::debug!(instructions = stream.len(), "assembled listing");
    Ok(stream)
}

fn validate(stream: &InstructionStream) -> Result<(), i32> {
    stream.validate().map_err(|errors| {
        for e in &errors {
            eprintln!("error: {e}");
        }
        2
    })
}

/// Assemble, validate and execute a listing, printing the result's repr.
pub fn run(args: &[String]) -> Result<(), i32> {
    let options = parse_run_options(args)?;
    let text = read_listing(options.input.as_deref())?;
    let stream = assemble(&text)?;
    if !options.no_check {
        validate(&stream)?;
    }

    let mut config = VmConfig::default();
    if let Some(depth) = options.max_depth {
        config = config.with_max_call_depth(depth);
    }
    let vm = Vm::new().with_config(config);
    let mut frame = vm.frame(&stream);

    match frame.eval() {
        Ok(value) => {
            println!("{value}");
            if options.show_locals {
                let mut locals: Vec<_> = frame.locals().iter().collect();
                locals.sort_by(|a, b| a.0.cmp(b.0));
                for (name, value) in locals {
                    println!("{name} = {value}");
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("runtime error: {e}");
            Err(3)
        }
    }
}

/// Assemble and validate a listing.
pub fn check(args: &[String]) -> Result<(), i32> {
    let Some(input) = args.first() else {
        eprintln!("error: check requires an input file");
        eprintln!("Usage: pyvm check <FILE>");
        return Err(1);
    };

    let text = read_listing(Some(input.as_str()))?;
    let stream = assemble(&text)?;
    validate(&stream)?;
    println!("OK: {input} ({} instructions)", stream.len());
    Ok(())
}

/// Print a listing in canonical form.
pub fn disassemble(args: &[String]) -> Result<(), i32> {
    let Some(input) = args.first() else {
        eprintln!("error: disassemble requires an input file");
        eprintln!("Usage: pyvm disassemble <FILE>");
        return Err(1);
    };

    let text = read_listing(Some(input.as_str()))?;
    let stream = assemble(&text)?;
    print!("{}", pyvm_assembler::disassemble(&stream));
    Ok(())
}
