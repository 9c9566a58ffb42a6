//! Integration tests for the pyvm CLI.
//!
//! These tests invoke the `pyvm` binary as a subprocess and check
//! exit codes, stdout, and stderr.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(deprecated)]
fn pyvm() -> Command {
    Command::cargo_bin("pyvm").unwrap()
}

/// Return the workspace root (parent of pyvm-cli/).
fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

/// Return the absolute path to a sample listing.
fn test_program(name: &str) -> PathBuf {
    workspace_root().join("tests/programs").join(name)
}

/// Write a listing into `dir` and return its path.
fn write_listing(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("test.pyasm");
    fs::write(&path, text).unwrap();
    path
}

// ---- No-args / help ----

#[test]
fn no_args_prints_usage_and_exits_1() {
    pyvm()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Usage: pyvm"));
}

#[test]
fn help_flag_exits_0() {
    pyvm()
        .arg("--help")
        .assert()
        .success()
        .stderr(predicate::str::contains("Commands:"));
}

#[test]
fn unknown_command_exits_1() {
    pyvm()
        .arg("frobnicate")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown command"));
}

// ---- Run ----

#[test]
fn run_hello_world() {
    pyvm()
        .args(["run", test_program("hello.pyasm").to_str().unwrap()])
        .assert()
        .success()
        .stdout("Hello, world!\nNone\n");
}

#[test]
fn run_prints_result_repr() {
    let dir = TempDir::new().unwrap();
    let path = write_listing(&dir, "LOAD_CONST 'hoge'\nRETURN_VALUE\n");
    pyvm()
        .args(["run", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout("'hoge'\n");
}

#[test]
fn run_with_locals() {
    pyvm()
        .args([
            "run",
            test_program("while_loop.pyasm").to_str().unwrap(),
            "--locals",
        ])
        .assert()
        .success()
        .stdout("None\ni = 0\n");
}

#[test]
fn run_locals_are_sorted() {
    let dir = TempDir::new().unwrap();
    let path = write_listing(
        &dir,
        "LOAD_CONST 2\nSTORE_NAME b\nLOAD_CONST 1.5\nSTORE_NAME a\n",
    );
    pyvm()
        .args(["run", "--locals", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout("None\na = 1.5\nb = 2\n");
}

#[test]
fn run_reads_stdin() {
    pyvm()
        .arg("run")
        .write_stdin("LOAD_CONST 40\nLOAD_CONST 2\nBINARY_ADD\nRETURN_VALUE\n")
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn run_reads_stdin_with_dash() {
    pyvm()
        .args(["run", "-"])
        .write_stdin("LOAD_CONST (1,)\nRETURN_VALUE\n")
        .assert()
        .success()
        .stdout("(1,)\n");
}

#[test]
fn run_factorial() {
    pyvm()
        .args(["run", test_program("factorial.pyasm").to_str().unwrap()])
        .assert()
        .success()
        .stdout("3628800\n");
}

#[test]
fn run_max_depth_limits_recursion() {
    pyvm()
        .args([
            "run",
            test_program("factorial.pyasm").to_str().unwrap(),
            "--max-depth",
            "5",
        ])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("maximum call depth 5 exceeded"));
}

#[test]
fn run_unsupported_opcode_exits_3() {
    pyvm()
        .args(["run", test_program("unsupported.pyasm").to_str().unwrap()])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("unsupported opcode COMPARE_OP"));
}

#[test]
fn run_unbound_name_exits_3() {
    pyvm()
        .arg("run")
        .write_stdin("LOAD_NAME nowhere\nRETURN_VALUE\n")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("name 'nowhere' is not defined"));
}

#[test]
fn run_bad_jump_fails_validation() {
    pyvm()
        .args(["run", test_program("bad_jump.pyasm").to_str().unwrap()])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("not an instruction boundary"));
}

#[test]
fn run_no_check_defers_to_runtime() {
    pyvm()
        .args([
            "run",
            test_program("bad_jump.pyasm").to_str().unwrap(),
            "--no-check",
        ])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("runtime error"));
}

#[test]
fn run_syntax_error_exits_1() {
    pyvm()
        .args(["run", test_program("syntax_error.pyasm").to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("line 2: unknown opcode 'LOAD_KONST'"));
}

#[test]
fn run_missing_file_exits_1() {
    pyvm()
        .args(["run", "/nonexistent/listing.pyasm"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn run_invalid_max_depth_exits_1() {
    pyvm()
        .args(["run", "--max-depth", "deep"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid --max-depth"));
}

// ---- Check ----

#[test]
fn check_valid_listing() {
    pyvm()
        .args(["check", test_program("while_loop.pyasm").to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK:").and(predicate::str::contains("13 instructions")));
}

#[test]
fn check_accepts_unimplemented_opcodes() {
    pyvm()
        .args(["check", test_program("unsupported.pyasm").to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn check_bad_jump_exits_2() {
    pyvm()
        .args(["check", test_program("bad_jump.pyasm").to_str().unwrap()])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn check_requires_file() {
    pyvm()
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("requires an input file"));
}

// ---- Disassemble ----

#[test]
fn disassemble_canonicalizes() {
    let dir = TempDir::new().unwrap();
    let path = write_listing(
        &dir,
        "; comment\nload_const 1   ; one\n\nreturn_value\n",
    );
    pyvm()
        .args(["disassemble", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout("0 LOAD_CONST 1\n2 RETURN_VALUE\n");
}

#[test]
fn disassemble_output_runs_identically() {
    let output = pyvm()
        .args(["disassemble", test_program("factorial.pyasm").to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let canonical = String::from_utf8(output.stdout).unwrap();
    assert!(canonical.starts_with(".func fact self n\n"));

    pyvm()
        .arg("run")
        .write_stdin(canonical)
        .assert()
        .success()
        .stdout("3628800\n");
}

#[test]
fn disassemble_syntax_error_exits_1() {
    pyvm()
        .args(["disassemble", test_program("syntax_error.pyasm").to_str().unwrap()])
        .assert()
        .failure()
        .code(1);
}

// ---- Logging ----

#[test]
fn rust_log_traces_to_stderr_only() {
    pyvm()
        .args(["run", test_program("while_loop.pyasm").to_str().unwrap()])
        .env("RUST_LOG", "pyvm_vm=trace")
        .assert()
        .success()
        .stdout("None\n")
        .stderr(predicate::str::contains("dispatch"));
}
