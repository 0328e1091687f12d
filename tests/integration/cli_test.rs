use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SMALL_TABLE: &str = "\
# 4-difference toy table
blocks 4
0x1 0x2 0.5
0x1 0x3 0.25
0x2 0x1 0.5
0x2 0x3 0.25
0x3 0x3 1.0
";

fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_diffsearch"))
}

fn run(args: &[&str]) -> Output {
    Command::new(get_binary_path())
        .args(args)
        .output()
        .expect("Failed to execute diffsearch")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "Command failed with status: {:?}\nstderr: {}\nstdout: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&output.stdout)
        );
    }
}

fn write_small_table(dir: &Path) -> PathBuf {
    let path = dir.join("small.table");
    fs::write(&path, SMALL_TABLE).unwrap();
    path
}

#[test]
fn test_search_small_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_small_table(dir.path());

    let output = run(&[
        "search",
        "--table",
        table.to_str().unwrap(),
        "--rounds",
        "2",
        "-j",
        "2",
    ]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Best characteristic: a = 0x0003, b = 0x0003, p = 1.00000000"),
        "Should report the fixed point 0x3, got:\n{}",
        stdout
    );
    assert!(stdout.contains("Starting differences: 3"));
}

#[test]
fn test_search_prints_progress_per_start() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_small_table(dir.path());

    let output = Command::new(get_binary_path())
        .args([
            "search",
            "--table",
            table.to_str().unwrap(),
            "-r",
            "2",
            "-j",
            "1",
        ])
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute diffsearch");
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let progress: Vec<_> = stdout.lines().filter(|l| l.contains("i = ")).collect();
    assert_eq!(progress.len(), 3, "one line per start, got:\n{}", stdout);
    assert!(progress[0].starts_with("[worker 0] i = 1, a = 0x0001"));
}

#[test]
fn test_single_lists_ranked_endings() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_small_table(dir.path());

    let output = run(&[
        "single",
        "--table",
        table.to_str().unwrap(),
        "--start",
        "0x1",
        "--rounds",
        "2",
        "--cross-check",
    ]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    // 1 -> 2 -> 1 and 1 -> 3 -> 3 tie at 1/4; the lower difference ranks first
    let first = stdout.find("0x0001 (p = 0.25000000)").unwrap();
    let second = stdout.find("0x0003 (p = 0.25000000)").unwrap();
    assert!(first < second);
    assert!(stdout.contains("Cross-check: all 4 endings match"));
}

#[test]
fn test_build_table_round_trips_through_single() {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("heys.table");

    let output = run(&[
        "build-table",
        "--min-probability",
        "0.1",
        "--output",
        table.to_str().unwrap(),
    ]);
    assert_success(&output);
    assert!(table.exists());
    let contents = fs::read_to_string(&table).unwrap();
    assert!(contents.starts_with("blocks 65536"));

    let output = run(&[
        "single",
        "--table",
        table.to_str().unwrap(),
        "--start",
        "0x0b00",
        "--rounds",
        "1",
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0x0040 (p = 0.50000000)"));
}

#[test]
fn test_rejects_bad_pruning_policy() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_small_table(dir.path());

    let output = run(&[
        "single",
        "--table",
        table.to_str().unwrap(),
        "--start",
        "1",
        "--pruning",
        "threshold:2",
    ]);
    assert!(!output.status.success(), "Out-of-range threshold should fail");
}

#[test]
fn test_rejects_start_outside_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_small_table(dir.path());

    let output = run(&[
        "single",
        "--table",
        table.to_str().unwrap(),
        "--start",
        "0x10",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("outside the 4-difference table"),
        "Should explain the bad start, got:\n{}",
        stderr
    );
}

#[cfg(target_os = "linux")]
#[test]
fn test_build_table_reports_write_failure() {
    if !Path::new("/dev/full").exists() {
        return;
    }
    // A small table fits in the write buffer, so the error only surfaces on flush
    let output = run(&[
        "build-table",
        "--min-probability",
        "0.5",
        "--output",
        "/dev/full",
    ]);
    assert!(!output.status.success(), "Writing to a full device should fail");
}
