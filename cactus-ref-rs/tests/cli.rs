/// End-to-end runs of the cactus-ref-rs binary on small thread and pinch tables.
///
/// Inputs are written to the system temp directory under a per-test name, so
/// the tests can run in parallel.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// ── helpers ──────────────────────────────────────────────────────────────────

fn cactus_ref_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cactus-ref-rs"))
}

fn scratch(test: &str, file: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cactus-ref-rs-{}-{}", test, std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    let path = dir.join(file);
    fs::write(&path, contents).expect("write scratch file");
    path
}

const THREADS: &str = "# name\tstart\tlength\n1\t0\t50\n2\t0\t200\n";

fn run(pinches: &Path, threads: &Path, extra: &[&str]) -> Output {
    Command::new(cactus_ref_bin())
        .arg(pinches)
        .arg("-t")
        .arg(threads)
        .arg("-q")
        .args(extra)
        .output()
        .expect("failed to spawn cactus-ref-rs")
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[test]
fn reverse_pinch_writes_one_block() {
    let threads = scratch("reverse", "threads.tsv", THREADS);
    let pinches = scratch("reverse", "pinches.tsv", "1\t10\t2\t100\t5\t-\n");
    let output = run(&pinches, &threads, &[]);
    assert!(output.status.success(), "cactus-ref-rs exited with {}", output.status);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "0\t5\t1\t10\t+\n0\t5\t2\t100\t-\n"
    );
}

#[test]
fn block_table_goes_to_out_file() {
    let threads = scratch("out", "threads.tsv", THREADS);
    let pinches = scratch(
        "out",
        "pinches.tsv",
        "# name1\tstart1\tname2\tstart2\tlength\tstrand\n1\t10\t2\t20\t5\t+\n1\t15\t2\t25\t5\t+\n",
    );
    let out = threads.with_file_name("blocks.tsv");
    let output = run(&pinches, &threads, &["-o", out.to_str().unwrap()]);
    assert!(output.status.success(), "cactus-ref-rs exited with {}", output.status);
    assert!(output.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "0\t10\t1\t10\t+\n0\t10\t2\t20\t+\n"
    );
}

#[test]
fn restricted_run_skips_unrelated_threads() {
    // Two untouched threads start out in different adjacency components.
    let threads = scratch("restricted", "threads.tsv", THREADS);
    let pinches = scratch("restricted", "pinches.tsv", "1\t10\t2\t20\t5\t+\n");
    let output = run(&pinches, &threads, &["--restrict-to-components"]);
    assert!(output.status.success(), "cactus-ref-rs exited with {}", output.status);
    assert!(output.stdout.is_empty());
}

#[test]
fn pinch_touching_a_thread_end_fails() {
    let threads = scratch("bounds", "threads.tsv", THREADS);
    let pinches = scratch("bounds", "pinches.tsv", "1\t0\t2\t20\t5\t+\n");
    let output = run(&pinches, &threads, &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("strictly inside"));
}

#[test]
fn malformed_pinch_line_fails() {
    let threads = scratch("malformed", "threads.tsv", THREADS);
    let pinches = scratch("malformed", "pinches.tsv", "1\t10\t2\t20\t5\n");
    let output = run(&pinches, &threads, &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("pinch line 1"));
}
