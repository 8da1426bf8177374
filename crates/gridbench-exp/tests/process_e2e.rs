#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use gridbench_core::{BenchError, ConfigurationPoint, Dimension, ErrorInfo};
use gridbench_exp::{
    ArgTemplate, CellFormat, FlagBinding, Harness, InvocationOutcome, Invoke, ProcessInvoker,
    Reporter, SampleExtractor, Sweep, TableLayout, TableWriter, Workload,
};

// Writing a script while another test forks can leave it busy (ETXTBSY).
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

const CPU_STUB: &str = r#"cpu=0
while [ $# -gt 1 ]; do
  case "$1" in
    -ll:cpu) cpu="$2" ;;
  esac
  shift 2
done
echo "x $((cpu * 1000))""#;

fn template() -> ArgTemplate {
    ArgTemplate::new(
        vec![
            FlagBinding::new("requests", "-t"),
            FlagBinding::new("ratio", "-r"),
            FlagBinding::new("cpus", "-ll:cpu"),
        ],
        Vec::new(),
    )
}

fn sweep() -> Sweep {
    Sweep::new(vec![
        Dimension::new("requests", vec![1, 2]),
        Dimension::new("ratio", vec![1, 10]),
        Dimension::new("cpus", vec![2, 3]),
    ])
    .expect("sweep")
}

#[test]
fn stub_workload_sweep_produces_full_table() {
    let _guard = serial();
    let dir = tempfile::tempdir().expect("tmp dir");
    let script = write_script(dir.path(), "messaging", CPU_STUB);
    let workload = Workload::resolve(&script).expect("resolve");
    let harness = Harness::new(
        ProcessInvoker::new(workload, template()),
        SampleExtractor::new(0, 1),
        2,
    );
    let sweep = sweep();
    let layout = TableLayout {
        rows: vec!["requests".into(), "ratio".into()],
        column: "cpus".into(),
    };
    let format = CellFormat {
        scale: 1.0,
        width: 5,
        decimals: 0,
    };
    let reporter = Reporter::new(&sweep, &layout, format).expect("reporter");

    let mut writer = TableWriter::new(&reporter, Vec::new());
    let outcome = harness
        .run_sweep(&sweep, |result| {
            writer
                .push(result)
                .map_err(|err| BenchError::Io(ErrorInfo::new("table_write", err.to_string())))
        })
        .expect("sweep");
    let streamed = String::from_utf8(writer.finish().expect("finish")).expect("utf8");

    assert_eq!(outcome.results.len(), 8);
    assert_eq!(outcome.total_trials, 16);
    assert_eq!(outcome.failed_trials, 0);
    for result in &outcome.results {
        let cpu = result.point.get("cpus").expect("cpus");
        assert_eq!(result.valid, 2);
        assert_eq!(result.mean, Some((cpu * 1000) as f64));
    }

    let sections = reporter.sections(&outcome.results);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].rows.len(), 4);
    assert!(sections[0].rows.iter().all(|row| row.cells.len() == 2));

    let expected = concat!(
        "requests ratio      2     3\n",
        "       1     1   2000  3000\n",
        "       1    10   2000  3000\n",
        "       2     1   2000  3000\n",
        "       2    10   2000  3000\n",
        "\n\n",
    );
    assert_eq!(reporter.render(&outcome.results), expected);
    assert_eq!(streamed, expected);
}

#[test]
fn failing_workload_is_absorbed_as_no_data() {
    let _guard = serial();
    let dir = tempfile::tempdir().expect("tmp dir");
    let script = write_script(dir.path(), "broken", "echo 'x 12'\nexit 3");
    let invoker = ProcessInvoker::new(Workload::resolve(&script).expect("resolve"), template());
    let point = ConfigurationPoint::new(vec![("cpus".into(), 2)]);
    assert_eq!(
        invoker.invoke(&point).outcome,
        InvocationOutcome::Exited(3)
    );

    let harness = Harness::new(invoker, SampleExtractor::default(), 3);
    let result = harness.measure(&point).expect("measure");
    assert_eq!(result.attempted, 3);
    assert_eq!(result.valid, 0);
    assert_eq!(result.mean, None);
}

#[test]
fn arguments_are_passed_without_a_shell() {
    let _guard = serial();
    let dir = tempfile::tempdir().expect("tmp dir");
    let script = write_script(dir.path(), "echo_args", r#"echo "argc $#"; echo "$@""#);
    let template = ArgTemplate::new(
        vec![FlagBinding::new("users", "-n"), FlagBinding::new("cpus", "-ll:cpu")],
        Vec::new(),
    );
    let invoker = ProcessInvoker::new(Workload::resolve(&script).expect("resolve"), template);
    let point = ConfigurationPoint::new(vec![("users".into(), 5), ("cpus".into(), -1)]);
    let invocation = invoker.invoke(&point);
    assert_eq!(invocation.outcome, InvocationOutcome::Exited(0));
    assert_eq!(invocation.stdout, "argc 4\n-n 5 -ll:cpu -1\n");
    assert_eq!(
        SampleExtractor::new(0, 1).extract(&invocation).sample(),
        Some(4.0)
    );
}

#[test]
fn stderr_is_captured_separately() {
    let _guard = serial();
    let dir = tempfile::tempdir().expect("tmp dir");
    let script = write_script(dir.path(), "noisy", "echo 'warming up' >&2\necho 'Time: 77 ns'");
    let invoker = ProcessInvoker::new(Workload::resolve(&script).expect("resolve"), template());
    let invocation = invoker.invoke(&ConfigurationPoint::default());
    assert_eq!(invocation.stderr, "warming up\n");
    assert_eq!(
        SampleExtractor::default().extract(&invocation).sample(),
        Some(77.0)
    );
}

#[test]
fn slow_trial_times_out_as_invalid() {
    let _guard = serial();
    let dir = tempfile::tempdir().expect("tmp dir");
    let script = write_script(dir.path(), "slow", "sleep 5\necho 'x 1'");
    let invoker = ProcessInvoker::new(Workload::resolve(&script).expect("resolve"), template())
        .with_timeout(Some(Duration::from_millis(200)));
    let harness = Harness::new(invoker, SampleExtractor::default(), 1);
    let result = harness
        .measure(&ConfigurationPoint::default())
        .expect("measure");
    assert_eq!(result.valid, 0);
    assert!(!result.has_data());
}

#[test]
fn background_child_holding_stdout_still_times_out() {
    let _guard = serial();
    let dir = tempfile::tempdir().expect("tmp dir");
    let script = write_script(dir.path(), "detached", "echo 'x 1'\nsleep 3 &\nexit 0");
    let invoker = ProcessInvoker::new(Workload::resolve(&script).expect("resolve"), template())
        .with_timeout(Some(Duration::from_millis(200)));
    let started = Instant::now();
    let invocation = invoker.invoke(&ConfigurationPoint::default());
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "took {:?}",
        started.elapsed()
    );
    assert_eq!(invocation.outcome, InvocationOutcome::TimedOut);
    assert!(!SampleExtractor::default().extract(&invocation).is_valid());
}

#[test]
fn missing_or_non_executable_workload_is_fatal() {
    let _guard = serial();
    let dir = tempfile::tempdir().expect("tmp dir");
    let missing = Workload::resolve(dir.path().join("absent")).expect_err("missing");
    assert!(matches!(missing, BenchError::Workload(ref info) if info.code == "workload_missing"));

    let plain = dir.path().join("plain");
    fs::write(&plain, "echo hi").expect("write");
    fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).expect("chmod");
    let err = Workload::resolve(&plain).expect_err("not executable");
    assert!(matches!(err, BenchError::Workload(ref info) if info.code == "workload_not_executable"));

    let err = Workload::resolve(dir.path()).expect_err("directory");
    assert!(matches!(err, BenchError::Workload(ref info) if info.code == "workload_not_file"));
}

#[test]
fn workload_removed_after_resolve_is_a_trial_failure() {
    let _guard = serial();
    let dir = tempfile::tempdir().expect("tmp dir");
    let script = write_script(dir.path(), "gone", "echo 'x 1'");
    let invoker = ProcessInvoker::new(Workload::resolve(&script).expect("resolve"), template());
    fs::remove_file(&script).expect("remove");
    let invocation = invoker.invoke(&ConfigurationPoint::default());
    assert!(matches!(invocation.outcome, InvocationOutcome::IoError(_)));
}
