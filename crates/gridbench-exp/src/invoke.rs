use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use gridbench_core::errors::{BenchError, ErrorInfo};
use gridbench_core::{ConfigurationPoint, Constant};
use serde::{Deserialize, Serialize};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Maps one parameter name onto the workload flag that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagBinding {
    pub param: String,
    pub flag: String,
}

impl FlagBinding {
    pub fn new(param: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            flag: flag.into(),
        }
    }
}

/// Deterministic argument-vector builder.
///
/// Bindings are expanded in declaration order; a binding whose parameter is
/// bound neither by the point nor by a constant is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTemplate {
    bindings: Vec<FlagBinding>,
    constants: Vec<Constant>,
}

impl ArgTemplate {
    pub fn new(bindings: Vec<FlagBinding>, constants: Vec<Constant>) -> Self {
        Self {
            bindings,
            constants,
        }
    }

    /// Returns `true` when a flag is declared for `param`.
    pub fn covers(&self, param: &str) -> bool {
        self.bindings.iter().any(|binding| binding.param == param)
    }

    /// Expands the template for one configuration point.
    pub fn argv(&self, point: &ConfigurationPoint) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.bindings.len() * 2);
        for binding in &self.bindings {
            let value = point.get(&binding.param).or_else(|| {
                self.constants
                    .iter()
                    .find(|constant| constant.name == binding.param)
                    .map(|constant| constant.value)
            });
            if let Some(value) = value {
                argv.push(binding.flag.clone());
                argv.push(value.to_string());
            }
        }
        argv
    }
}

/// Path to an executable workload that passed the pre-flight checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    path: PathBuf,
}

impl Workload {
    /// Checks that `path` names an existing, executable regular file.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, BenchError> {
        let path = path.as_ref();
        let failure = |code: &str, message: &str| {
            BenchError::Workload(
                ErrorInfo::new(code, message).with_context("path", path.display().to_string()),
            )
        };
        let metadata = fs::metadata(path).map_err(|err| {
            BenchError::Workload(
                ErrorInfo::new("workload_missing", err.to_string())
                    .with_context("path", path.display().to_string())
                    .with_hint("build the workload or pass --workload"),
            )
        })?;
        if !metadata.is_file() {
            return Err(failure("workload_not_file", "workload is not a regular file"));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 == 0 {
                return Err(failure(
                    "workload_not_executable",
                    "workload lacks execute permission",
                ));
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// How a single child process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvocationOutcome {
    /// Child exited with the given status code.
    Exited(i32),
    /// Child was terminated by a signal.
    Signaled,
    /// Child exceeded the per-trial timeout and was killed.
    TimedOut,
    /// Spawning or talking to the child failed.
    IoError(String),
}

/// Raw, uninterpreted result of one workload launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub stdout: String,
    pub stderr: String,
    pub outcome: InvocationOutcome,
}

impl Invocation {
    /// A child that exited with `code` after printing `stdout`.
    pub fn exited(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            outcome: InvocationOutcome::Exited(code),
        }
    }

    fn failed(outcome: InvocationOutcome) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            outcome,
        }
    }
}

/// Launches one trial for a configuration point.
///
/// Implementations never fail: launch problems are reported through
/// [`InvocationOutcome`].
pub trait Invoke {
    fn invoke(&self, point: &ConfigurationPoint) -> Invocation;
}

impl<F> Invoke for F
where
    F: Fn(&ConfigurationPoint) -> Invocation,
{
    fn invoke(&self, point: &ConfigurationPoint) -> Invocation {
        self(point)
    }
}

/// Runs the workload as a child process, one blocking launch per call.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    workload: Workload,
    template: ArgTemplate,
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    pub fn new(workload: Workload, template: ArgTemplate) -> Self {
        Self {
            workload,
            template,
            timeout: None,
        }
    }

    /// Kills and invalidates trials that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn template(&self) -> &ArgTemplate {
        &self.template
    }

    fn launch(&self, argv: &[String]) -> Invocation {
        let spawned = Command::new(self.workload.path())
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => return Invocation::failed(InvocationOutcome::IoError(err.to_string())),
        };
        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let outcome = match deadline {
            Some(deadline) => wait_until(&mut child, deadline),
            None => match child.wait() {
                Ok(status) => outcome_from_status(status),
                Err(err) => InvocationOutcome::IoError(err.to_string()),
            },
        };
        if outcome == InvocationOutcome::TimedOut {
            return Invocation::failed(outcome);
        }

        // The pipes stay open while any grandchild holds them, so draining
        // shares the deadline with the wait.
        let (stdout, stderr) = match (collect(stdout, deadline), collect(stderr, deadline)) {
            (Drained::Expired, _) | (_, Drained::Expired) => {
                debug!("workload output still open at the deadline");
                return Invocation::failed(InvocationOutcome::TimedOut);
            }
            (Drained::Failed(err), _) => return Invocation::failed(InvocationOutcome::IoError(err)),
            (Drained::Bytes(stdout), Drained::Bytes(stderr)) => (stdout, stderr),
            (Drained::Bytes(stdout), Drained::Failed(_)) => (stdout, String::new()),
        };
        Invocation {
            stdout,
            stderr,
            outcome,
        }
    }
}

impl Invoke for ProcessInvoker {
    fn invoke(&self, point: &ConfigurationPoint) -> Invocation {
        let argv = self.template.argv(point);
        debug!(workload = %self.workload.path().display(), argv = ?argv, "launching workload");
        let invocation = self.launch(&argv);
        if !invocation.stderr.trim().is_empty() {
            debug!(stderr = %invocation.stderr.trim_end(), "workload stderr");
        }
        invocation
    }
}

type Reader = Option<Receiver<io::Result<Vec<u8>>>>;

enum Drained {
    Bytes(String),
    Failed(String),
    Expired,
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Reader {
    stream.map(|mut stream| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let read = stream.read_to_end(&mut buf).map(|_| buf);
            // The receiver is gone once the trial has timed out.
            let _ = tx.send(read);
        });
        rx
    })
}

fn collect(reader: Reader, deadline: Option<Instant>) -> Drained {
    let Some(rx) = reader else {
        return Drained::Bytes(String::new());
    };
    let received = match deadline {
        Some(deadline) => {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(read) => read,
                Err(RecvTimeoutError::Timeout) => return Drained::Expired,
                Err(RecvTimeoutError::Disconnected) => {
                    return Drained::Failed("output reader stopped".to_string())
                }
            }
        }
        None => match rx.recv() {
            Ok(read) => read,
            Err(_) => return Drained::Failed("output reader stopped".to_string()),
        },
    };
    match received {
        Ok(bytes) => Drained::Bytes(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) => Drained::Failed(err.to_string()),
    }
}

fn wait_until(child: &mut Child, deadline: Instant) -> InvocationOutcome {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return outcome_from_status(status),
            Ok(None) => {
                let now = Instant::now();
                if now >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return InvocationOutcome::TimedOut;
                }
                thread::sleep(POLL_INTERVAL.min(deadline - now));
            }
            Err(err) => return InvocationOutcome::IoError(err.to_string()),
        }
    }
}

fn outcome_from_status(status: ExitStatus) -> InvocationOutcome {
    match status.code() {
        Some(code) => InvocationOutcome::Exited(code),
        None => InvocationOutcome::Signaled,
    }
}
