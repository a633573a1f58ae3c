use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::{Config, EncodeQuality};
use crate::directive::{DirectiveOpts, TranscodeDirective};
use crate::error::{VerticutError, VerticutResult};
use crate::geometry::GeometryDescriptor;

/// How often the supervisor polls the child for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle of one transcode job: `Pending -> Running -> {Succeeded, Failed,
/// TimedOut}`. Only the three terminal states appear in a [`JobResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::TimedOut
        )
    }
}

/// One bounded-time invocation of the external transcoder.
#[derive(Clone, Debug)]
pub struct TranscodeJob {
    pub id: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub geometry: GeometryDescriptor,
    /// Hard wall-clock bound; the process is killed when it expires.
    pub timeout: Duration,
    pub thread_cap: u32,
    /// Whether the source has an audio track to carry over.
    pub include_audio: bool,
}

impl TranscodeJob {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        geometry: GeometryDescriptor,
        cfg: &Config,
        include_audio: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            geometry,
            timeout: Duration::from_secs(cfg.job_timeout_seconds),
            thread_cap: cfg.thread_cap,
            include_audio,
        }
    }
}

/// Outcome of one job. `diagnostics` holds the bounded tail of the
/// transcoder's stderr; it is never the full log.
#[derive(Clone, Debug)]
pub struct JobResult {
    pub job_id: String,
    pub state: JobState,
    /// Present only on success.
    pub output_path: Option<PathBuf>,
    pub exit_code: Option<i32>,
    pub diagnostics: String,
    pub elapsed: Duration,
    timeout: Duration,
}

impl JobResult {
    /// Convert a non-success outcome into the matching taxonomy error.
    pub fn ensure_success(self) -> VerticutResult<Self> {
        match self.state {
            JobState::Succeeded => Ok(self),
            JobState::TimedOut => Err(VerticutError::Timeout {
                limit_seconds: self.timeout.as_secs(),
            }),
            JobState::Failed => Err(VerticutError::TranscodeFailed {
                status: self.exit_code,
                diagnostics: self.diagnostics,
            }),
            JobState::Pending | JobState::Running => Err(VerticutError::Other(anyhow::anyhow!(
                "job '{}' reported a non-terminal state (bug)",
                self.job_id
            ))),
        }
    }
}

/// Cooperative cancellation for an in-flight job; checked by the supervisor
/// poll loop and propagated as immediate process termination.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs transcode jobs as supervised external processes.
///
/// Each invocation is a single bounded attempt; retry policy belongs to the
/// caller.
#[derive(Clone, Debug)]
pub struct JobExecutor {
    quality: EncodeQuality,
    blur_passes: u32,
    audio_bitrate_kbps: u32,
    duration_cap_seconds: f64,
    max_diagnostic_bytes: usize,
}

impl JobExecutor {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            quality: cfg.quality,
            blur_passes: cfg.blur_passes,
            audio_bitrate_kbps: cfg.audio_bitrate_kbps,
            duration_cap_seconds: cfg.output_duration_cap_seconds,
            max_diagnostic_bytes: cfg.max_diagnostic_bytes,
        }
    }

    /// Run `job` to a terminal state.
    ///
    /// `Err` is reserved for spawn/infrastructure failures; a transcoder that
    /// ran and failed (or overran its time limit) comes back as `Ok` with the
    /// corresponding terminal [`JobState`].
    pub fn run(&self, job: &TranscodeJob) -> VerticutResult<JobResult> {
        self.run_with_cancel(job, None)
    }

    #[tracing::instrument(skip(self, job, cancel), fields(job = %job.id))]
    pub fn run_with_cancel(
        &self,
        job: &TranscodeJob,
        cancel: Option<&CancelToken>,
    ) -> VerticutResult<JobResult> {
        let opts = DirectiveOpts {
            duration_cap_seconds: self.duration_cap_seconds,
            thread_cap: job.thread_cap,
            quality: self.quality,
            blur_passes: self.blur_passes,
            include_audio: job.include_audio,
            audio_bitrate_kbps: self.audio_bitrate_kbps,
        };
        let directive = TranscodeDirective::build(&job.geometry, opts);
        ensure_parent_dir(&job.output_path)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(directive.to_args(&job.input_path, &job.output_path));

        tracing::debug!(filter = directive.filter_graph(), "spawning transcoder");
        let started = Instant::now();
        let exit = supervise(cmd, job.timeout, self.max_diagnostic_bytes, cancel)?;
        let elapsed = started.elapsed();

        let result = match exit {
            SupervisedExit::Exited {
                status,
                stderr_tail,
            } if status.success() => JobResult {
                job_id: job.id.clone(),
                state: JobState::Succeeded,
                output_path: Some(job.output_path.clone()),
                exit_code: status.code(),
                diagnostics: String::from_utf8_lossy(&stderr_tail).into_owned(),
                elapsed,
                timeout: job.timeout,
            },
            SupervisedExit::Exited {
                status,
                stderr_tail,
            } => JobResult {
                job_id: job.id.clone(),
                state: JobState::Failed,
                output_path: None,
                exit_code: status.code(),
                diagnostics: String::from_utf8_lossy(&stderr_tail).into_owned(),
                elapsed,
                timeout: job.timeout,
            },
            SupervisedExit::TimedOut { stderr_tail } => JobResult {
                job_id: job.id.clone(),
                state: JobState::TimedOut,
                output_path: None,
                exit_code: None,
                diagnostics: String::from_utf8_lossy(&stderr_tail).into_owned(),
                elapsed,
                timeout: job.timeout,
            },
            SupervisedExit::Cancelled { stderr_tail } => JobResult {
                job_id: job.id.clone(),
                state: JobState::Failed,
                output_path: None,
                exit_code: None,
                diagnostics: format!(
                    "cancelled by caller; {}",
                    String::from_utf8_lossy(&stderr_tail).trim()
                ),
                elapsed,
                timeout: job.timeout,
            },
        };

        tracing::info!(state = ?result.state, elapsed_ms = elapsed.as_millis() as u64, "job finished");
        Ok(result)
    }
}

/// How a supervised child process ended.
#[derive(Debug)]
pub(crate) enum SupervisedExit {
    Exited {
        status: std::process::ExitStatus,
        stderr_tail: Vec<u8>,
    },
    TimedOut {
        stderr_tail: Vec<u8>,
    },
    Cancelled {
        stderr_tail: Vec<u8>,
    },
}

/// Spawn `cmd` and wait for exit under a wall-clock bound.
///
/// The child's stderr is drained on a thread into a tail buffer bounded at
/// capture time, so diagnostics can never grow with the transcoder's log
/// volume. On timeout or cancellation the child is killed and reaped before
/// returning.
pub(crate) fn supervise(
    mut cmd: Command,
    timeout: Duration,
    tail_cap: usize,
    cancel: Option<&CancelToken>,
) -> VerticutResult<SupervisedExit> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        VerticutError::Other(anyhow::anyhow!(
            "failed to spawn transcoder (is it installed and on PATH?): {e}"
        ))
    })?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| VerticutError::Other(anyhow::anyhow!("failed to open transcoder stderr")))?;
    let drain = std::thread::spawn(move || read_tail(stderr, tail_cap));

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = drain.join();
                return Err(VerticutError::Other(anyhow::anyhow!(
                    "failed to poll transcoder process: {e}"
                )));
            }
        }

        if cancel.is_some_and(CancelToken::is_cancelled) {
            kill_and_reap(&mut child);
            let tail = join_drain(drain)?;
            return Ok(SupervisedExit::Cancelled { stderr_tail: tail });
        }
        if started.elapsed() >= timeout {
            tracing::warn!(timeout_s = timeout.as_secs_f64(), "transcoder exceeded its time limit, killing");
            kill_and_reap(&mut child);
            let tail = join_drain(drain)?;
            return Ok(SupervisedExit::TimedOut { stderr_tail: tail });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let tail = join_drain(drain)?;
    Ok(SupervisedExit::Exited {
        status,
        stderr_tail: tail,
    })
}

fn kill_and_reap(child: &mut std::process::Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn join_drain(
    drain: std::thread::JoinHandle<std::io::Result<Vec<u8>>>,
) -> VerticutResult<Vec<u8>> {
    drain
        .join()
        .map_err(|_| VerticutError::Other(anyhow::anyhow!("stderr drain thread panicked")))?
        .map_err(|e| VerticutError::Other(anyhow::anyhow!("stderr read failed: {e}")))
}

/// Read everything from `r`, retaining only the last `cap` bytes.
///
/// The transcoder prints the decisive error last, so the tail is the useful
/// part of an unbounded log.
fn read_tail(mut r: impl Read, cap: usize) -> std::io::Result<Vec<u8>> {
    let mut tail = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            return Ok(tail);
        }
        tail.extend_from_slice(&buf[..n]);
        if tail.len() > cap {
            tail.drain(..tail.len() - cap);
        }
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> VerticutResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
