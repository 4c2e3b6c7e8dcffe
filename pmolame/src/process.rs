//! One LAME subprocess and the state machine that follows it.
//!
//! [`LameSession::start`] spawns the codec and hands its output to reader
//! tasks. Every line they see, every stdio failure and the final exit status
//! is funneled into a single supervisor task that owns a [`SessionMachine`].
//! The machine publishes [`LameStatus`] and [`SessionPhase`] through `watch`
//! channels and emits [`LameEvent`]s; at most one terminal event is ever
//! sent, after which the event senders are dropped.

use std::{
    ffi::OsString,
    io,
    path::PathBuf,
    process::Stdio,
    sync::Arc,
};

use bytes::BytesMut;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, ChildStdin, ChildStdout, Command},
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    binary,
    error::LameError,
    options::LameOptions,
    progress::{classify, LameMode, LineClass},
};

const FINAL_ETA: &str = "00:00";
const READ_CHUNK: usize = 4096;

/// Snapshot of a running (or finished) conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LameStatus {
    pub started: bool,
    pub finished: bool,
    /// 0..=100, never decreasing within one session.
    pub progress: u8,
    pub eta: Option<String>,
}

#[derive(Debug, Clone)]
pub enum LameEvent {
    Progress { percent: u8, eta: Option<String> },
    Finish,
    Error(LameError),
}

impl LameEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LameEvent::Finish | LameEvent::Error(_))
    }
}

#[derive(Debug, Clone, Default)]
pub enum SessionPhase {
    #[default]
    NotStarted,
    Running,
    Succeeded,
    Failed(LameError),
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Succeeded | SessionPhase::Failed(_))
    }
}

/// Subscribers of a session's events.
pub type EventSink = Vec<mpsc::UnboundedSender<LameEvent>>;

/// Builds the argument vector: input, output, validated option tokens,
/// `--decode` for decoding, then `--disptime N` unless the options already
/// decided about progress output or `default_disptime` is zero.
pub fn build_spawn_args(
    options: &LameOptions,
    mode: LameMode,
    input: impl Into<OsString>,
    output: impl Into<OsString>,
    default_disptime: u64,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![input.into(), output.into()];
    args.extend(options.arguments().iter().map(OsString::from));

    if mode == LameMode::Decode {
        args.push("--decode".into());
    }

    let already_set = options.arguments().iter().any(|arg| arg == "--disptime");
    if options.should_use_default_disptime() && !already_set && default_disptime > 0 {
        args.push("--disptime".into());
        args.push(default_disptime.to_string().into());
    }

    args
}

/// Everything needed to spawn one codec run.
#[derive(Debug, Clone)]
pub struct LameInvocation {
    pub executable: PathBuf,
    pub args: Vec<OsString>,
    pub library_dir: Option<PathBuf>,
    pub mode: LameMode,
    /// Stream mode: stdin is piped and stdout is returned raw instead of
    /// being scanned for progress. The process is killed on the first error.
    pub streaming: bool,
}

/// Pipes handed back to the caller in stream mode.
#[derive(Debug, Default)]
pub struct SessionPipes {
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub(crate) reporter: Option<SignalReporter>,
}

/// Lets the pipe owner report its own I/O failures to the supervisor.
#[derive(Debug, Clone)]
pub(crate) struct SignalReporter(mpsc::UnboundedSender<ProcessSignal>);

impl SignalReporter {
    pub(crate) fn report(&self, error: LameError) {
        let _ = self.0.send(ProcessSignal::Failure(error));
    }
}

#[derive(Debug)]
pub(crate) enum ProcessSignal {
    Line(String),
    Failure(LameError),
    Closed,
}

/// Pure transition logic of a session.
#[derive(Debug)]
pub(crate) struct SessionMachine {
    mode: LameMode,
    executable: PathBuf,
    status: watch::Sender<LameStatus>,
    phase: watch::Sender<SessionPhase>,
    events: EventSink,
}

impl SessionMachine {
    pub(crate) fn new(
        mode: LameMode,
        executable: PathBuf,
        events: EventSink,
    ) -> (Self, watch::Receiver<LameStatus>, watch::Receiver<SessionPhase>) {
        let (status, status_rx) = watch::channel(LameStatus::default());
        let (phase, phase_rx) = watch::channel(SessionPhase::NotStarted);
        (
            Self {
                mode,
                executable,
                status,
                phase,
                events,
            },
            status_rx,
            phase_rx,
        )
    }

    pub(crate) fn start(&mut self) {
        self.status.send_replace(LameStatus {
            started: true,
            finished: false,
            progress: 0,
            eta: None,
        });
        self.phase.send_replace(SessionPhase::Running);
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.phase.borrow().is_terminal()
    }

    pub(crate) fn is_failed(&self) -> bool {
        matches!(*self.phase.borrow(), SessionPhase::Failed(_))
    }

    pub(crate) fn on_line(&mut self, line: &str) {
        match classify(line, self.mode) {
            LineClass::Progress { percent, eta } => self.on_progress(percent, eta),
            LineClass::Complete => self.finish(),
            LineClass::Warning(message) => self.fail(LameError::Cli(message)),
            LineClass::Unrecognized => {}
        }
    }

    fn on_progress(&mut self, percent: Option<u8>, eta: Option<String>) {
        if self.is_terminal() {
            return;
        }
        // n/0 decode ratios carry no usable value
        let Some(percent) = percent else {
            return;
        };

        self.status.send_modify(|status| {
            if percent > status.progress {
                status.progress = percent.min(100);
            }
            if eta.is_some() {
                status.eta = eta;
            }
        });

        let (percent, eta) = {
            let status = self.status.borrow();
            (status.progress, status.eta.clone())
        };
        self.emit(LameEvent::Progress { percent, eta });
    }

    /// Maps the exit status; `None` means the process was killed by a signal.
    pub(crate) fn on_exit(&mut self, code: Option<i32>) {
        match code {
            Some(0) => self.finish(),
            Some(255) => self.fail(LameError::UnexpectedTermination),
            Some(127) => self.fail(LameError::MissingLibraries {
                executable: self.executable.clone(),
            }),
            Some(code) => self.fail(LameError::ExitCode(code)),
            None => self.fail(LameError::Terminated),
        }
    }

    pub(crate) fn finish(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.status.send_modify(|status| {
            status.finished = true;
            status.progress = 100;
            status.eta = Some(FINAL_ETA.to_string());
        });
        self.emit(LameEvent::Progress {
            percent: 100,
            eta: Some(FINAL_ETA.to_string()),
        });
        self.phase.send_replace(SessionPhase::Succeeded);
        self.emit(LameEvent::Finish);
        self.events.clear();
    }

    pub(crate) fn fail(&mut self, error: LameError) {
        if self.is_terminal() {
            debug!(%error, "Suppressing error after terminal state");
            return;
        }
        warn!(%error, "LAME session failed");
        self.phase.send_replace(SessionPhase::Failed(error.clone()));
        self.emit(LameEvent::Error(error));
        self.events.clear();
    }

    /// Drops every subscriber without a terminal event. Used on teardown.
    pub(crate) fn detach(&mut self) {
        self.events.clear();
    }

    fn emit(&mut self, event: LameEvent) {
        self.events.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Handle on one spawned codec process.
///
/// Dropping the handle aborts the supervisor, which kills the child.
#[derive(Debug)]
pub struct LameSession {
    status: watch::Receiver<LameStatus>,
    phase: watch::Receiver<SessionPhase>,
    kill: Option<oneshot::Sender<()>>,
    supervisor: Option<JoinHandle<()>>,
}

impl LameSession {
    /// Spawns the process and starts supervising it. Must be called from
    /// within a tokio runtime. A spawn failure is reported as an error event
    /// and through [`wait`](Self::wait), never returned here.
    pub fn start(invocation: LameInvocation, events: EventSink) -> (Self, SessionPipes) {
        let (mut machine, status, phase) =
            SessionMachine::new(invocation.mode, invocation.executable.clone(), events);
        machine.start();

        debug!(
            executable = %invocation.executable.display(),
            args = ?invocation.args,
            mode = invocation.mode.as_str(),
            "Spawning LAME"
        );

        let mut child = match spawn_child(&invocation) {
            Ok(child) => child,
            Err(error) => {
                machine.fail(error);
                let session = Self {
                    status,
                    phase,
                    kill: None,
                    supervisor: None,
                };
                return (session, SessionPipes::default());
            }
        };

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let mut readers = Vec::new();
        let mut pipes = SessionPipes::default();

        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, "stderr", signal_tx.clone())));
        }
        if invocation.streaming {
            pipes.stdin = child.stdin.take();
            pipes.stdout = child.stdout.take();
            pipes.reporter = Some(SignalReporter(signal_tx.clone()));
        } else if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, "stdout", signal_tx.clone())));
        }
        drop(signal_tx);

        let (kill_tx, kill_rx) = oneshot::channel();
        let supervisor = tokio::spawn(supervise(
            child,
            machine,
            signal_rx,
            kill_rx,
            readers,
            invocation.streaming,
        ));

        let session = Self {
            status,
            phase,
            kill: Some(kill_tx),
            supervisor: Some(supervisor),
        };
        (session, pipes)
    }

    pub fn status(&self) -> LameStatus {
        self.status.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.borrow().clone()
    }

    /// Watch receiver following the status.
    pub fn status_watch(&self) -> watch::Receiver<LameStatus> {
        self.status.clone()
    }

    pub fn phase_watch(&self) -> watch::Receiver<SessionPhase> {
        self.phase.clone()
    }

    /// Asks the supervisor to kill the process. Idempotent.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill.take() {
            let _ = tx.send(());
        }
    }

    /// Waits until the process has exited and every output line has been
    /// classified, then returns the terminal outcome.
    pub async fn wait(&mut self) -> Result<(), LameError> {
        if let Some(handle) = self.supervisor.take() {
            handle.await.map_err(|err| LameError::TaskJoin {
                role: "lame supervisor",
                details: err.to_string(),
            })?;
        }

        match self.phase() {
            SessionPhase::Succeeded => Ok(()),
            SessionPhase::Failed(error) => Err(error),
            SessionPhase::NotStarted | SessionPhase::Running => Err(LameError::Terminated),
        }
    }
}

impl Drop for LameSession {
    fn drop(&mut self) {
        if let Some(handle) = self.supervisor.take() {
            handle.abort();
        }
    }
}

fn spawn_child(invocation: &LameInvocation) -> Result<Child, LameError> {
    let mut command = Command::new(&invocation.executable);
    command
        .args(&invocation.args)
        .stdin(if invocation.streaming {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &invocation.library_dir {
        if let Some((variable, value)) = binary::library_path_env(dir)? {
            command.env(variable, value);
        }
    }

    command.spawn().map_err(|source| LameError::Spawn {
        executable: invocation.executable.clone(),
        source: Arc::new(source),
    })
}

async fn supervise(
    mut child: Child,
    mut machine: SessionMachine,
    mut signals: mpsc::UnboundedReceiver<ProcessSignal>,
    mut kill_rx: oneshot::Receiver<()>,
    readers: Vec<JoinHandle<()>>,
    kill_on_error: bool,
) {
    let mut open_readers = readers.len();
    let mut signals_open = true;
    let mut kill_armed = true;
    let mut killed = false;

    loop {
        tokio::select! {
            signal = signals.recv(), if signals_open => match signal {
                Some(ProcessSignal::Line(line)) => machine.on_line(&line),
                Some(ProcessSignal::Failure(error)) => machine.fail(error),
                Some(ProcessSignal::Closed) => open_readers = open_readers.saturating_sub(1),
                None => {
                    signals_open = false;
                    open_readers = 0;
                }
            },
            request = &mut kill_rx, if kill_armed => {
                kill_armed = false;
                if request.is_ok() && !killed {
                    killed = true;
                    debug!("Killing LAME on request");
                    machine.detach();
                    let _ = child.start_kill();
                }
            },
            status = child.wait(), if open_readers == 0 => {
                match status {
                    Ok(status) => machine.on_exit(status.code()),
                    Err(err) => machine.fail(LameError::from(err)),
                }
                break;
            },
        }

        if kill_on_error && !killed && machine.is_failed() {
            killed = true;
            debug!("Killing LAME after stream error");
            let _ = child.start_kill();
        }
    }

    for reader in readers {
        reader.abort();
    }
}

/// Splits a pipe into lines on `\n` or `\r` (progress lines are redrawn with
/// carriage returns) and forwards them to the supervisor.
async fn forward_lines<R>(mut reader: R, source: &'static str, signals: mpsc::UnboundedSender<ProcessSignal>)
where
    R: AsyncRead + Unpin,
{
    let mut pending = BytesMut::with_capacity(READ_CHUNK);

    loop {
        pending.reserve(READ_CHUNK);
        match reader.read_buf(&mut pending).await {
            Ok(0) => {
                if !pending.is_empty() {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    let _ = signals.send(ProcessSignal::Line(line));
                }
                break;
            }
            Ok(_) => {
                while let Some(pos) = pending.iter().position(|b| *b == b'\n' || *b == b'\r') {
                    let chunk = pending.split_to(pos + 1);
                    let line = String::from_utf8_lossy(&chunk[..pos]).into_owned();
                    let _ = signals.send(ProcessSignal::Line(line));
                }
            }
            Err(err) => {
                warn!(source, error = %err, "Failed to read LAME output");
                let _ = signals.send(ProcessSignal::Failure(read_error(source, err)));
                break;
            }
        }
    }

    let _ = signals.send(ProcessSignal::Closed);
}

fn read_error(source: &str, err: io::Error) -> LameError {
    LameError::Io(Arc::new(io::Error::new(
        err.kind(),
        format!("lame {source}: {err}"),
    )))
}
