//! Full-duplex streaming through a LAME process.
//!
//! [`LameStream`] writes into the codec's stdin and reads from its stdout.
//! Both directions are driven by the caller, so a slow reader stops the codec
//! from producing and a full stdin pipe suspends the writer until it drains.

use std::{
    future::Future,
    io,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    process::{ChildStdin, ChildStdout},
    sync::{mpsc, watch},
};
use tracing::debug;

use crate::{
    config_ext::LameSettings,
    error::LameError,
    options::{LameOptionsBuilder, OutputTarget},
    process::{
        build_spawn_args, LameEvent, LameInvocation, LameSession, LameStatus, SessionPhase,
        SignalReporter,
    },
    progress::LameMode,
};

type TerminalFuture = Pin<Box<dyn Future<Output = SessionPhase> + Send>>;

/// A LAME process used as an async byte pipe.
///
/// ```rust,ignore
/// use pmolame::{LameOptions, LameStream};
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// let stream = LameStream::encoder(LameOptions::builder().raw(true).bitrate(192))?;
/// let (mut reader, mut writer) = tokio::io::split(stream);
///
/// // feed and drain concurrently, LAME stalls once its stdout pipe is full
/// let producer = tokio::spawn(async move {
///     writer.write_all(&pcm).await?;
///     writer.shutdown().await
/// });
/// let mut mp3 = Vec::new();
/// reader.read_to_end(&mut mp3).await?;
/// producer.await??;
/// ```
pub struct LameStream {
    session: LameSession,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    reporter: Option<SignalReporter>,
    events: Option<mpsc::UnboundedReceiver<LameEvent>>,
    phase: watch::Receiver<SessionPhase>,
    terminal: Option<TerminalFuture>,
    write_pending: bool,
    finished: bool,
}

impl LameStream {
    /// Spawns LAME reading stdin and writing stdout. The output target of
    /// `options` is forced to [`OutputTarget::Stream`].
    pub fn spawn(
        mode: LameMode,
        options: LameOptionsBuilder,
        settings: &LameSettings,
    ) -> Result<Self, LameError> {
        let options = options.output(OutputTarget::Stream).build()?;
        let args = build_spawn_args(&options, mode, "-", "-", settings.default_disptime);

        let invocation = LameInvocation {
            executable: settings.binary.clone(),
            args,
            library_dir: settings.library_dir.clone(),
            mode,
            streaming: true,
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (session, pipes) = LameSession::start(invocation, vec![events_tx]);
        let phase = session.phase_watch();

        Ok(Self {
            session,
            stdin: pipes.stdin,
            stdout: pipes.stdout,
            reporter: pipes.reporter,
            events: Some(events_rx),
            phase,
            terminal: None,
            write_pending: false,
            finished: false,
        })
    }

    pub fn encoder(options: LameOptionsBuilder) -> Result<Self, LameError> {
        Self::spawn(LameMode::Encode, options, &LameSettings::default())
    }

    pub fn decoder(options: LameOptionsBuilder) -> Result<Self, LameError> {
        Self::spawn(LameMode::Decode, options, &LameSettings::default())
    }

    pub fn status(&self) -> LameStatus {
        self.session.status()
    }

    /// Event receiver; only the first call gets it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<LameEvent>> {
        self.events.take()
    }

    /// True while a write is suspended on a full stdin pipe.
    pub fn is_write_pending(&self) -> bool {
        self.write_pending
    }

    /// True once the output has ended or an error was delivered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Closes stdin so the codec can flush and exit on its own.
    pub fn finish(&mut self) {
        if let Some(stdin) = self.stdin.take() {
            debug!("Closing LAME stdin");
            drop(stdin);
        }
    }

    /// Kills the process and detaches every listener. No event is delivered
    /// afterwards.
    pub fn destroy(&mut self) {
        debug!("Destroying LAME stream");
        self.session.kill();
        self.stdin.take();
        self.stdout.take();
        self.reporter.take();
        self.terminal = None;
        self.write_pending = false;
        self.finished = true;
    }

    /// Waits for the process to exit and returns the session outcome.
    pub async fn wait(&mut self) -> Result<(), LameError> {
        self.stdin.take();
        self.session.wait().await
    }

    /// Takes the session error if it has not been handed out yet.
    fn take_session_error(&mut self) -> Option<LameError> {
        if self.finished {
            return None;
        }
        let error = match &*self.phase.borrow() {
            SessionPhase::Failed(error) => Some(error.clone()),
            _ => None,
        };
        if error.is_some() {
            self.finished = true;
        }
        error
    }

    fn fail_with(&mut self, error: LameError) -> io::Error {
        self.finished = true;
        self.write_pending = false;
        if let Some(reporter) = &self.reporter {
            reporter.report(error.clone());
        }
        error.into()
    }
}

impl AsyncWrite for LameStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(Err(LameError::StreamFinished.into()));
        }
        if let Some(error) = this.take_session_error() {
            this.write_pending = false;
            return Poll::Ready(Err(error.into()));
        }
        let Some(stdin) = this.stdin.as_mut() else {
            return Poll::Ready(Err(LameError::StreamFinished.into()));
        };

        match Pin::new(stdin).poll_write(cx, buf) {
            Poll::Pending => {
                this.write_pending = true;
                Poll::Pending
            }
            Poll::Ready(Ok(written)) => {
                this.write_pending = false;
                Poll::Ready(Ok(written))
            }
            Poll::Ready(Err(err)) => {
                // a codec failure usually shows up here as a broken pipe
                let error = match this.take_session_error() {
                    Some(error) => error,
                    None if err.kind() == io::ErrorKind::BrokenPipe => LameError::InputClosed,
                    None => LameError::from(err),
                };
                Poll::Ready(Err(this.fail_with(error)))
            }
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.stdin.as_mut() {
            Some(stdin) => Pin::new(stdin).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if let Some(stdin) = self.stdin.as_mut() {
            if let Poll::Ready(Err(err)) = Pin::new(stdin).poll_shutdown(cx) {
                debug!(error = %err, "Ignoring stdin shutdown error");
            }
        }
        self.stdin.take();
        Poll::Ready(Ok(()))
    }
}

impl AsyncRead for LameStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(Ok(()));
        }
        if let Some(error) = this.take_session_error() {
            return Poll::Ready(Err(error.into()));
        }

        if let Some(stdout) = this.stdout.as_mut() {
            let before = buf.filled().len();
            match Pin::new(stdout).poll_read(cx, buf) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(err)) => {
                    let error = this.take_session_error().unwrap_or_else(|| LameError::from(err));
                    return Poll::Ready(Err(this.fail_with(error)));
                }
                Poll::Ready(Ok(())) if buf.filled().len() > before => {
                    return Poll::Ready(Ok(()));
                }
                Poll::Ready(Ok(())) => {
                    this.stdout.take();
                }
            }
        }

        // stdout is exhausted: hold EOF back until the exit status is known
        let terminal = this.terminal.get_or_insert_with(|| {
            let mut phase = this.phase.clone();
            Box::pin(async move {
                match phase.wait_for(SessionPhase::is_terminal).await {
                    Ok(phase) => phase.clone(),
                    Err(_) => SessionPhase::Failed(LameError::Terminated),
                }
            })
        });

        match terminal.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(phase) => {
                this.terminal = None;
                match phase {
                    SessionPhase::Failed(error) => {
                        this.finished = true;
                        Poll::Ready(Err(error.into()))
                    }
                    _ => {
                        this.finished = true;
                        Poll::Ready(Ok(()))
                    }
                }
            }
        }
    }
}
