use std::{io, path::PathBuf, sync::Arc};

/// Every failure surfaced by the LAME orchestration layer.
///
/// User-facing messages share the `lame: ` prefix so callers can tell
/// subprocess failures apart from their own. The type is `Clone` because the
/// same error travels on the event channel and out of `wait()`.
#[derive(thiserror::Error, Debug, Clone)]
pub enum LameError {
    #[error("lame: Invalid option: {0}")]
    InvalidOption(String),
    #[error("Audio file (path) does not exist: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("Audio file to encode is not set")]
    InputNotSet,
    #[error("{0} must be a non-empty string")]
    InvalidPath(&'static str),
    #[error("Audio is not yet decoded/encoded")]
    NotYetProcessed,
    #[error(
        "lame: The streaming output mode requires LameStream::encoder or LameStream::decoder"
    )]
    StreamModeRequired,
    #[error("lame: {0}")]
    UnsupportedSampleFormat(String),
    #[error("lame: Failed to spawn '{}': {source}", executable.display())]
    Spawn {
        executable: PathBuf,
        source: Arc<io::Error>,
    },
    /// A warning or error line printed by the codec, already prefixed.
    #[error("{0}")]
    Cli(String),
    #[error(
        "Unexpected termination of the process, possibly directly after the start. Please check if the input and/or output does not exist."
    )]
    UnexpectedTermination,
    #[error(
        "lame: Failed to execute '{}'. Exit code 127 usually indicates missing shared libraries or an unreadable binary. Run the lame diagnostics for details.",
        executable.display()
    )]
    MissingLibraries { executable: PathBuf },
    #[error("lame: Process exited with code {0}")]
    ExitCode(i32),
    #[error("lame: Process exited unexpectedly")]
    Terminated,
    #[error("lame: Input stream closed before drain")]
    InputClosed,
    #[error("lame: Stream has already finished")]
    StreamFinished,
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),
    #[error("Unexpected output format received from temporary file")]
    UnexpectedOutputFormat,
    #[error("{role} task failed: {details}")]
    TaskJoin { role: &'static str, details: String },
}

impl From<io::Error> for LameError {
    fn from(err: io::Error) -> Self {
        LameError::Io(Arc::new(err))
    }
}

impl From<LameError> for io::Error {
    fn from(err: LameError) -> Self {
        match err {
            LameError::Io(inner) => io::Error::new(inner.kind(), inner.to_string()),
            LameError::StreamFinished | LameError::InputClosed => {
                io::Error::new(io::ErrorKind::BrokenPipe, err)
            }
            other => io::Error::other(other),
        }
    }
}

impl LameError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LameError::InvalidOption(message.into())
    }

    /// True for errors raised before any subprocess was spawned.
    pub fn is_validation(&self) -> bool {
        matches!(self, LameError::InvalidOption(_))
    }
}
