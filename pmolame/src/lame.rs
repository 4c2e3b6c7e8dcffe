//! Whole-file and whole-buffer conversions.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::{
    config_ext::LameSettings,
    error::LameError,
    options::{LameOptions, OutputTarget},
    pcm::PcmInput,
    process::{build_spawn_args, EventSink, LameEvent, LameInvocation, LameSession, LameStatus},
    progress::LameMode,
    temp::TempArtifact,
};

#[derive(Debug, Clone)]
enum LameInput {
    File(PathBuf),
    Buffer(Bytes),
}

/// Runs LAME on a file or an in-memory buffer and waits for the result.
///
/// ```rust,ignore
/// use pmolame::{Lame, LameOptions};
///
/// let options = LameOptions::builder().output_buffer().bitrate(192).build()?;
/// let mut lame = Lame::new(options)?;
/// lame.set_file("track.wav")?;
/// lame.encode().await?;
/// let mp3 = lame.buffer()?;
/// ```
#[derive(Debug)]
pub struct Lame {
    options: LameOptions,
    settings: LameSettings,
    input: Option<LameInput>,
    subscribers: EventSink,
    status: Option<watch::Receiver<LameStatus>>,
    output_file: Option<PathBuf>,
    output_buffer: Option<Bytes>,
}

impl Lame {
    /// Fails with [`LameError::StreamModeRequired`] for a `stream` output;
    /// use [`crate::LameStream`] for that.
    pub fn new(options: LameOptions) -> Result<Self, LameError> {
        if *options.output() == OutputTarget::Stream {
            return Err(LameError::StreamModeRequired);
        }
        Ok(Self {
            options,
            settings: LameSettings::default(),
            input: None,
            subscribers: Vec::new(),
            status: None,
            output_file: None,
            output_buffer: None,
        })
    }

    pub fn with_settings(mut self, settings: LameSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn set_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, LameError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LameError::InputNotFound(path.to_path_buf()));
        }
        self.input = Some(LameInput::File(path.to_path_buf()));
        Ok(self)
    }

    /// Float samples are quantized right away with the layout of the
    /// options, so an unsupported layout fails here rather than at encode
    /// time.
    pub fn set_buffer(&mut self, input: impl Into<PcmInput>) -> Result<&mut Self, LameError> {
        let data = input.into().into_bytes(&self.options.pcm_layout())?;
        self.input = Some(LameInput::Buffer(data));
        Ok(self)
    }

    pub fn set_lame_path(&mut self, path: impl Into<PathBuf>) -> Result<&mut Self, LameError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(LameError::InvalidPath("Lame path"));
        }
        self.settings.binary = path;
        Ok(self)
    }

    pub fn set_temp_path(&mut self, path: impl Into<PathBuf>) -> Result<&mut Self, LameError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(LameError::InvalidPath("Temp path"));
        }
        self.settings.temp_dir = path;
        Ok(self)
    }

    /// Receives the events of the next [`encode`](Self::encode) or
    /// [`decode`](Self::decode). The channel closes after its terminal event.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LameEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Status of the latest run, all-zero before the first one.
    pub fn status(&self) -> LameStatus {
        self.status
            .as_ref()
            .map(|rx| rx.borrow().clone())
            .unwrap_or_default()
    }

    /// Output path of the last successful run in file mode.
    pub fn file(&self) -> Result<&Path, LameError> {
        self.output_file.as_deref().ok_or(LameError::NotYetProcessed)
    }

    /// Output bytes of the last successful run in buffer mode.
    pub fn buffer(&self) -> Result<&Bytes, LameError> {
        self.output_buffer.as_ref().ok_or(LameError::NotYetProcessed)
    }

    pub async fn encode(&mut self) -> Result<&mut Self, LameError> {
        self.run(LameMode::Encode).await
    }

    pub async fn decode(&mut self) -> Result<&mut Self, LameError> {
        self.run(LameMode::Decode).await
    }

    async fn run(&mut self, mode: LameMode) -> Result<&mut Self, LameError> {
        let input = self.input.clone().ok_or(LameError::InputNotSet)?;
        self.output_file = None;
        self.output_buffer = None;

        let (input_path, input_artifact) = match input {
            LameInput::File(path) => (path, None),
            LameInput::Buffer(data) => {
                // lame picks its decoder from the input extension
                let suffix = if mode == LameMode::Decode { ".mp3" } else { "" };
                let artifact =
                    TempArtifact::allocate(&self.settings.temp_dir, "raw", suffix).await?;
                artifact.write(&data).await?;
                (artifact.path().to_path_buf(), Some(artifact))
            }
        };

        let result = self.convert(mode, input_path).await;

        if let Some(artifact) = input_artifact {
            artifact.remove().await;
        }

        result?;
        Ok(self)
    }

    async fn convert(&mut self, mode: LameMode, input: PathBuf) -> Result<(), LameError> {
        let (output_path, output_artifact) = match self.options.output() {
            OutputTarget::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                (path.clone(), None)
            }
            OutputTarget::Buffer => {
                let artifact =
                    TempArtifact::allocate(&self.settings.temp_dir, "encoded", "").await?;
                (artifact.path().to_path_buf(), Some(artifact))
            }
            OutputTarget::Stream => return Err(LameError::StreamModeRequired),
        };

        let args = build_spawn_args(
            &self.options,
            mode,
            input,
            output_path.clone(),
            self.settings.default_disptime,
        );
        let invocation = LameInvocation {
            executable: self.settings.binary.clone(),
            args,
            library_dir: self.settings.library_dir.clone(),
            mode,
            streaming: false,
        };

        info!(mode = mode.as_str(), output = %output_path.display(), "Starting LAME conversion");
        let (mut session, _pipes) =
            LameSession::start(invocation, std::mem::take(&mut self.subscribers));
        self.status = Some(session.status_watch());
        let outcome = session.wait().await;

        match (outcome, output_artifact) {
            (Ok(()), Some(artifact)) => {
                let data = artifact.read().await;
                artifact.remove().await;
                let data = data?;
                debug!(bytes = data.len(), "Read LAME output buffer");
                self.output_buffer = Some(data);
                Ok(())
            }
            (Ok(()), None) => {
                self.output_file = Some(output_path);
                Ok(())
            }
            (Err(error), artifact) => {
                if let Some(artifact) = artifact {
                    artifact.remove().await;
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: serde_json::Value) -> LameOptions {
        LameOptions::from_json(&value).unwrap()
    }

    #[test]
    fn test_stream_output_is_rejected() {
        let err = Lame::new(options(json!({ "output": "stream" }))).unwrap_err();
        assert!(matches!(err, LameError::StreamModeRequired));
    }

    #[test]
    fn test_results_before_processing() {
        let lame = Lame::new(options(json!({ "output": "buffer" }))).unwrap();
        assert_eq!(lame.file().unwrap_err().to_string(), "Audio is not yet decoded/encoded");
        assert!(matches!(lame.buffer(), Err(LameError::NotYetProcessed)));
        assert_eq!(lame.status(), LameStatus::default());
    }

    #[test]
    fn test_setters_validate_input() {
        let mut lame = Lame::new(options(json!({ "output": "buffer" }))).unwrap();
        assert!(matches!(
            lame.set_file("/definitely/not/here.wav"),
            Err(LameError::InputNotFound(_))
        ));
        assert!(matches!(lame.set_lame_path(""), Err(LameError::InvalidPath(_))));
        assert!(matches!(lame.set_temp_path(""), Err(LameError::InvalidPath(_))));
    }

    #[test]
    fn test_unsupported_float_layout_fails_on_set() {
        let mut lame = Lame::new(options(json!({
            "output": "buffer",
            "raw": true,
            "bitwidth": 16,
            "unsigned": true,
        })))
        .unwrap();
        let err = lame.set_buffer(vec![0.25f32, -0.25]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "lame: Float PCM input only supports signed samples for bitwidth 16"
        );
    }

    #[tokio::test]
    async fn test_encode_without_input() {
        let mut lame = Lame::new(options(json!({ "output": "buffer" }))).unwrap();
        let err = lame.encode().await.unwrap_err();
        assert_eq!(err.to_string(), "Audio file to encode is not set");
    }
}
