//! # pmolame
//!
//! Asynchronous orchestration of the LAME MP3 encoder/decoder running as a
//! subprocess.
//!
//! The crate never links against LAME. It validates options, spawns the
//! `lame` binary with the matching arguments, follows its progress output
//! and reports the outcome through an event channel.
//!
//! ## Features
//!
//! - **Validated options**: every option is checked against its domain
//!   before anything is spawned
//! - **Buffer and file mode**: [`Lame`] converts a file or an in-memory
//!   buffer and hands back a file or a buffer
//! - **Stream mode**: [`LameStream`] implements `AsyncWrite` and `AsyncRead`
//!   over the process pipes, with backpressure in both directions
//! - **Progress events**: monotonic percentages and ETA, then exactly one
//!   `Finish` or `Error`
//!
//! ## Example: Encode a WAV file to an MP3 buffer
//!
//! ```no_run
//! use pmolame::{Lame, LameEvent, LameOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = LameOptions::builder().output_buffer().bitrate(192).build()?;
//!     let mut lame = Lame::new(options)?;
//!     lame.set_file("audio.wav")?;
//!
//!     let mut events = lame.subscribe();
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             if let LameEvent::Progress { percent, eta } = event {
//!                 println!("{percent}% (eta {eta:?})");
//!             }
//!         }
//!     });
//!
//!     lame.encode().await?;
//!     println!("{} bytes of MP3", lame.buffer()?.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Example: Stream raw PCM through the encoder
//!
//! ```no_run
//! use pmolame::{LameOptions, LameStream};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pcm: Vec<u8> = vec![0; 44_100 * 4];
//!     let stream = LameStream::encoder(
//!         LameOptions::builder().raw(true).sfreq(44.1).bitwidth(16).bitrate(128),
//!     )?;
//!
//!     let (mut reader, mut writer) = tokio::io::split(stream);
//!     let producer = tokio::spawn(async move {
//!         writer.write_all(&pcm).await?;
//!         writer.shutdown().await
//!     });
//!
//!     let mut mp3 = Vec::new();
//!     reader.read_to_end(&mut mp3).await?;
//!     producer.await??;
//!     Ok(())
//! }
//! ```

pub mod binary;
mod config_ext;
pub mod error;
mod lame;
pub mod options;
mod pcm;
pub mod process;
pub mod progress;
mod stream;
mod temp;

pub use config_ext::{LameConfigExt, LameSettings};
pub use error::LameError;
pub use lame::Lame;
pub use options::{LameOptions, LameOptionsBuilder, OptionKey, OutputTarget, PcmLayout};
pub use pcm::{float_to_pcm, PcmInput};
pub use process::{LameEvent, LameSession, LameStatus, SessionPhase};
pub use progress::{classify, LameMode, LineClass};
pub use stream::LameStream;
pub use temp::TempArtifact;
