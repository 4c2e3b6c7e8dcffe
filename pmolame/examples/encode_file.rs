//! Example: Encode a WAV file to MP3 with the configured LAME binary
//!
//! Run with: cargo run -p pmolame --example encode_file -- input.wav output.mp3 [bitrate]

use std::path::Path;

use pmoconfig::get_config;
use pmolame::{Lame, LameConfigExt, LameEvent, LameOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: encode_file <input.wav> <output.mp3> [bitrate]");
        return Ok(());
    }
    let bitrate: u16 = match args.get(3) {
        Some(value) => value.parse()?,
        None => 192,
    };

    let settings = get_config().lame_settings()?;
    println!("Using {}", settings.binary.display());

    let options = LameOptions::builder()
        .output(Path::new(&args[2]))
        .bitrate(bitrate)
        .build()?;
    let mut lame = Lame::new(options)?.with_settings(settings);
    lame.set_file(&args[1])?;

    let mut events = lame.subscribe();
    let progress = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                LameEvent::Progress { percent, eta } => {
                    println!("{:>3}%  eta {}", percent, eta.as_deref().unwrap_or("--:--"));
                }
                LameEvent::Finish => println!("Done"),
                LameEvent::Error(err) => eprintln!("Failed: {err}"),
            }
        }
    });

    let result = lame.encode().await.map(|lame| lame.file().map(|p| p.to_path_buf()));
    progress.await?;
    println!("Wrote {}", result??.display());
    Ok(())
}
