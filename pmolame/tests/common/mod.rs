#![allow(dead_code)]

use std::path::{Path, PathBuf};

use pmolame::{LameEvent, LameSettings};
use tokio::sync::mpsc;

/// Path of a fake `lame` script, made executable.
pub fn fixture(name: &str) -> PathBuf {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = std::fs::metadata(&path).unwrap().permissions();
        if permissions.mode() & 0o111 != 0o111 {
            permissions.set_mode(0o755);
            std::fs::set_permissions(&path, permissions).unwrap();
        }
    }

    path
}

pub fn settings(script: &str, temp_dir: &Path) -> LameSettings {
    LameSettings {
        binary: fixture(script),
        library_dir: None,
        temp_dir: temp_dir.to_path_buf(),
        default_disptime: 1,
    }
}

/// Collects events until the channel closes.
pub async fn collect(mut rx: mpsc::UnboundedReceiver<LameEvent>) -> Vec<LameEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub fn percentages(events: &[LameEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            LameEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

pub fn dir_is_empty(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
