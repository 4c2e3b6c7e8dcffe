//! Locating the `lame` executable and its bundled shared libraries.
//!
//! A vendor tree is laid out as `<vendor>/lame/<os>-<arch>/lame[.exe]` with
//! the libraries next to it in `lib/`.

use std::{
    env,
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::LameError;

/// Environment variable naming an explicit binary.
pub const LAME_BINARY_ENV: &str = "LAME_BINARY";

/// Binary name looked up on `PATH` when nothing else matched.
pub const DEFAULT_BINARY: &str = "lame";

const LIBRARY_DIRECTORY_NAME: &str = "lib";

fn executable_name() -> String {
    format!("lame{}", env::consts::EXE_SUFFIX)
}

/// `<os>-<arch>` directory name for the running host, e.g. `linux-x86_64`.
pub fn platform_directory() -> String {
    format!("{}-{}", env::consts::OS, env::consts::ARCH)
}

/// `./vendor` relative to the working directory.
pub fn default_vendor_dir() -> Option<PathBuf> {
    env::current_dir().ok().map(|dir| dir.join("vendor"))
}

fn platform_root(vendor_dir: &Path) -> PathBuf {
    vendor_dir.join("lame").join(platform_directory())
}

/// Binary bundled in `vendor_dir`, if any, with `LAME_BINARY` taking
/// precedence when it names an existing file.
pub fn resolve_bundled_binary(vendor_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(LAME_BINARY_ENV) {
        let explicit = PathBuf::from(explicit);
        if explicit.exists() {
            debug!(path = %explicit.display(), "Using LAME binary from {}", LAME_BINARY_ENV);
            return Some(explicit);
        }
    }

    let candidate = platform_root(vendor_dir?).join(executable_name());
    candidate.exists().then_some(candidate)
}

/// Resolution order: `LAME_BINARY`, the vendor tree, then `lame` on `PATH`.
pub fn resolve_lame_binary(vendor_dir: Option<&Path>) -> PathBuf {
    resolve_bundled_binary(vendor_dir).unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY))
}

pub fn resolve_library_dir(vendor_dir: Option<&Path>) -> Option<PathBuf> {
    let candidate = platform_root(vendor_dir?).join(LIBRARY_DIRECTORY_NAME);
    candidate.is_dir().then_some(candidate)
}

/// Dynamic loader search variable for the host OS.
pub fn library_path_variable() -> Option<&'static str> {
    match env::consts::OS {
        "linux" => Some("LD_LIBRARY_PATH"),
        "macos" => Some("DYLD_LIBRARY_PATH"),
        "windows" => Some("PATH"),
        _ => None,
    }
}

/// Puts `library_dir` in front of `current`.
pub fn prefix_library_path(
    library_dir: &Path,
    current: Option<OsString>,
) -> Result<OsString, LameError> {
    let mut paths = vec![library_dir.to_path_buf()];
    if let Some(current) = current.filter(|value| !value.is_empty()) {
        paths.extend(env::split_paths(&current));
    }
    env::join_paths(paths).map_err(|err| LameError::from(io::Error::other(err)))
}

/// `(variable, value)` to set on the child so it finds the bundled
/// libraries, `None` on hosts without a known loader variable.
pub fn library_path_env(library_dir: &Path) -> Result<Option<(&'static str, OsString)>, LameError> {
    let Some(variable) = library_path_variable() else {
        return Ok(None);
    };
    let value = prefix_library_path(library_dir, env::var_os(variable))?;
    Ok(Some((variable, value)))
}
