//! Integration with `pmoconfig`.
//!
//! The `host.lame` section of the configuration names the binary, the
//! vendor tree, the scratch directory and the default progress interval.
//! [`LameConfigExt::lame_settings`] resolves all of them into a
//! [`LameSettings`] value that the conversion entry points accept.

use std::path::PathBuf;

use anyhow::Result;
use pmoconfig::Config;

use crate::binary;

const DEFAULT_TEMP_DIR: &str = "lame_tmp";
const DEFAULT_DISPTIME: u64 = 1;

/// Resolved runtime settings for spawning LAME.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LameSettings {
    pub binary: PathBuf,
    pub library_dir: Option<PathBuf>,
    /// Root of the `raw/` and `encoded/` scratch directories.
    pub temp_dir: PathBuf,
    /// `--disptime` value injected when the options leave it unset; 0
    /// injects nothing.
    pub default_disptime: u64,
}

impl Default for LameSettings {
    /// Binary resolution against `./vendor` and `<tmp>/pmolame`, without
    /// touching the global configuration.
    fn default() -> Self {
        let vendor = binary::default_vendor_dir();
        Self {
            binary: binary::resolve_lame_binary(vendor.as_deref()),
            library_dir: binary::resolve_library_dir(vendor.as_deref()),
            temp_dir: std::env::temp_dir().join("pmolame"),
            default_disptime: DEFAULT_DISPTIME,
        }
    }
}

/// Extension trait adding the LAME settings to `pmoconfig::Config`.
///
/// ```rust,ignore
/// use pmoconfig::get_config;
/// use pmolame::{Lame, LameConfigExt};
///
/// let settings = get_config().lame_settings()?;
/// let lame = Lame::new(options)?.with_settings(settings);
/// ```
pub trait LameConfigExt {
    /// Explicit binary from `host.lame.binary`, `None` when empty.
    fn get_lame_binary(&self) -> Result<Option<PathBuf>>;

    fn set_lame_binary(&self, binary: String) -> Result<()>;

    /// Vendor tree from `host.lame.vendor.directory`, `None` when empty.
    fn get_lame_vendor_dir(&self) -> Result<Option<PathBuf>>;

    /// Scratch directory (default: "lame_tmp" under the config directory),
    /// created if missing.
    fn get_lame_temp_dir(&self) -> Result<String>;

    fn set_lame_temp_dir(&self, directory: String) -> Result<()>;

    fn get_lame_disptime(&self) -> Result<u64>;

    fn set_lame_disptime(&self, seconds: u64) -> Result<()>;

    /// Everything above, with binary resolution applied when no explicit
    /// binary is configured.
    fn lame_settings(&self) -> Result<LameSettings>;
}

impl LameConfigExt for Config {
    fn get_lame_binary(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .get_string(&["host", "lame", "binary"])?
            .map(PathBuf::from))
    }

    fn set_lame_binary(&self, binary: String) -> Result<()> {
        self.set_value(
            &["host", "lame", "binary"],
            serde_yaml::Value::String(binary),
        )
    }

    fn get_lame_vendor_dir(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .get_string(&["host", "lame", "vendor", "directory"])?
            .map(PathBuf::from))
    }

    fn get_lame_temp_dir(&self) -> Result<String> {
        self.get_managed_dir(&["host", "lame", "temp", "directory"], DEFAULT_TEMP_DIR)
    }

    fn set_lame_temp_dir(&self, directory: String) -> Result<()> {
        self.set_managed_dir(&["host", "lame", "temp", "directory"], directory)
    }

    fn get_lame_disptime(&self) -> Result<u64> {
        self.get_u64_or(&["host", "lame", "disptime"], DEFAULT_DISPTIME)
    }

    fn set_lame_disptime(&self, seconds: u64) -> Result<()> {
        self.set_u64(&["host", "lame", "disptime"], seconds)
    }

    fn lame_settings(&self) -> Result<LameSettings> {
        let vendor = self
            .get_lame_vendor_dir()?
            .or_else(binary::default_vendor_dir);
        let binary = match self.get_lame_binary()? {
            Some(binary) => binary,
            None => binary::resolve_lame_binary(vendor.as_deref()),
        };

        Ok(LameSettings {
            binary,
            library_dir: binary::resolve_library_dir(vendor.as_deref()),
            temp_dir: PathBuf::from(self.get_lame_temp_dir()?),
            default_disptime: self.get_lame_disptime()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults_from_embedded_document() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        assert_eq!(config.get_lame_binary().unwrap(), None);
        assert_eq!(config.get_lame_disptime().unwrap(), 1);

        let temp = config.get_lame_temp_dir().unwrap();
        assert_eq!(
            PathBuf::from(&temp),
            PathBuf::from(config.directory()).join("lame_tmp")
        );
        assert!(PathBuf::from(temp).is_dir());
    }

    #[test]
    fn test_explicit_values_win() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        config.set_lame_binary("/opt/lame/bin/lame".into()).unwrap();
        config.set_lame_disptime(5).unwrap();

        let settings = config.lame_settings().unwrap();
        assert_eq!(settings.binary, PathBuf::from("/opt/lame/bin/lame"));
        assert_eq!(settings.default_disptime, 5);
        assert_eq!(settings.temp_dir, dir.path().join("lame_tmp"));
    }

    #[test]
    fn test_default_settings_use_system_temp() {
        let settings = LameSettings::default();
        assert_eq!(settings.temp_dir, std::env::temp_dir().join("pmolame"));
        assert_eq!(settings.default_disptime, 1);
    }
}
