use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::record::TRANSCODE_SAMPLE_RATE;

pub const SETTINGS_FILE: &str = "voicetrim.toml";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory offered first in the save dialog. None falls back to the
    /// platform default.
    pub save_dir: Option<PathBuf>,
    /// Sample rate recordings are normalized to.
    pub transcode_sample_rate: u32,
    /// Output volume, persisted across runs.
    pub volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_dir: None,
            transcode_sample_rate: TRANSCODE_SAMPLE_RATE,
            volume: 1.0,
        }
    }
}

impl Settings {
    /// Load from `path`. A missing file yields defaults; a malformed file is
    /// an error so a typo does not silently wipe the user's preferences.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read settings {}", path.display()))?;
        let settings: Settings = toml::from_str(&text)
            .with_context(|| format!("parse settings {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).context("serialize settings")?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create settings dir {}", parent.display()))?;
            }
        }
        std::fs::write(path, text)
            .with_context(|| format!("write settings {}", path.display()))?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(SETTINGS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let settings =
            Settings::load(Path::new("/definitely/not/here/voicetrim.toml")).expect("defaults");
        assert_eq!(settings.transcode_sample_rate, TRANSCODE_SAMPLE_RATE);
        assert!(settings.save_dir.is_none());
    }

    #[test]
    fn roundtrips_through_toml() {
        let mut settings = Settings::default();
        settings.save_dir = Some(PathBuf::from("/tmp/samples"));
        settings.volume = 0.5;
        let text = toml::to_string_pretty(&settings).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back.save_dir, settings.save_dir);
        assert_eq!(back.volume, 0.5);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let back: Settings = toml::from_str("volume = 0.25\n").unwrap();
        assert_eq!(back.volume, 0.25);
        assert_eq!(back.transcode_sample_rate, TRANSCODE_SAMPLE_RATE);
    }
}
