use crate::error::CliError;
use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tonelink_core::{ModemConfig, DEFAULT_SAMPLE_RATE};

/// Modem settings shared by every subcommand
#[derive(Debug, Default, Args)]
pub struct ModemArgs {
    /// JSON file with modem settings (flags take precedence)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Symbol duration in milliseconds
    #[arg(long, global = true)]
    pub symbol_ms: Option<u64>,

    /// Frequency of symbol 0 in Hz
    #[arg(long, global = true)]
    pub base_freq: Option<f32>,

    /// Spacing between adjacent tones in Hz
    #[arg(long, global = true)]
    pub spacing: Option<f32>,

    /// Detection threshold (0..1)
    #[arg(long, global = true)]
    pub threshold: Option<f32>,

    /// Sample rate of generated audio
    #[arg(long, global = true)]
    pub sample_rate: Option<u32>,
}

/// On-disk form of the settings; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub symbol_ms: Option<u64>,
    pub base_freq: Option<f32>,
    pub spacing: Option<f32>,
    pub threshold: Option<f32>,
    pub sample_rate: Option<u32>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Resolved settings: flags over config file over defaults
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub modem: ModemConfig,
    pub sample_rate: u32,
}

impl ModemArgs {
    pub fn resolve(&self) -> Result<Settings, CliError> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        self.merge(file)
    }

    fn merge(&self, file: ConfigFile) -> Result<Settings, CliError> {
        let defaults = ModemConfig::default();
        let modem = ModemConfig {
            symbol_duration: self
                .symbol_ms
                .or(file.symbol_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.symbol_duration),
            base_frequency: self
                .base_freq
                .or(file.base_freq)
                .unwrap_or(defaults.base_frequency),
            spacing: self.spacing.or(file.spacing).unwrap_or(defaults.spacing),
            threshold: self.threshold.or(file.threshold).unwrap_or(defaults.threshold),
        };
        modem.validate()?;

        Ok(Settings {
            modem,
            sample_rate: self
                .sample_rate
                .or(file.sample_rate)
                .unwrap_or(DEFAULT_SAMPLE_RATE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_flags_or_file() {
        let settings = ModemArgs::default().resolve().unwrap();
        assert_eq!(settings.modem, ModemConfig::default());
        assert_eq!(settings.sample_rate, DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_flags_override_file() {
        let file: ConfigFile =
            serde_json::from_str(r#"{"symbol_ms": 80, "spacing": 150.0, "sample_rate": 22050}"#)
                .unwrap();
        let args = ModemArgs {
            spacing: Some(180.0),
            ..ModemArgs::default()
        };

        let settings = args.merge(file).unwrap();
        assert_eq!(settings.modem.symbol_duration, Duration::from_millis(80));
        assert_eq!(settings.modem.spacing, 180.0);
        assert_eq!(settings.modem.base_frequency, 1000.0);
        assert_eq!(settings.sample_rate, 22050);
    }

    #[test]
    fn test_unknown_file_field_rejected() {
        let parsed: Result<ConfigFile, _> = serde_json::from_str(r#"{"baud": 300}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_invalid_result_rejected() {
        let args = ModemArgs {
            threshold: Some(1.5),
            ..ModemArgs::default()
        };
        assert!(matches!(
            args.resolve(),
            Err(CliError::Modem(tonelink_core::ModemError::InvalidConfig(_)))
        ));
    }
}
