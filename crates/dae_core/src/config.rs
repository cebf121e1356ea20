//! Engine configuration loaded from JSON.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u64,
    #[serde(default = "default_logical_width")]
    pub logical_width: u32,
    #[serde(default = "default_logical_height")]
    pub logical_height: u32,
    #[serde(default = "default_audio_buffer")]
    pub audio_buffer: usize,
    #[serde(default)]
    pub debug_overlay: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            logical_width: default_logical_width(),
            logical_height: default_logical_height(),
            audio_buffer: default_audio_buffer(),
            debug_overlay: false,
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<EngineConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &EngineConfig) -> Result<(), String> {
    if config.tick_hz == 0 || config.tick_hz > 1000 {
        return Err(format!(
            "Config validation failed: tick_hz {} outside (0, 1000]",
            config.tick_hz
        ));
    }
    if config.logical_width == 0 || config.logical_height == 0 {
        return Err(format!(
            "Config validation failed: logical resolution {}x{} has a zero dimension",
            config.logical_width, config.logical_height
        ));
    }
    if config.audio_buffer == 0 {
        return Err("Config validation failed: audio_buffer is zero".to_string());
    }
    if !config.audio_buffer.is_power_of_two() {
        log::warn!(
            "audio_buffer {} is not a power of two. This is allowed but often accidental.",
            config.audio_buffer
        );
    }
    Ok(())
}

const fn default_tick_hz() -> u64 {
    30
}

const fn default_logical_width() -> u32 {
    320
}

const fn default_logical_height() -> u32 {
    480
}

const fn default_audio_buffer() -> usize {
    4096
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "dae_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn load_config_parses_and_fills_defaults() {
        let path = temp_file_path("valid");
        fs::write(&path, r#"{ "tick_hz": 60 }"#).expect("write temp config");
        let config = load_config_from_path(&path).expect("valid config should load");
        assert_eq!(config.tick_hz, 60);
        assert_eq!(config.logical_width, 320);
        assert_eq!(config.logical_height, 480);
        assert_eq!(config.audio_buffer, 4096);
        assert!(!config.debug_overlay);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_config_rejects_zero_tick_rate() {
        let path = temp_file_path("zero_tick");
        fs::write(&path, r#"{ "tick_hz": 0 }"#).expect("write temp config");
        let err = load_config_from_path(&path).expect_err("zero tick rate should fail");
        assert!(err.contains("tick_hz"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_config_rejects_zero_resolution() {
        let path = temp_file_path("zero_res");
        fs::write(&path, r#"{ "logical_width": 0 }"#).expect("write temp config");
        let err = load_config_from_path(&path).expect_err("zero width should fail");
        assert!(err.contains("zero dimension"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_reports_path() {
        let path = temp_file_path("missing");
        let err = load_config_from_path(&path).expect_err("missing file should fail");
        assert!(err.contains("Failed to read"));
    }
}
