use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const CONFIG_PATH_ENV_VAR: &str = "TILEMAP_DEMO_CONFIG";
pub(crate) const FRAMES_ENV_VAR: &str = "TILEMAP_DEMO_FRAMES";
pub(crate) const OUTPUT_DIR_ENV_VAR: &str = "TILEMAP_DEMO_OUTPUT_DIR";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DemoConfig {
    pub(crate) viewport_width: u32,
    pub(crate) viewport_height: u32,
    pub(crate) frame_count: u32,
    pub(crate) fixed_dt_seconds: f64,
    pub(crate) camera_speed_px: f32,
    pub(crate) gravity_px: f32,
    pub(crate) max_resolve_iterations: u32,
    pub(crate) output_dir: Option<PathBuf>,
    /// Save every n-th frame as PNG; 0 disables export.
    pub(crate) png_every: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            viewport_width: 320,
            viewport_height: 240,
            frame_count: 240,
            fixed_dt_seconds: 1.0 / 60.0,
            camera_speed_px: 60.0,
            gravity_px: 900.0,
            max_resolve_iterations: 4,
            output_dir: None,
            png_every: 30,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Raw values of the override sources, collected before any parsing.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConfigSources {
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) frames: Option<String>,
    pub(crate) output_dir: Option<String>,
}

impl ConfigSources {
    pub(crate) fn from_env() -> Self {
        Self {
            config_path: read_env_var(CONFIG_PATH_ENV_VAR).map(PathBuf::from),
            frames: read_env_var(FRAMES_ENV_VAR),
            output_dir: read_env_var(OUTPUT_DIR_ENV_VAR),
        }
    }
}

pub(crate) fn load_config() -> Result<DemoConfig, ConfigError> {
    resolve_config(ConfigSources::from_env())
}

/// Defaults, then the JSON file, then env overrides; later sources win.
pub(crate) fn resolve_config(sources: ConfigSources) -> Result<DemoConfig, ConfigError> {
    let mut config = match sources.config_path.as_deref() {
        Some(path) => {
            let config = read_config_file(path)?;
            info!(path = %path.display(), "config_file_loaded");
            config
        }
        None => DemoConfig::default(),
    };

    if let Some(raw) = sources.frames {
        match raw.trim().parse::<u32>() {
            Ok(frames) => config.frame_count = frames,
            Err(_) => warn!(
                env_var = FRAMES_ENV_VAR,
                value = raw.as_str(),
                "invalid frame count env var value; falling back to config"
            ),
        }
    }
    if let Some(raw) = sources.output_dir {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.output_dir = Some(PathBuf::from(trimmed));
        }
    }

    Ok(config.normalized())
}

pub(crate) fn read_config_file(path: &Path) -> Result<DemoConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_json(&raw).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn parse_config_json(raw: &str) -> Result<DemoConfig, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, DemoConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(source.to_string())
            } else {
                Err(format!("at {path}: {source}"))
            }
        }
    }
}

impl DemoConfig {
    /// Replaces unusable values with defaults.
    pub(crate) fn normalized(mut self) -> Self {
        let defaults = DemoConfig::default();
        if self.viewport_width == 0 || self.viewport_height == 0 {
            warn!(
                width = self.viewport_width,
                height = self.viewport_height,
                "zero viewport; using default size"
            );
            self.viewport_width = defaults.viewport_width;
            self.viewport_height = defaults.viewport_height;
        }
        if !self.fixed_dt_seconds.is_finite() || self.fixed_dt_seconds <= 0.0 {
            warn!(dt = self.fixed_dt_seconds, "invalid fixed dt; using default");
            self.fixed_dt_seconds = defaults.fixed_dt_seconds;
        }
        if !self.camera_speed_px.is_finite() {
            self.camera_speed_px = defaults.camera_speed_px;
        }
        if !self.gravity_px.is_finite() {
            self.gravity_px = defaults.gravity_px;
        }
        self
    }
}

fn read_env_var(var: &'static str) -> Option<String> {
    match env::var(var) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(env_var = var, error = %err, "unable to read env var; ignoring");
            None
        }
    }
}
