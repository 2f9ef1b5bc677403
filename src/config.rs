//! Configuration management for webcam-capture
//!
//! Provides loading, saving and validation of the stream constraints, still
//! image settings, recording labels and output location. Values come from a
//! TOML file and can be overridden through `WEBCAM_CAPTURE__<SECTION>__<KEY>`
//! environment variables.

use crate::errors::CaptureError;
use crate::types::FacingMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default file name offered when a recording is downloaded.
pub const DEFAULT_FILE_NAME: &str = "react-webcam-stream-capture.webm";
/// Default MIME type requested from the recorder.
pub const DEFAULT_MIME_TYPE: &str = "video/webm";

const ENV_PREFIX: &str = "WEBCAM_CAPTURE";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CaptureConfig {
    pub camera: CameraConfig,
    pub still: StillConfig,
    pub recording: RecordingConfig,
    pub storage: StorageConfig,
}

/// Stream constraints used when a camera is bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Requested frame width in pixels
    pub width: u32,
    /// Requested frame height in pixels
    pub height: u32,
    /// Requested frames per second
    pub fps: u32,
    /// Facing mode used until the user toggles it
    pub default_facing: FacingMode,
}

/// Still capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StillConfig {
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

/// Recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// MIME type requested from the recorder
    pub mime_type: String,
    /// File name offered for the downloaded clip
    pub file_name: String,
    /// Deliver a chunk at this interval instead of only at stop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeslice_ms: Option<u64>,
    /// JPEG quality of recorded frames (1-100)
    pub frame_quality: u8,
    /// How long to wait for the recorder's final chunk
    pub finalize_timeout_ms: u64,
}

/// Where downloaded recordings are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Output directory for downloads
    pub output_directory: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            default_facing: FacingMode::Back,
        }
    }
}

impl Default for StillConfig {
    fn default() -> Self {
        Self { jpeg_quality: 92 }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            timeslice_ms: None,
            frame_quality: 80,
            finalize_timeout_ms: 5000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_directory: "./captures".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CaptureError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: CaptureConfig = toml::from_str(&contents)
            .map_err(|e| CaptureError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load defaults, then the TOML file if present, then environment overrides
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let defaults = toml::to_string(&Self::default())
            .map_err(|e| CaptureError::ConfigError(format!("Failed to serialize defaults: {}", e)))?;

        let layered = config::Config::builder()
            .add_source(config::File::from_str(&defaults, config::FileFormat::Toml))
            .add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CaptureError::ConfigError(format!("Failed to layer config: {}", e)))?;

        let config: CaptureConfig = layered
            .try_deserialize()
            .map_err(|e| CaptureError::ConfigError(format!("Invalid config: {}", e)))?;

        config.validate().map_err(CaptureError::ConfigError)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CaptureError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CaptureError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("webcam-capture.toml")
    }

    /// Load from default location (with environment overrides) or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_with_env(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err("Invalid camera resolution".to_string());
        }
        if self.camera.fps == 0 || self.camera.fps > 240 {
            return Err("Invalid camera FPS (must be 1-240)".to_string());
        }

        if self.still.jpeg_quality == 0 || self.still.jpeg_quality > 100 {
            return Err("Still JPEG quality must be between 1 and 100".to_string());
        }

        if self.recording.mime_type.trim().is_empty() {
            return Err("Recording MIME type must not be empty".to_string());
        }
        if self.recording.file_name.trim().is_empty()
            || self.recording.file_name.contains(['/', '\\'])
        {
            return Err("Recording file name must be a plain, non-empty name".to_string());
        }
        if self.recording.frame_quality == 0 || self.recording.frame_quality > 100 {
            return Err("Recording frame quality must be between 1 and 100".to_string());
        }
        if self.recording.timeslice_ms == Some(0) {
            return Err("Recording timeslice must be positive".to_string());
        }

        if self.storage.output_directory.trim().is_empty() {
            return Err("Output directory must not be empty".to_string());
        }

        Ok(())
    }
}
