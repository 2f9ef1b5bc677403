//! webcam-capture: camera preview, still capture and clip recording for Tauri applications
//!
//! This crate holds the state behind a single capture page: which camera is
//! requested, the last still photo, whether a clip is being recorded, and the
//! recorded chunks waiting to be downloaded or discarded.
//!
//! # Features
//! - Device enumeration and front/back camera switching
//! - Still capture as JPEG, exposed to the page as a data URL
//! - Clip recording with an explicit finalizing state, so downloads never
//!   miss the recorder's last chunk
//! - Downloads saved without overwriting earlier files
//!
//! # Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! webcam-capture = "0.1"
//! tauri = { version = "2.0", features = ["protocol-asset"] }
//! ```
//!
//! Then in your Tauri app:
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(webcam_capture::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
pub mod commands;
pub mod config;
pub mod controller;
pub mod errors;
pub mod media;
pub mod platform;
pub mod recording;
pub mod storage;
pub mod types;

// Testing utilities - synthetic collaborators for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::CaptureConfig;
pub use controller::{CaptureController, CaptureSession};
pub use errors::CaptureError;
pub use media::{MediaSource, MediaStream};
pub use recording::{RecorderEvent, RecorderFactory, RecorderHandle};
pub use storage::{DirectorySaver, FileSaver};
pub use types::{
    DeviceDescriptor, DownloadArtifact, FacingMode, RecordingPreview, RecordingState, SessionSnapshot,
    StillImage,
};

use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

/// Initialize the webcam-capture plugin with all commands
///
/// Configuration is read from `webcam-capture.toml` in the working
/// directory, with `WEBCAM_CAPTURE__*` environment overrides.
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    init_with_config(CaptureConfig::load_or_default())
}

/// Initialize the plugin with an explicit configuration
pub fn init_with_config<R: Runtime>(config: CaptureConfig) -> TauriPlugin<R> {
    Builder::new("webcam-capture")
        .invoke_handler(tauri::generate_handler![
            // Device and stream commands
            commands::capture::enumerate_devices,
            commands::capture::select_device,
            commands::capture::toggle_facing,
            commands::capture::bind_stream,
            commands::capture::release_stream,
            // Still commands
            commands::capture::capture_still,
            commands::capture::clear_still,
            commands::capture::get_session_state,
            // Recording commands
            commands::recording::start_recording,
            commands::recording::stop_recording,
            commands::recording::download_recording,
            commands::recording::discard_recording,
            commands::recording::get_recording_preview,
        ])
        .setup(move |app, _api| {
            log::info!("Initializing {} v{}", NAME, VERSION);
            app.manage(commands::NativeCaptureState::native(config));
            Ok(())
        })
        .build()
}

/// Initialize logging for the capture system
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("webcam_capture=info");
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
