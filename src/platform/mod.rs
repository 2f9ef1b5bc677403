//! Native collaborators
//!
//! The camera is reached through nokhwa, which picks the platform backend
//! (V4L2, AVFoundation or Media Foundation) at runtime.

mod camera;

pub use camera::{NokhwaMediaSource, NokhwaStream};

use crate::config::CaptureConfig;
use crate::controller::CaptureController;
use crate::recording::MjpegRecorderFactory;

/// Controller wired to the real camera and the Motion-JPEG recorder
pub type NativeController = CaptureController<NokhwaMediaSource, MjpegRecorderFactory>;

pub fn native_controller(config: CaptureConfig) -> NativeController {
    CaptureController::new(config, NokhwaMediaSource::default(), MjpegRecorderFactory)
}
