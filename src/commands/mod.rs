//! Tauri commands
//!
//! The controller lives in Tauri managed state behind an async mutex; every
//! command locks it, performs one action and returns a serializable result.
//! The command functions are thin wrappers over [`CaptureState`], which is
//! generic over the collaborators so it can be driven without hardware.

pub mod capture;
pub mod recording;

pub use capture::*;
pub use recording::*;

use tokio::sync::{Mutex, MutexGuard};

use crate::config::CaptureConfig;
use crate::controller::CaptureController;
use crate::errors::CaptureError;
use crate::media::{MediaSource, MediaStream};
use crate::platform::{native_controller, NokhwaMediaSource};
use crate::recording::{MjpegRecorderFactory, RecorderFactory};
use crate::storage::{DirectorySaver, FileSaver};
use crate::types::RecordingState;

/// State managed by the plugin for the real camera
pub type NativeCaptureState = CaptureState<NokhwaMediaSource, MjpegRecorderFactory>;

pub struct CaptureState<S, R>
where
    S: MediaSource,
    R: RecorderFactory<S::Stream>,
{
    controller: Mutex<CaptureController<S, R>>,
    saver: Box<dyn FileSaver + Send + Sync>,
}

impl<S, R> CaptureState<S, R>
where
    S: MediaSource,
    R: RecorderFactory<S::Stream>,
{
    pub fn new(controller: CaptureController<S, R>, saver: Box<dyn FileSaver + Send + Sync>) -> Self {
        Self {
            controller: Mutex::new(controller),
            saver,
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, CaptureController<S, R>> {
        self.controller.lock().await
    }

    pub(crate) fn saver(&self) -> &(dyn FileSaver + Send + Sync) {
        self.saver.as_ref()
    }
}

impl NativeCaptureState {
    /// Real camera, files saved under `storage.output_directory`.
    pub fn native(config: CaptureConfig) -> Self {
        let saver = DirectorySaver::new(&config.storage.output_directory);
        let mut controller = native_controller(config);
        controller.enumerate_devices();
        Self::new(controller, Box::new(saver))
    }
}

/// Re-open the stream so new constraints take effect, unless none is bound
/// or a recording still owns it.
pub(crate) fn rebind_if_live<S, R>(controller: &mut CaptureController<S, R>) -> Result<(), CaptureError>
where
    S: MediaSource,
    R: RecorderFactory<S::Stream>,
{
    let live = controller.stream().map(|s| s.is_open()).unwrap_or(false);
    if !live {
        return Ok(());
    }
    if controller.recording_state() != RecordingState::Idle {
        log::debug!("Stream is recording, new constraints apply on the next binding");
        return Ok(());
    }
    controller.bind_stream().map(|_| ())
}
