//! Tauri commands for video recording

use tauri::{command, State};

use super::{CaptureState, NativeCaptureState};
use crate::errors::CaptureError;
use crate::media::MediaSource;
use crate::recording::RecorderFactory;
use crate::types::{RecordingPreview, SessionSnapshot};

impl<S, R> CaptureState<S, R>
where
    S: MediaSource,
    R: RecorderFactory<S::Stream>,
{
    pub async fn start_recording(&self) -> Result<String, CaptureError> {
        let mut controller = self.lock().await;
        controller.start_recording().map(|id| id.to_string())
    }

    pub async fn stop_recording(&self) -> Result<SessionSnapshot, CaptureError> {
        let mut controller = self.lock().await;
        controller.stop_recording()?;
        Ok(controller.snapshot())
    }

    /// Save the finished clip; `None` when nothing was recorded.
    pub async fn download_recording(&self) -> Result<Option<String>, CaptureError> {
        let mut controller = self.lock().await;
        let saved = controller.download_recording(self.saver()).await?;
        Ok(saved.map(|path| path.display().to_string()))
    }

    pub async fn discard_recording(&self) -> SessionSnapshot {
        let mut controller = self.lock().await;
        controller.discard_recording();
        controller.snapshot()
    }

    /// Recorded clip so far, without clearing it; `None` before any chunk.
    pub async fn recording_preview(&self) -> Option<RecordingPreview> {
        self.lock().await.recording_preview().map(|artifact| artifact.preview())
    }
}

/// Start recording the bound stream
///
/// # Returns
/// * Recording ID
#[command]
pub async fn start_recording(state: State<'_, NativeCaptureState>) -> Result<String, String> {
    state.start_recording().await.map_err(|e| {
        log::error!("Failed to start recording: {}", e);
        e.to_string()
    })
}

/// Stop recording; the final chunk is collected before a download
#[command]
pub async fn stop_recording(state: State<'_, NativeCaptureState>) -> Result<SessionSnapshot, String> {
    state.stop_recording().await.map_err(|e| e.to_string())
}

/// Save the recorded clip and clear it
///
/// # Returns
/// * Path of the saved file, or `null` when nothing was recorded
#[command]
pub async fn download_recording(state: State<'_, NativeCaptureState>) -> Result<Option<String>, String> {
    state.download_recording().await.map_err(|e| {
        log::error!("Failed to download recording: {}", e);
        e.to_string()
    })
}

/// Throw the recorded clip away
#[command]
pub async fn discard_recording(state: State<'_, NativeCaptureState>) -> Result<SessionSnapshot, String> {
    Ok(state.discard_recording().await)
}

/// Inline preview of the recorded clip
///
/// # Returns
/// * Data URL and MIME type, or `null` when nothing was recorded
#[command]
pub async fn get_recording_preview(
    state: State<'_, NativeCaptureState>,
) -> Result<Option<RecordingPreview>, String> {
    Ok(state.recording_preview().await)
}
