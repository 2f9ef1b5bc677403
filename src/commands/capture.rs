use tauri::{command, State};

use super::{rebind_if_live, CaptureState, NativeCaptureState};
use crate::errors::CaptureError;
use crate::media::{MediaSource, MediaStream};
use crate::recording::RecorderFactory;
use crate::types::{DeviceOption, FacingMode, SessionSnapshot, StillImageView, StreamInfo};

impl<S, R> CaptureState<S, R>
where
    S: MediaSource,
    R: RecorderFactory<S::Stream>,
{
    pub async fn enumerate_devices(&self) -> Vec<DeviceOption> {
        let mut controller = self.lock().await;
        controller.enumerate_devices();
        controller.snapshot().devices
    }

    pub async fn select_device(&self, device_id: String) -> Result<SessionSnapshot, CaptureError> {
        let mut controller = self.lock().await;
        controller.select_device(device_id);
        rebind_if_live(&mut controller)?;
        Ok(controller.snapshot())
    }

    pub async fn toggle_facing(&self) -> Result<FacingMode, CaptureError> {
        let mut controller = self.lock().await;
        let facing = controller.toggle_facing();
        rebind_if_live(&mut controller)?;
        Ok(facing)
    }

    pub async fn bind_stream(&self) -> Result<StreamInfo, CaptureError> {
        let mut controller = self.lock().await;
        controller.bind_stream().map(|stream| stream.info().clone())
    }

    pub async fn release_stream(&self) -> Result<(), CaptureError> {
        self.lock().await.release_stream()
    }

    pub async fn capture_still(&self) -> Result<Option<StillImageView>, CaptureError> {
        let mut controller = self.lock().await;
        Ok(controller.capture_still()?.map(|still| still.view()))
    }

    pub async fn clear_still(&self) {
        self.lock().await.clear_still();
    }

    pub async fn session_state(&self) -> SessionSnapshot {
        self.lock().await.snapshot()
    }
}

/// List the cameras available for the device picker
#[command]
pub async fn enumerate_devices(state: State<'_, NativeCaptureState>) -> Result<Vec<DeviceOption>, String> {
    Ok(state.enumerate_devices().await)
}

/// Select a specific camera; a live stream is re-bound to it
#[command]
pub async fn select_device(
    state: State<'_, NativeCaptureState>,
    device_id: String,
) -> Result<SessionSnapshot, String> {
    log::info!("Selecting camera {}", device_id);
    state.select_device(device_id).await.map_err(|e| e.to_string())
}

/// Switch between the front and back camera
#[command]
pub async fn toggle_facing(state: State<'_, NativeCaptureState>) -> Result<FacingMode, String> {
    state.toggle_facing().await.map_err(|e| e.to_string())
}

/// Open the camera stream with the current constraints
#[command]
pub async fn bind_stream(state: State<'_, NativeCaptureState>) -> Result<StreamInfo, String> {
    state.bind_stream().await.map_err(|e| {
        log::error!("Failed to bind stream: {}", e);
        e.to_string()
    })
}

#[command]
pub async fn release_stream(state: State<'_, NativeCaptureState>) -> Result<(), String> {
    state.release_stream().await.map_err(|e| e.to_string())
}

/// Capture a still photo; returns `null` when no stream is bound
#[command]
pub async fn capture_still(state: State<'_, NativeCaptureState>) -> Result<Option<StillImageView>, String> {
    state.capture_still().await.map_err(|e| {
        log::error!("Failed to capture still: {}", e);
        e.to_string()
    })
}

#[command]
pub async fn clear_still(state: State<'_, NativeCaptureState>) -> Result<(), String> {
    state.clear_still().await;
    Ok(())
}

/// Everything the page renders
#[command]
pub async fn get_session_state(state: State<'_, NativeCaptureState>) -> Result<SessionSnapshot, String> {
    Ok(state.session_state().await)
}
