use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Permission denied error: {0}")]
    PermissionDenied(String),
    #[error("Recorder initialization failed: {0}")]
    RecorderInitFailed(String),
    #[error("No camera stream is bound")]
    NoStream,
    #[error("A recording is already running")]
    AlreadyRecording,
    #[error("No recording is running")]
    NotRecording,
    #[error("The current recording has not finished finalizing")]
    RecordingInProgress,
    #[error("Stream error: {0}")]
    StreamError(String),
    #[error("Encoding error: {0}")]
    EncodingError(String),
    #[error("Save failed: {0}")]
    SaveFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CaptureError {
    /// Classify a platform error message into the kind surfaced to the UI.
    ///
    /// Camera backends only report free-form text, so access problems are
    /// recognised by wording and everything else is treated as the device
    /// being unavailable.
    pub fn from_platform(context: &str, message: impl AsRef<str>) -> Self {
        let message = message.as_ref();
        let lowered = message.to_lowercase();
        let denied = ["permission", "denied", "not authorized", "unauthorized", "eacces"]
            .iter()
            .any(|needle| lowered.contains(needle));

        if denied {
            CaptureError::PermissionDenied(format!("{context}: {message}"))
        } else {
            CaptureError::DeviceUnavailable(format!("{context}: {message}"))
        }
    }

    /// True for the precondition errors a UI can avoid by disabling buttons.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            CaptureError::NoStream
                | CaptureError::AlreadyRecording
                | CaptureError::NotRecording
                | CaptureError::RecordingInProgress
        )
    }
}
