use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical camera-selection hint, distinct from a concrete device id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[serde(alias = "user")]
    Front,
    #[serde(alias = "environment")]
    Back,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::Front => FacingMode::Back,
            FacingMode::Back => FacingMode::Front,
        }
    }

    /// Guess which way a camera faces from its label.
    pub fn infer_from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if ["front", "user", "facetime", "selfie"]
            .iter()
            .any(|hint| label.contains(hint))
        {
            Some(FacingMode::Front)
        } else if ["back", "rear", "environment", "world"]
            .iter()
            .any(|hint| label.contains(hint))
        {
            Some(FacingMode::Back)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Front => "front",
            FacingMode::Back => "back",
        }
    }
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "front" | "user" => Ok(FacingMode::Front),
            "back" | "environment" => Ok(FacingMode::Back),
            other => Err(format!("unknown facing mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// A discoverable media device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub label: String,
    pub kind: DeviceKind,
    pub facing: Option<FacingMode>,
}

impl DeviceDescriptor {
    pub fn video_input(id: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            facing: FacingMode::infer_from_label(&label),
            label,
            kind: DeviceKind::VideoInput,
        }
    }

    pub fn with_kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_facing(mut self, facing: FacingMode) -> Self {
        self.facing = Some(facing);
        self
    }

    pub fn is_video_input(&self) -> bool {
        self.kind == DeviceKind::VideoInput
    }

    /// Label shown in the device picker; `position` is zero-based.
    pub fn display_label(&self, position: usize) -> String {
        if self.label.trim().is_empty() {
            format!("Device {}", position + 1)
        } else {
            self.label.clone()
        }
    }
}

/// Constraints used when binding a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub facing_mode: FacingMode,
    pub device_id: Option<String>,
}

impl StreamConstraints {
    /// Pick the device these constraints refer to.
    ///
    /// An explicit device id wins, then the first device facing the requested
    /// way, then the first device at all.
    pub fn resolve_device<'a>(&self, devices: &'a [DeviceDescriptor]) -> Option<&'a DeviceDescriptor> {
        let video: Vec<&DeviceDescriptor> = devices.iter().filter(|d| d.is_video_input()).collect();

        if let Some(id) = &self.device_id {
            return video.into_iter().find(|d| &d.id == id);
        }

        video
            .iter()
            .copied()
            .find(|d| d.facing == Some(self.facing_mode))
            .or_else(|| video.first().copied())
    }
}

/// Description of a bound stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub device_id: String,
    pub label: String,
    pub width: u32,
    pub height: u32,
}

/// A captured still frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StillImage {
    pub data: Bytes,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl StillImage {
    pub fn jpeg(data: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            mime_type: "image/jpeg".to_string(),
            width,
            height,
            captured_at: Utc::now(),
        }
    }

    /// Inline `data:` URL for an `<img>` element.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }

    pub fn view(&self) -> StillImageView {
        StillImageView {
            data_url: self.data_url(),
            width: self.width,
            height: self.height,
            size_bytes: self.data.len(),
            captured_at: self.captured_at,
        }
    }
}

/// Serializable form of a [`StillImage`] handed to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StillImageView {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub captured_at: DateTime<Utc>,
}

/// The single binary object produced from all recorded chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl DownloadArtifact {
    pub fn from_chunks(file_name: &str, mime_type: &str, chunks: &[Bytes]) -> Self {
        let total: usize = chunks.iter().map(Bytes::len).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            data.extend_from_slice(chunk);
        }

        Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            data: Bytes::from(data),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Inline form for a `<video>` element on the page.
    pub fn preview(&self) -> RecordingPreview {
        RecordingPreview {
            data_url: format!(
                "data:{};base64,{}",
                self.mime_type,
                base64::engine::general_purpose::STANDARD.encode(&self.data)
            ),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size(),
        }
    }
}

/// The recorded clip so far, playable inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingPreview {
    pub data_url: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

/// Conventional file extension for a container MIME type
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    match mime_type.split(';').next().unwrap_or_default().trim() {
        "video/webm" => Some("webm"),
        "video/mp4" => Some("mp4"),
        "video/x-matroska" => Some("mkv"),
        "video/x-motion-jpeg" => Some("mjpeg"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    Idle,
    Recording,
    /// Stopped, waiting for the recorder to deliver its last chunk.
    Finalizing,
}

/// Everything the page needs to render itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub facing_mode: FacingMode,
    pub device_id: Option<String>,
    pub devices: Vec<DeviceOption>,
    pub stream: Option<StreamInfo>,
    pub still_image: Option<StillImageView>,
    pub recording_state: RecordingState,
    pub is_recording: bool,
    pub recorded_chunks: usize,
    pub recorded_bytes: usize,
}

/// An entry of the device picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOption {
    pub id: String,
    pub label: String,
}
