//! Synthetic collaborators
//!
//! `SyntheticMediaSource` serves gradient frames for a fixed device list,
//! `ScriptedRecorderFactory` hands its sinks to the test so chunks and the
//! stopped event can be injected at will, and `MemorySaver` keeps downloads
//! in memory.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use image::RgbImage;

use crate::errors::CaptureError;
use crate::media::{MediaSource, MediaStream};
use crate::recording::{ChunkSink, RecorderFactory, RecorderHandle, RecorderOptions};
use crate::storage::FileSaver;
use crate::types::{DeviceDescriptor, DownloadArtifact, StreamConstraints, StreamInfo};

/// Gradient frame that shifts with every frame number
pub fn synthetic_video_frame(frame_number: u64, width: u32, height: u32) -> RgbImage {
    let base = (frame_number % 256) as u8;
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            base.wrapping_add((x % 256) as u8),
            base.wrapping_add((y % 256) as u8),
            base.wrapping_add(((x + y) % 256) as u8),
        ])
    })
}

/// Media source with a fixed device list
#[derive(Debug, Clone, Default)]
pub struct SyntheticMediaSource {
    devices: Vec<DeviceDescriptor>,
    enumerate_error: Option<CaptureError>,
    open_error: Option<CaptureError>,
    opened: Arc<Mutex<Vec<StreamConstraints>>>,
    enumerations: Arc<AtomicUsize>,
}

impl SyntheticMediaSource {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices,
            ..Self::default()
        }
    }

    /// Two cameras, one facing each way, plus a microphone
    pub fn with_default_devices() -> Self {
        Self::new(vec![
            DeviceDescriptor::video_input("cam-front", "Front Camera"),
            DeviceDescriptor::video_input("cam-back", "Back Camera"),
            DeviceDescriptor::video_input("mic-0", "Built-in Microphone")
                .with_kind(crate::types::DeviceKind::AudioInput),
        ])
    }

    pub fn failing_enumeration(mut self, error: CaptureError) -> Self {
        self.enumerate_error = Some(error);
        self
    }

    pub fn failing_open(mut self, error: CaptureError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Constraints of every stream opened so far
    pub fn opened(&self) -> Vec<StreamConstraints> {
        self.opened.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn enumeration_count(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }
}

impl MediaSource for SyntheticMediaSource {
    type Stream = SyntheticStream;

    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        match &self.enumerate_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.devices.clone()),
        }
    }

    fn open_stream(&mut self, constraints: &StreamConstraints) -> Result<SyntheticStream, CaptureError> {
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }

        let device = constraints.resolve_device(&self.devices).ok_or_else(|| {
            CaptureError::DeviceUnavailable(format!("no camera matches {:?}", constraints))
        })?;

        if let Ok(mut opened) = self.opened.lock() {
            opened.push(constraints.clone());
        }

        let mut stream = SyntheticStream::new(&device.id, constraints.width, constraints.height);
        stream.info.label = device.label.clone();
        Ok(stream)
    }
}

/// Live synthetic stream; clones share the open flag and frame counter
#[derive(Debug, Clone)]
pub struct SyntheticStream {
    info: StreamInfo,
    open: Arc<AtomicBool>,
    frame_counter: Arc<AtomicU64>,
}

impl SyntheticStream {
    pub fn new(device_id: &str, width: u32, height: u32) -> Self {
        Self {
            info: StreamInfo {
                device_id: device_id.to_string(),
                label: String::new(),
                width,
                height,
            },
            open: Arc::new(AtomicBool::new(true)),
            frame_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn frames_served(&self) -> u64 {
        self.frame_counter.load(Ordering::SeqCst)
    }
}

impl MediaStream for SyntheticStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn grab_frame(&self) -> Result<RgbImage, CaptureError> {
        if !self.is_open() {
            return Err(CaptureError::StreamError(format!(
                "stream {} is closed",
                self.info.device_id
            )));
        }
        let n = self.frame_counter.fetch_add(1, Ordering::SeqCst);
        Ok(synthetic_video_frame(n, self.info.width, self.info.height))
    }

    fn close(&self) -> Result<(), CaptureError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Recorder factory whose recorders only do what the test tells them
#[derive(Debug, Clone, Default)]
pub struct ScriptedRecorderFactory {
    created: Arc<AtomicUsize>,
    sinks: Arc<Mutex<Vec<ChunkSink>>>,
    init_error: Option<CaptureError>,
    trailing_chunk: Option<Bytes>,
}

impl ScriptedRecorderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorder fails to initialize with `error`
    pub fn failing(mut self, error: CaptureError) -> Self {
        self.init_error = Some(error);
        self
    }

    /// Recorders deliver `chunk` and the stopped event as soon as they are
    /// stopped, like a platform recorder flushing its buffer.
    pub fn finalizing_with(mut self, chunk: impl Into<Bytes>) -> Self {
        self.trailing_chunk = Some(chunk.into());
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Sink of the most recently created recorder
    pub fn last_sink(&self) -> Option<ChunkSink> {
        self.sinks.lock().ok().and_then(|s| s.last().cloned())
    }
}

impl<S: MediaStream> RecorderFactory<S> for ScriptedRecorderFactory {
    type Handle = ScriptedRecorder;

    fn create(
        &mut self,
        _stream: &S,
        options: &RecorderOptions,
        sink: ChunkSink,
    ) -> Result<ScriptedRecorder, CaptureError> {
        if let Some(err) = &self.init_error {
            return Err(err.clone());
        }

        self.created.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.push(sink.clone());
        }

        Ok(ScriptedRecorder {
            mime_type: options.mime_type.clone(),
            sink,
            trailing_chunk: self.trailing_chunk.clone(),
            started: false,
            stopped: false,
        })
    }
}

#[derive(Debug)]
pub struct ScriptedRecorder {
    mime_type: String,
    sink: ChunkSink,
    trailing_chunk: Option<Bytes>,
    started: bool,
    stopped: bool,
}

impl RecorderHandle for ScriptedRecorder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.started {
            return Err(CaptureError::AlreadyRecording);
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.started || self.stopped {
            return Err(CaptureError::NotRecording);
        }
        self.stopped = true;
        if let Some(chunk) = self.trailing_chunk.take() {
            self.sink.chunk(chunk);
            self.sink.stopped();
        }
        Ok(())
    }
}

/// Keeps every saved artifact in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySaver {
    saved: Arc<Mutex<Vec<DownloadArtifact>>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<DownloadArtifact> {
        self.saved.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl FileSaver for MemorySaver {
    fn save_as(&self, artifact: &DownloadArtifact) -> Result<PathBuf, CaptureError> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| CaptureError::SaveFailed("saver lock poisoned".to_string()))?;
        saved.push(artifact.clone());
        Ok(PathBuf::from(format!("memory/{}", artifact.file_name)))
    }
}
