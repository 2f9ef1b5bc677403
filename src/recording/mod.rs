//! Video recording collaborators
//!
//! A [`RecorderFactory`] binds a recorder to a live stream. Once started the
//! recorder delivers its output through a [`ChunkSink`]: zero or more chunks
//! while running, usually one more after `stop`, and finally a stopped
//! event. Delivery is asynchronous relative to `stop`, which is why the
//! controller keeps a finalizing state until the stopped event arrives.
//!
//! # Example
//! ```rust,ignore
//! use webcam_capture::recording::{MjpegRecorderFactory, RecorderFactory, RecorderHandle};
//!
//! let mut factory = MjpegRecorderFactory::default();
//! let mut recorder = factory.create(&stream, &options, sink)?;
//! recorder.start()?;
//! // ...
//! recorder.stop()?;
//! ```

mod mjpeg;

pub use mjpeg::{MjpegRecorder, MjpegRecorderFactory, MJPEG_MIME_TYPE};

use crate::config::RecordingConfig;
use crate::errors::CaptureError;
use crate::media::MediaStream;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Output of a running recorder, tagged with the recording it belongs to
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    Chunk { recording_id: Uuid, data: Bytes },
    Stopped { recording_id: Uuid },
    Failed { recording_id: Uuid, message: String },
}

impl RecorderEvent {
    pub fn recording_id(&self) -> Uuid {
        match self {
            RecorderEvent::Chunk { recording_id, .. }
            | RecorderEvent::Stopped { recording_id }
            | RecorderEvent::Failed { recording_id, .. } => *recording_id,
        }
    }
}

/// Where a recorder delivers its events
#[derive(Debug, Clone)]
pub struct ChunkSink {
    recording_id: Uuid,
    tx: UnboundedSender<RecorderEvent>,
}

impl ChunkSink {
    pub fn new(recording_id: Uuid, tx: UnboundedSender<RecorderEvent>) -> Self {
        Self { recording_id, tx }
    }

    pub fn recording_id(&self) -> Uuid {
        self.recording_id
    }

    /// Deliver a chunk. Returns false once the controller is gone.
    pub fn chunk(&self, data: impl Into<Bytes>) -> bool {
        self.send(RecorderEvent::Chunk {
            recording_id: self.recording_id,
            data: data.into(),
        })
    }

    pub fn stopped(&self) -> bool {
        self.send(RecorderEvent::Stopped {
            recording_id: self.recording_id,
        })
    }

    pub fn failed(&self, message: impl Into<String>) -> bool {
        self.send(RecorderEvent::Failed {
            recording_id: self.recording_id,
            message: message.into(),
        })
    }

    fn send(&self, event: RecorderEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Settings handed to a recorder when it is created
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderOptions {
    /// Preferred container; the recorder reports what it actually produces
    pub mime_type: String,
    /// Deliver a chunk at this interval; `None` delivers everything at stop
    pub timeslice: Option<Duration>,
    /// JPEG quality of encoded frames
    pub frame_quality: u8,
    /// Upper bound on captured frames per second
    pub max_fps: u32,
}

impl RecorderOptions {
    pub fn from_config(config: &RecordingConfig, max_fps: u32) -> Self {
        Self {
            mime_type: config.mime_type.clone(),
            timeslice: config.timeslice_ms.map(Duration::from_millis),
            frame_quality: config.frame_quality,
            max_fps: max_fps.max(1),
        }
    }
}

/// Creates recorders bound to a stream
pub trait RecorderFactory<S: MediaStream> {
    type Handle: RecorderHandle;

    fn create(
        &mut self,
        stream: &S,
        options: &RecorderOptions,
        sink: ChunkSink,
    ) -> Result<Self::Handle, CaptureError>;
}

/// A recorder bound to one stream
pub trait RecorderHandle {
    /// MIME type of the bytes this recorder emits
    fn mime_type(&self) -> &str;

    fn start(&mut self) -> Result<(), CaptureError>;

    /// Ask the recorder to finish; the last chunk and the stopped event
    /// follow asynchronously.
    fn stop(&mut self) -> Result<(), CaptureError>;
}
