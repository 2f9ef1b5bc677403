//! Capture/record state machine
//!
//! [`CaptureController`] owns the [`CaptureSession`] and drives the media
//! source and recorder collaborators. Recording moves through
//! `Idle -> Recording -> Finalizing -> Idle`; the last step happens only when
//! the recorder reports that it has delivered its final chunk, so a download
//! never misses trailing data.
//!
//! Recorder output arrives on a channel owned by the controller. Queued
//! events are applied in delivery order by [`CaptureController::dispatch_pending_events`],
//! which every state-reading operation calls first.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::config::CaptureConfig;
use crate::errors::CaptureError;
use crate::media::{MediaSource, MediaStream};
use crate::recording::{ChunkSink, RecorderEvent, RecorderFactory, RecorderHandle, RecorderOptions};
use crate::storage::FileSaver;
use crate::types::{
    extension_for_mime, DeviceDescriptor, DeviceOption, DownloadArtifact, FacingMode, RecordingState, SessionSnapshot,
    StillImage, StreamConstraints,
};

/// UI-relevant state of one capture page
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    pub facing_mode: FacingMode,
    pub device_id: Option<String>,
    pub still_image: Option<StillImage>,
    pub recording_state: RecordingState,
    pub recorded_chunks: Vec<Bytes>,
    pub available_devices: Vec<DeviceDescriptor>,
    /// MIME type reported by the recorder that produced the chunks
    pub recorded_mime_type: Option<String>,
}

impl CaptureSession {
    pub fn new(facing_mode: FacingMode) -> Self {
        Self {
            facing_mode,
            device_id: None,
            still_image: None,
            recording_state: RecordingState::Idle,
            recorded_chunks: Vec::new(),
            available_devices: Vec::new(),
            recorded_mime_type: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording_state == RecordingState::Recording
    }

    pub fn recorded_bytes(&self) -> usize {
        self.recorded_chunks.iter().map(Bytes::len).sum()
    }
}

struct ActiveRecording<H> {
    id: Uuid,
    handle: H,
    started_at: DateTime<Utc>,
    /// drop trailing chunks; set when discarded while finalizing
    discard_trailing: bool,
}

pub struct CaptureController<S, R>
where
    S: MediaSource,
    R: RecorderFactory<S::Stream>,
{
    config: CaptureConfig,
    session: CaptureSession,
    source: S,
    recorder_factory: R,
    stream: Option<S::Stream>,
    bound_constraints: Option<StreamConstraints>,
    active: Option<ActiveRecording<R::Handle>>,
    events_tx: UnboundedSender<RecorderEvent>,
    events_rx: UnboundedReceiver<RecorderEvent>,
}

impl<S, R> CaptureController<S, R>
where
    S: MediaSource,
    R: RecorderFactory<S::Stream>,
{
    pub fn new(config: CaptureConfig, source: S, recorder_factory: R) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session: CaptureSession::new(config.camera.default_facing),
            config,
            source,
            recorder_factory,
            stream: None,
            bound_constraints: None,
            active: None,
            events_tx,
            events_rx,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stream(&self) -> Option<&S::Stream> {
        self.stream.as_ref()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.session.recording_state
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    // ─── devices ────────────────────────────────────────────────────────────

    /// Query the platform for video inputs.
    ///
    /// A failing query leaves the device list empty; the page then simply
    /// has no device picker.
    pub fn enumerate_devices(&mut self) -> &[DeviceDescriptor] {
        match self.source.enumerate() {
            Ok(devices) => {
                self.session.available_devices =
                    devices.into_iter().filter(DeviceDescriptor::is_video_input).collect();
                log::info!("Found {} camera(s)", self.session.available_devices.len());
            }
            Err(e) => {
                log::warn!("Device enumeration failed: {}", e);
                self.session.available_devices.clear();
            }
        }
        &self.session.available_devices
    }

    /// Constrain the next stream binding to `device_id`.
    pub fn select_device(&mut self, device_id: impl Into<String>) {
        let device_id = device_id.into();
        log::debug!("Selected device {}", device_id);
        self.session.device_id = Some(device_id);
    }

    /// Flip between front and back; takes effect on the next binding.
    pub fn toggle_facing(&mut self) -> FacingMode {
        self.session.facing_mode = self.session.facing_mode.toggled();
        log::debug!("Facing mode is now {}", self.session.facing_mode);
        self.session.facing_mode
    }

    pub fn constraints(&self) -> StreamConstraints {
        StreamConstraints {
            width: self.config.camera.width,
            height: self.config.camera.height,
            fps: self.config.camera.fps,
            facing_mode: self.session.facing_mode,
            device_id: self.session.device_id.clone(),
        }
    }

    // ─── stream ─────────────────────────────────────────────────────────────

    /// Open a stream with the current constraints, replacing any bound one.
    ///
    /// If the new stream cannot be opened, the previous selection is restored
    /// and its stream re-opened.
    pub fn bind_stream(&mut self) -> Result<&S::Stream, CaptureError> {
        self.dispatch_pending_events();
        if self.session.recording_state != RecordingState::Idle {
            return Err(CaptureError::RecordingInProgress);
        }

        // the platform may refuse a second handle on the same camera
        let previous = self.release_current_stream();
        let constraints = self.constraints();
        let stream = match self.source.open_stream(&constraints) {
            Ok(stream) => stream,
            Err(e) => {
                if let Some(previous) = previous {
                    self.restore_binding(previous);
                }
                return Err(e);
            }
        };

        log::info!(
            "Bound stream {} ({}x{})",
            stream.info().device_id,
            stream.info().width,
            stream.info().height
        );
        self.bound_constraints = Some(constraints);
        Ok(self.stream.insert(stream))
    }

    /// Close the bound stream, if any.
    pub fn release_stream(&mut self) -> Result<(), CaptureError> {
        self.dispatch_pending_events();
        if self.session.recording_state != RecordingState::Idle {
            return Err(CaptureError::RecordingInProgress);
        }
        self.release_current_stream();
        Ok(())
    }

    /// Close the bound stream and return the constraints it was opened with.
    fn release_current_stream(&mut self) -> Option<StreamConstraints> {
        let old = self.stream.take()?;
        if let Err(e) = old.close() {
            log::warn!("Failed to close stream {}: {}", old.info().device_id, e);
        }
        self.bound_constraints.take()
    }

    fn restore_binding(&mut self, previous: StreamConstraints) {
        self.session.device_id = previous.device_id.clone();
        self.session.facing_mode = previous.facing_mode;

        match self.source.open_stream(&previous) {
            Ok(stream) => {
                log::info!("Restored stream {}", stream.info().device_id);
                self.stream = Some(stream);
                self.bound_constraints = Some(previous);
            }
            Err(e) => log::warn!("Could not restore the previous stream: {}", e),
        }
    }

    // ─── stills ─────────────────────────────────────────────────────────────

    /// Snapshot the live stream into the still slot.
    ///
    /// Without a bound stream nothing happens and `Ok(None)` is returned.
    pub fn capture_still(&mut self) -> Result<Option<&StillImage>, CaptureError> {
        let Some(stream) = &self.stream else {
            log::debug!("Capture requested without a bound stream");
            return Ok(None);
        };

        let still = stream.snapshot(self.config.still.jpeg_quality)?;
        log::info!(
            "Captured still {}x{} ({} bytes)",
            still.width,
            still.height,
            still.data.len()
        );
        Ok(Some(self.session.still_image.insert(still)))
    }

    pub fn clear_still(&mut self) {
        self.session.still_image = None;
    }

    // ─── recording ──────────────────────────────────────────────────────────

    /// Bind a new recorder to the stream and start it.
    pub fn start_recording(&mut self) -> Result<Uuid, CaptureError> {
        self.dispatch_pending_events();
        match self.session.recording_state {
            RecordingState::Recording => return Err(CaptureError::AlreadyRecording),
            RecordingState::Finalizing => return Err(CaptureError::RecordingInProgress),
            RecordingState::Idle => {}
        }

        let stream = self.stream.as_ref().ok_or(CaptureError::NoStream)?;
        let recording_id = Uuid::new_v4();
        let options = RecorderOptions::from_config(&self.config.recording, self.config.camera.fps);
        let sink = ChunkSink::new(recording_id, self.events_tx.clone());

        let mut handle = self
            .recorder_factory
            .create(stream, &options, sink)
            .map_err(into_init_failure)?;
        handle.start().map_err(into_init_failure)?;

        self.session.recorded_mime_type = Some(handle.mime_type().to_string());
        self.session.recording_state = RecordingState::Recording;
        self.active = Some(ActiveRecording {
            id: recording_id,
            handle,
            started_at: Utc::now(),
            discard_trailing: false,
        });

        log::info!("Recording {} started", recording_id);
        Ok(recording_id)
    }

    /// Ask the recorder to finish. The session stops reporting "recording"
    /// at once but stays in `Finalizing` until the recorder's stopped event.
    pub fn stop_recording(&mut self) -> Result<(), CaptureError> {
        self.dispatch_pending_events();
        if self.session.recording_state != RecordingState::Recording {
            return Err(CaptureError::NotRecording);
        }

        let active = self.active.as_mut().ok_or(CaptureError::NotRecording)?;
        self.session.recording_state = RecordingState::Finalizing;

        if let Err(e) = active.handle.stop() {
            log::error!("Recorder {} failed to stop: {}", active.id, e);
            self.finish_recording();
            return Err(e);
        }

        let elapsed = Utc::now() - active.started_at;
        log::info!(
            "Recording {} stopping after {} ms",
            active.id,
            elapsed.num_milliseconds()
        );
        Ok(())
    }

    /// Append a delivered chunk. Returns whether it was kept.
    pub fn on_chunk_available(&mut self, recording_id: Uuid, chunk: Bytes) -> bool {
        let Some(active) = self.active.as_ref().filter(|a| a.id == recording_id) else {
            log::warn!("Dropping chunk from unknown recording {}", recording_id);
            return false;
        };

        if chunk.is_empty() {
            return false;
        }
        if active.discard_trailing {
            log::debug!("Dropping trailing chunk of discarded recording {}", recording_id);
            return false;
        }

        self.session.recorded_chunks.push(chunk);
        true
    }

    /// The recorder has delivered everything; the recording is closed.
    pub fn on_recorder_stopped(&mut self, recording_id: Uuid) {
        if self.active.as_ref().map(|a| a.id) != Some(recording_id) {
            log::debug!("Ignoring stop of unknown recording {}", recording_id);
            return;
        }
        self.finish_recording();
        log::info!(
            "Recording {} finalized: {} chunk(s), {} bytes",
            recording_id,
            self.session.recorded_chunks.len(),
            self.session.recorded_bytes()
        );
    }

    pub fn on_recorder_error(&mut self, recording_id: Uuid, message: &str) {
        if self.active.as_ref().map(|a| a.id) != Some(recording_id) {
            return;
        }
        log::error!("Recording {} failed: {}", recording_id, message);
        self.finish_recording();
    }

    fn finish_recording(&mut self) {
        self.active = None;
        self.session.recording_state = RecordingState::Idle;
    }

    fn apply_event(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::Chunk { recording_id, data } => {
                self.on_chunk_available(recording_id, data);
            }
            RecorderEvent::Stopped { recording_id } => self.on_recorder_stopped(recording_id),
            RecorderEvent::Failed {
                recording_id,
                message,
            } => self.on_recorder_error(recording_id, &message),
        }
    }

    /// Apply every queued recorder event in delivery order.
    pub fn dispatch_pending_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait until a stopped recording has delivered its final chunk.
    ///
    /// Gives up after `recording.finalize_timeout_ms`; chunks arriving after
    /// that are dropped.
    pub async fn finalize(&mut self) {
        self.dispatch_pending_events();
        if self.session.recording_state != RecordingState::Finalizing {
            return;
        }

        let timeout = Duration::from_millis(self.config.recording.finalize_timeout_ms);
        let deadline = tokio::time::Instant::now() + timeout;

        while self.session.recording_state == RecordingState::Finalizing {
            match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(event)) => self.apply_event(event),
                Ok(None) => break,
                Err(_) => {
                    log::warn!(
                        "Recorder did not finalize within {} ms, closing recording",
                        timeout.as_millis()
                    );
                    self.finish_recording();
                }
            }
        }
    }

    /// Concatenate all chunks into one artifact and clear them.
    ///
    /// Returns `Ok(None)` when there is nothing to download.
    pub fn build_download_artifact(&mut self) -> Result<Option<DownloadArtifact>, CaptureError> {
        self.dispatch_pending_events();
        if self.session.recording_state != RecordingState::Idle {
            return Err(CaptureError::RecordingInProgress);
        }
        if self.session.recorded_chunks.is_empty() {
            return Ok(None);
        }

        let artifact = DownloadArtifact::from_chunks(
            &self.artifact_file_name(),
            self.artifact_mime_type(),
            &self.session.recorded_chunks,
        );
        self.session.recorded_chunks.clear();
        self.session.recorded_mime_type = None;

        log::info!(
            "Built {} ({} bytes, {})",
            artifact.file_name,
            artifact.size(),
            artifact.mime_type
        );
        Ok(Some(artifact))
    }

    /// Finalize, build the artifact and hand it to `saver`.
    pub async fn download_recording<F>(&mut self, saver: &F) -> Result<Option<std::path::PathBuf>, CaptureError>
    where
        F: FileSaver + ?Sized,
    {
        self.finalize().await;
        match self.build_download_artifact()? {
            Some(artifact) => saver.save_as(&artifact).map(Some),
            None => Ok(None),
        }
    }

    /// Throw the recorded chunks away.
    pub fn discard_recording(&mut self) {
        self.dispatch_pending_events();
        let dropped = self.session.recorded_chunks.len();
        self.session.recorded_chunks.clear();

        if let Some(active) = self.active.as_mut() {
            if self.session.recording_state == RecordingState::Finalizing {
                active.discard_trailing = true;
            }
        } else {
            self.session.recorded_mime_type = None;
        }
        log::debug!("Discarded {} chunk(s)", dropped);
    }

    /// Concatenated recording for an inline preview, without clearing it.
    pub fn recording_preview(&mut self) -> Option<DownloadArtifact> {
        self.dispatch_pending_events();
        if self.session.recorded_chunks.is_empty() {
            return None;
        }
        Some(DownloadArtifact::from_chunks(
            &self.artifact_file_name(),
            self.artifact_mime_type(),
            &self.session.recorded_chunks,
        ))
    }

    fn artifact_mime_type(&self) -> &str {
        self.session
            .recorded_mime_type
            .as_deref()
            .unwrap_or(&self.config.recording.mime_type)
    }

    /// Configured file name, with the extension swapped when the recorder
    /// produced a different container than requested.
    fn artifact_file_name(&self) -> String {
        let name = &self.config.recording.file_name;
        let actual = self.artifact_mime_type();
        if actual == self.config.recording.mime_type {
            return name.clone();
        }

        match (extension_for_mime(actual), name.rsplit_once('.')) {
            (Some(ext), Some((stem, _))) if !stem.is_empty() => format!("{stem}.{ext}"),
            (Some(ext), _) => format!("{name}.{ext}"),
            (None, _) => name.clone(),
        }
    }

    /// Serializable view of the session for the page.
    pub fn snapshot(&mut self) -> SessionSnapshot {
        self.dispatch_pending_events();
        SessionSnapshot {
            facing_mode: self.session.facing_mode,
            device_id: self.session.device_id.clone(),
            devices: self
                .session
                .available_devices
                .iter()
                .enumerate()
                .map(|(position, device)| DeviceOption {
                    id: device.id.clone(),
                    label: device.display_label(position),
                })
                .collect(),
            stream: self.stream.as_ref().map(|s| s.info().clone()),
            still_image: self.session.still_image.as_ref().map(StillImage::view),
            recording_state: self.session.recording_state,
            is_recording: self.session.is_recording(),
            recorded_chunks: self.session.recorded_chunks.len(),
            recorded_bytes: self.session.recorded_bytes(),
        }
    }
}

fn into_init_failure(error: CaptureError) -> CaptureError {
    match error {
        CaptureError::RecorderInitFailed(_) | CaptureError::PermissionDenied(_) => error,
        other => CaptureError::RecorderInitFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemorySaver, ScriptedRecorderFactory, SyntheticMediaSource};

    type TestController = CaptureController<SyntheticMediaSource, ScriptedRecorderFactory>;

    fn controller() -> (TestController, ScriptedRecorderFactory) {
        let factory = ScriptedRecorderFactory::new();
        let mut config = CaptureConfig::default();
        config.camera.width = 32;
        config.camera.height = 24;
        config.recording.finalize_timeout_ms = 50;
        let controller = CaptureController::new(
            config,
            SyntheticMediaSource::with_default_devices(),
            factory.clone(),
        );
        (controller, factory)
    }

    fn recording_controller() -> (TestController, ScriptedRecorderFactory, Uuid) {
        let (mut ctrl, factory) = controller();
        ctrl.bind_stream().unwrap();
        let id = ctrl.start_recording().unwrap();
        (ctrl, factory, id)
    }

    #[test]
    fn test_initial_state() {
        let (ctrl, _) = controller();
        assert_eq!(ctrl.recording_state(), RecordingState::Idle);
        assert_eq!(ctrl.session().facing_mode, FacingMode::Back);
        assert!(ctrl.session().available_devices.is_empty());
        assert!(ctrl.stream().is_none());
    }

    #[test]
    fn test_enumerate_keeps_video_inputs() {
        let (mut ctrl, _) = controller();
        let ids: Vec<String> = ctrl.enumerate_devices().iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec!["cam-front", "cam-back"]);
    }

    #[test]
    fn test_enumeration_failure_leaves_list_empty() {
        let source = SyntheticMediaSource::with_default_devices()
            .failing_enumeration(CaptureError::PermissionDenied("blocked".to_string()));
        let mut ctrl = CaptureController::new(CaptureConfig::default(), source, ScriptedRecorderFactory::new());
        assert!(ctrl.enumerate_devices().is_empty());
    }

    #[test]
    fn test_bind_uses_facing_and_device() {
        let (mut ctrl, _) = controller();
        assert_eq!(ctrl.bind_stream().unwrap().info().device_id, "cam-back");

        ctrl.toggle_facing();
        assert_eq!(ctrl.bind_stream().unwrap().info().device_id, "cam-front");

        ctrl.select_device("cam-back");
        assert_eq!(ctrl.bind_stream().unwrap().info().device_id, "cam-back");
    }

    #[test]
    fn test_rebinding_closes_previous_stream() {
        let (mut ctrl, _) = controller();
        let first = ctrl.bind_stream().unwrap().clone();
        ctrl.bind_stream().unwrap();
        assert!(!first.is_open());
        assert!(ctrl.stream().unwrap().is_open());
    }

    #[test]
    fn test_capture_still_without_stream_is_noop() {
        let (mut ctrl, _) = controller();
        assert!(ctrl.capture_still().unwrap().is_none());
        assert!(ctrl.session().still_image.is_none());
    }

    #[test]
    fn test_capture_and_clear_still() {
        let (mut ctrl, _) = controller();
        ctrl.bind_stream().unwrap();

        let still = ctrl.capture_still().unwrap().unwrap().clone();
        assert_eq!((still.width, still.height), (32, 24));
        assert_eq!(still.mime_type, "image/jpeg");

        ctrl.clear_still();
        assert!(ctrl.session().still_image.is_none());
    }

    #[test]
    fn test_start_requires_stream() {
        let (mut ctrl, factory) = controller();
        assert_eq!(ctrl.start_recording(), Err(CaptureError::NoStream));
        assert_eq!(factory.created(), 0);
        assert_eq!(ctrl.recording_state(), RecordingState::Idle);
    }

    #[test]
    fn test_double_start_is_rejected() {
        let (mut ctrl, factory, _) = recording_controller();
        assert_eq!(ctrl.start_recording(), Err(CaptureError::AlreadyRecording));
        assert_eq!(factory.created(), 1);
        assert!(ctrl.is_recording());
    }

    #[test]
    fn test_recorder_init_failure_stays_idle() {
        let factory = ScriptedRecorderFactory::new()
            .failing(CaptureError::StreamError("codec missing".to_string()));
        let mut ctrl = CaptureController::new(
            CaptureConfig::default(),
            SyntheticMediaSource::with_default_devices(),
            factory,
        );
        ctrl.bind_stream().unwrap();

        let err = ctrl.start_recording().unwrap_err();
        assert!(matches!(err, CaptureError::RecorderInitFailed(_)));
        assert_eq!(ctrl.recording_state(), RecordingState::Idle);
    }

    #[test]
    fn test_stop_when_idle() {
        let (mut ctrl, _) = controller();
        assert_eq!(ctrl.stop_recording(), Err(CaptureError::NotRecording));
    }

    #[test]
    fn test_chunks_appended_in_order_without_empties() {
        let (mut ctrl, _, id) = recording_controller();
        assert!(ctrl.on_chunk_available(id, Bytes::from_static(b"a")));
        assert!(!ctrl.on_chunk_available(id, Bytes::new()));
        assert!(ctrl.on_chunk_available(id, Bytes::from_static(b"bc")));

        assert_eq!(
            ctrl.session().recorded_chunks,
            vec![Bytes::from_static(b"a"), Bytes::from_static(b"bc")]
        );
    }

    #[test]
    fn test_foreign_chunks_are_dropped() {
        let (mut ctrl, _, _) = recording_controller();
        assert!(!ctrl.on_chunk_available(Uuid::new_v4(), Bytes::from_static(b"x")));
        assert!(ctrl.session().recorded_chunks.is_empty());
    }

    #[test]
    fn test_trailing_chunk_after_stop_is_kept() {
        let (mut ctrl, factory, _) = recording_controller();
        ctrl.stop_recording().unwrap();
        assert!(!ctrl.is_recording());
        assert_eq!(ctrl.recording_state(), RecordingState::Finalizing);

        let sink = factory.last_sink().unwrap();
        sink.chunk(Bytes::from_static(b"tail"));
        sink.stopped();

        assert_eq!(ctrl.dispatch_pending_events(), 2);
        assert_eq!(ctrl.recording_state(), RecordingState::Idle);
        assert_eq!(ctrl.session().recorded_chunks, vec![Bytes::from_static(b"tail")]);
    }

    #[test]
    fn test_artifact_refused_while_finalizing() {
        let (mut ctrl, _, id) = recording_controller();
        ctrl.on_chunk_available(id, Bytes::from_static(b"a"));
        ctrl.stop_recording().unwrap();

        assert_eq!(ctrl.build_download_artifact(), Err(CaptureError::RecordingInProgress));
        assert_eq!(ctrl.start_recording(), Err(CaptureError::RecordingInProgress));
    }

    #[test]
    fn test_artifact_concatenates_and_clears() {
        let (mut ctrl, _, id) = recording_controller();
        ctrl.on_chunk_available(id, Bytes::from_static(b"abc"));
        ctrl.on_chunk_available(id, Bytes::from_static(b"de"));
        ctrl.stop_recording().unwrap();
        ctrl.on_recorder_stopped(id);

        let artifact = ctrl.build_download_artifact().unwrap().unwrap();
        assert_eq!(artifact.size(), 5);
        assert_eq!(artifact.file_name, "react-webcam-stream-capture.webm");
        assert_eq!(artifact.mime_type, "video/webm");
        assert!(ctrl.session().recorded_chunks.is_empty());

        assert_eq!(ctrl.build_download_artifact(), Ok(None));
    }

    #[test]
    fn test_discard_while_finalizing_drops_trailing_chunk() {
        let (mut ctrl, factory, id) = recording_controller();
        ctrl.on_chunk_available(id, Bytes::from_static(b"early"));
        ctrl.stop_recording().unwrap();
        ctrl.discard_recording();
        assert!(ctrl.session().recorded_chunks.is_empty());

        let sink = factory.last_sink().unwrap();
        sink.chunk(Bytes::from_static(b"late"));
        sink.stopped();
        ctrl.dispatch_pending_events();

        assert!(ctrl.session().recorded_chunks.is_empty());
        assert_eq!(ctrl.recording_state(), RecordingState::Idle);
    }

    #[test]
    fn test_discard_when_empty() {
        let (mut ctrl, _) = controller();
        ctrl.discard_recording();
        assert!(ctrl.session().recorded_chunks.is_empty());
    }

    #[test]
    fn test_still_and_chunks_are_independent() {
        let (mut ctrl, _, id) = recording_controller();
        ctrl.capture_still().unwrap();
        ctrl.on_chunk_available(id, Bytes::from_static(b"a"));

        ctrl.clear_still();
        assert_eq!(ctrl.session().recorded_chunks.len(), 1);

        ctrl.capture_still().unwrap();
        ctrl.discard_recording();
        assert!(ctrl.session().still_image.is_some());
    }

    #[test]
    fn test_rebind_refused_while_recording() {
        let (mut ctrl, _, _) = recording_controller();
        assert!(matches!(ctrl.bind_stream(), Err(CaptureError::RecordingInProgress)));
        assert_eq!(ctrl.release_stream(), Err(CaptureError::RecordingInProgress));
    }

    #[test]
    fn test_recorder_failure_returns_to_idle() {
        let (mut ctrl, factory, _) = recording_controller();
        factory.last_sink().unwrap().failed("camera unplugged");
        ctrl.dispatch_pending_events();
        assert_eq!(ctrl.recording_state(), RecordingState::Idle);
    }

    #[test]
    fn test_snapshot_labels_devices() {
        let source = SyntheticMediaSource::new(vec![
            DeviceDescriptor::video_input("a", ""),
            DeviceDescriptor::video_input("b", "USB Cam"),
        ]);
        let mut ctrl = CaptureController::new(CaptureConfig::default(), source, ScriptedRecorderFactory::new());
        ctrl.enumerate_devices();

        let snapshot = ctrl.snapshot();
        let labels: Vec<&str> = snapshot.devices.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["Device 1", "USB Cam"]);
        assert!(!snapshot.is_recording);
    }

    #[tokio::test]
    async fn test_finalize_waits_for_stopped_event() {
        let (mut ctrl, factory, _) = recording_controller();
        ctrl.stop_recording().unwrap();

        let sink = factory.last_sink().unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            sink.chunk(Bytes::from_static(b"final"));
            sink.stopped();
        });

        ctrl.finalize().await;
        assert_eq!(ctrl.recording_state(), RecordingState::Idle);
        assert_eq!(ctrl.session().recorded_chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_times_out() {
        let (mut ctrl, _, _) = recording_controller();
        ctrl.stop_recording().unwrap();

        ctrl.finalize().await;
        assert_eq!(ctrl.recording_state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn test_download_recording_saves_artifact() {
        let (mut ctrl, factory, id) = recording_controller();
        ctrl.on_chunk_available(id, Bytes::from_static(b"abc"));
        ctrl.stop_recording().unwrap();
        factory.last_sink().unwrap().stopped();

        let saver = MemorySaver::new();
        let path = ctrl.download_recording(&saver).await.unwrap();
        assert_eq!(path, Some(std::path::PathBuf::from("memory/react-webcam-stream-capture.webm")));
        assert_eq!(saver.saved()[0].data, Bytes::from_static(b"abc"));

        assert_eq!(ctrl.download_recording(&saver).await.unwrap(), None);
        assert_eq!(saver.saved().len(), 1);
    }

    #[test]
    fn test_failed_rebind_restores_previous_stream() {
        let (mut ctrl, _) = controller();
        ctrl.bind_stream().unwrap();

        ctrl.select_device("missing");
        let err = ctrl.bind_stream().unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));

        let stream = ctrl.stream().expect("previous stream should be restored");
        assert!(stream.is_open());
        assert_eq!(stream.info().device_id, "cam-back");
        assert_eq!(ctrl.session().device_id, None);
        assert_eq!(ctrl.source().opened().len(), 2);
        assert!(ctrl.capture_still().unwrap().is_some());
    }

    #[test]
    fn test_failed_first_bind_keeps_selection() {
        let (mut ctrl, _) = controller();
        ctrl.select_device("missing");

        assert!(ctrl.bind_stream().is_err());
        assert!(ctrl.stream().is_none());
        assert_eq!(ctrl.session().device_id.as_deref(), Some("missing"));
    }

    #[test]
    fn test_bind_surfaces_permission_denied() {
        let source = SyntheticMediaSource::with_default_devices()
            .failing_open(CaptureError::PermissionDenied("camera access refused".to_string()));
        let mut ctrl = CaptureController::new(CaptureConfig::default(), source, ScriptedRecorderFactory::new());

        let err = ctrl.bind_stream().unwrap_err();
        assert_eq!(err, CaptureError::PermissionDenied("camera access refused".to_string()));
        assert!(ctrl.stream().is_none());
        assert_eq!(ctrl.start_recording(), Err(CaptureError::NoStream));
    }

    #[test]
    fn test_selection_does_not_reenumerate() {
        let (mut ctrl, _) = controller();
        ctrl.enumerate_devices();
        ctrl.select_device("cam-front");
        ctrl.toggle_facing();
        assert_eq!(ctrl.source().enumeration_count(), 1);

        ctrl.enumerate_devices();
        assert_eq!(ctrl.source().enumeration_count(), 2);
    }

    #[test]
    fn test_recording_preview_keeps_chunks() {
        let (mut ctrl, _, id) = recording_controller();
        assert_eq!(ctrl.recording_preview(), None);

        ctrl.on_chunk_available(id, Bytes::from_static(b"ab"));
        ctrl.on_chunk_available(id, Bytes::from_static(b"cd"));

        let preview = ctrl.recording_preview().unwrap();
        assert_eq!(&preview.data[..], b"abcd");
        assert_eq!(preview.mime_type, "video/webm");
        assert_eq!(ctrl.session().recorded_chunks.len(), 2);

        // previewing again yields the same bytes
        assert_eq!(ctrl.recording_preview().unwrap().data, preview.data);
    }
}
