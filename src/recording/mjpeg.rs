//! Motion-JPEG recorder
//!
//! Grabs frames from the bound stream on a dedicated thread, encodes each one
//! as JPEG and emits the concatenated frames as a Motion-JPEG byte stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{ChunkSink, RecorderFactory, RecorderHandle, RecorderOptions};
use crate::errors::CaptureError;
use crate::media::{encode_jpeg, MediaStream};

pub const MJPEG_MIME_TYPE: &str = "video/x-motion-jpeg";

/// How long dropping a recorder waits for its thread to exit
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Creates [`MjpegRecorder`]s
#[derive(Debug, Default, Clone)]
pub struct MjpegRecorderFactory;

impl<S> RecorderFactory<S> for MjpegRecorderFactory
where
    S: MediaStream + Clone + Send + 'static,
{
    type Handle = MjpegRecorder<S>;

    fn create(
        &mut self,
        stream: &S,
        options: &RecorderOptions,
        sink: ChunkSink,
    ) -> Result<Self::Handle, CaptureError> {
        if !stream.is_open() {
            return Err(CaptureError::RecorderInitFailed(format!(
                "stream for device {} is not open",
                stream.info().device_id
            )));
        }

        if options.mime_type != MJPEG_MIME_TYPE {
            log::debug!(
                "Requested {} but recorder produces {}",
                options.mime_type,
                MJPEG_MIME_TYPE
            );
        }

        Ok(MjpegRecorder {
            stream: stream.clone(),
            options: options.clone(),
            sink,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }
}

/// Recorder thread bound to one stream
pub struct MjpegRecorder<S> {
    stream: S,
    options: RecorderOptions,
    sink: ChunkSink,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<S> RecorderHandle for MjpegRecorder<S>
where
    S: MediaStream + Clone + Send + 'static,
{
    fn mime_type(&self) -> &str {
        MJPEG_MIME_TYPE
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let stream = self.stream.clone();
        let options = self.options.clone();
        let sink = self.sink.clone();
        let stop_flag = self.stop_flag.clone();

        let handle = std::thread::Builder::new()
            .name("webcam-capture-recorder".to_string())
            .spawn(move || record_loop(stream, options, sink, stop_flag))
            .map_err(|e| CaptureError::RecorderInitFailed(format!("spawn failed: {e}")))?;

        self.worker = Some(handle);
        log::info!("Recorder {} started", self.sink.recording_id());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if self.worker.is_none() {
            return Err(CaptureError::NotRecording);
        }
        self.stop_flag.store(true, Ordering::Release);
        log::info!("Recorder {} stopping", self.sink.recording_id());
        Ok(())
    }
}

impl<S> Drop for MjpegRecorder<S> {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        let Some(handle) = self.worker.take() else {
            return;
        };

        // a frame grab in flight may block past the timeout
        let start = Instant::now();
        while !handle.is_finished() {
            if start.elapsed() >= JOIN_TIMEOUT {
                log::warn!(
                    "Recorder {} did not exit within {:?}, detaching",
                    self.sink.recording_id(),
                    JOIN_TIMEOUT
                );
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        if handle.join().is_err() {
            log::error!("Recorder {} thread panicked", self.sink.recording_id());
        }
    }
}

fn record_loop<S: MediaStream>(
    stream: S,
    options: RecorderOptions,
    sink: ChunkSink,
    stop_flag: Arc<AtomicBool>,
) {
    let frame_interval = Duration::from_secs_f64(1.0 / options.max_fps.max(1) as f64);
    let mut buffer: Vec<u8> = Vec::new();
    let mut last_flush = Instant::now();
    let mut frames: u64 = 0;

    while !stop_flag.load(Ordering::Acquire) {
        let tick = Instant::now();

        match stream.grab_frame() {
            Ok(frame) => match encode_jpeg(&frame, options.frame_quality) {
                Ok(jpeg) => {
                    buffer.extend_from_slice(&jpeg);
                    frames += 1;
                }
                Err(e) => log::warn!("Dropping frame: {}", e),
            },
            Err(e) => {
                log::error!("Recorder {} lost its stream: {}", sink.recording_id(), e);
                if !buffer.is_empty() {
                    sink.chunk(std::mem::take(&mut buffer));
                }
                sink.failed(e.to_string());
                return;
            }
        }

        if let Some(timeslice) = options.timeslice {
            if last_flush.elapsed() >= timeslice && !buffer.is_empty() {
                if !sink.chunk(std::mem::take(&mut buffer)) {
                    log::debug!("Controller gone, recorder {} exiting", sink.recording_id());
                    return;
                }
                last_flush = Instant::now();
            }
        }

        if let Some(remaining) = frame_interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    if !buffer.is_empty() {
        sink.chunk(buffer);
    }
    log::debug!("Recorder {} finished after {} frames", sink.recording_id(), frames);
    sink.stopped();
}
