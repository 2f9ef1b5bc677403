use crate::errors::CaptureError;
use crate::media::{MediaSource, MediaStream};
use crate::types::{DeviceDescriptor, StreamConstraints, StreamInfo};
use image::RgbImage;
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraFormat as NokhwaFormat, CameraIndex, FrameFormat, RequestedFormat,
        RequestedFormatType, Resolution,
    },
    CallbackCamera,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Camera discovery and streaming through nokhwa's native backend
#[derive(Debug, Clone, Default)]
pub struct NokhwaMediaSource;

impl MediaSource for NokhwaMediaSource {
    type Stream = NokhwaStream;

    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        let cameras = query(ApiBackend::Auto)
            .map_err(|e| CaptureError::from_platform("Failed to query cameras", e.to_string()))?;

        Ok(cameras
            .into_iter()
            .map(|info| DeviceDescriptor::video_input(info.index().to_string(), info.human_name()))
            .collect())
    }

    fn open_stream(&mut self, constraints: &StreamConstraints) -> Result<NokhwaStream, CaptureError> {
        let devices = self.enumerate()?;
        let device = constraints.resolve_device(&devices).ok_or_else(|| match &constraints.device_id {
            Some(id) => CaptureError::DeviceUnavailable(format!("camera {} not found", id)),
            None => CaptureError::DeviceUnavailable("no camera found".to_string()),
        })?;

        let index = match device.id.parse::<u32>() {
            Ok(n) => CameraIndex::Index(n),
            Err(_) => CameraIndex::String(device.id.clone()),
        };

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            NokhwaFormat::new(
                Resolution::new(constraints.width, constraints.height),
                FrameFormat::MJPEG,
                constraints.fps,
            ),
        ));

        let mut camera = CallbackCamera::new(index, requested, |_| {})
            .map_err(|e| CaptureError::from_platform("Failed to initialize camera", e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::from_platform("Failed to start stream", e.to_string()))?;

        log::info!("Opened camera {} ({})", device.id, device.label);

        Ok(NokhwaStream {
            camera: Arc::new(Mutex::new(camera)),
            open: Arc::new(AtomicBool::new(true)),
            info: StreamInfo {
                device_id: device.id.clone(),
                label: device.label.clone(),
                width: constraints.width,
                height: constraints.height,
            },
        })
    }
}

/// Live nokhwa stream shared between snapshots and the recorder
#[derive(Clone)]
pub struct NokhwaStream {
    camera: Arc<Mutex<CallbackCamera>>,
    open: Arc<AtomicBool>,
    info: StreamInfo,
}

impl MediaStream for NokhwaStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn grab_frame(&self) -> Result<RgbImage, CaptureError> {
        if !self.is_open() {
            return Err(CaptureError::NoStream);
        }

        let mut camera = self
            .camera
            .lock()
            .map_err(|_| CaptureError::StreamError("Failed to lock camera".to_string()))?;

        let buffer = camera
            .poll_frame()
            .map_err(|e| CaptureError::StreamError(format!("Failed to capture frame: {}", e)))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::StreamError(format!("Failed to decode frame: {}", e)))?;

        let (width, height) = (decoded.width(), decoded.height());
        RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
            CaptureError::StreamError(format!("Frame buffer does not match {}x{}", width, height))
        })
    }

    fn close(&self) -> Result<(), CaptureError> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let mut camera = self
            .camera
            .lock()
            .map_err(|_| CaptureError::StreamError("Failed to lock camera".to_string()))?;
        camera
            .stop_stream()
            .map_err(|e| CaptureError::StreamError(format!("Failed to stop stream: {}", e)))?;

        log::info!("Closed camera {}", self.info.device_id);
        Ok(())
    }
}
