//! Camera collaborator traits
//!
//! A [`MediaSource`] discovers devices and opens live streams; a
//! [`MediaStream`] hands out frames. Streams are shared between the
//! controller (snapshots) and a running recorder, so they are cheap to clone
//! and take `&self`.

use crate::errors::CaptureError;
use crate::types::{DeviceDescriptor, StillImage, StreamConstraints, StreamInfo};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

/// Platform device discovery and stream binding
pub trait MediaSource {
    type Stream: MediaStream + Clone + Send + 'static;

    /// List every discoverable device, of any kind.
    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>, CaptureError>;

    /// Open a live stream matching the constraints.
    fn open_stream(&mut self, constraints: &StreamConstraints) -> Result<Self::Stream, CaptureError>;
}

/// A live camera stream
pub trait MediaStream {
    fn info(&self) -> &StreamInfo;

    fn is_open(&self) -> bool;

    /// Grab the most recent frame as RGB.
    fn grab_frame(&self) -> Result<RgbImage, CaptureError>;

    /// Point-in-time JPEG snapshot.
    fn snapshot(&self, quality: u8) -> Result<StillImage, CaptureError> {
        if !self.is_open() {
            return Err(CaptureError::NoStream);
        }
        let frame = self.grab_frame()?;
        let jpeg = encode_jpeg(&frame, quality)?;
        Ok(StillImage::jpeg(jpeg, frame.width(), frame.height()))
    }

    fn close(&self) -> Result<(), CaptureError>;
}

/// Encode an RGB frame as JPEG
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(frame)
        .map_err(|e| CaptureError::EncodingError(format!("JPEG encoding failed: {}", e)))?;
    Ok(out)
}
