//! Testing utilities for webcam-capture
//!
//! Synthetic stand-ins for the camera, recorder and file-save collaborators,
//! so the controller can be exercised without hardware.

pub mod synthetic_data;

pub use synthetic_data::{
    synthetic_video_frame, MemorySaver, ScriptedRecorder, ScriptedRecorderFactory,
    SyntheticMediaSource, SyntheticStream,
};
