//! # camera-capture-v4l
//!
//! Linux V4L2 backend for camera-capture-kit.
//!
//! Provides:
//! - `V4lBackend` — `CaptureBackend` implementation over `/dev/video*` with a
//!   dedicated frame-loop thread serving photo requests and clip recording
//! - `DeviceEnumerator` — camera discovery with position/kind heuristics
//! - `permissions` — device-node access probe implementing
//!   `AuthorizationProvider`
//!
//! ## Platform Requirements
//! - A V4L2-capable kernel with capture devices exposed at `/dev/video*`
//! - The process user in the `video` group (or equivalent node access)
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//!
//! use camera_capture_core::CaptureController;
//! use camera_capture_v4l::{DeviceNodeAuthorization, V4lBackend};
//!
//! let backend = V4lBackend::new();
//! let mut controller =
//!     CaptureController::new(backend, Arc::new(DeviceNodeAuthorization::new()));
//! controller.setup();
//! controller.handle_visible();
//! ```

#[cfg(target_os = "linux")]
pub mod device_enumerator;
#[cfg(target_os = "linux")]
pub mod permissions;
#[cfg(target_os = "linux")]
pub mod v4l_backend;

#[cfg(target_os = "linux")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "linux")]
pub use permissions::DeviceNodeAuthorization;
#[cfg(target_os = "linux")]
pub use v4l_backend::V4lBackend;
