//! Device selection with type preference and graceful fallback.

use crate::models::device::{CameraDeviceInfo, CameraPosition, DeviceKind};
use crate::models::error::{CaptureError, MediaType};

/// Preferred hardware class per mounting position.
///
/// Preferred kinds carry better autofocus and depth data but must never block
/// capture when absent.
fn preferred_kind(position: CameraPosition) -> DeviceKind {
    match position {
        CameraPosition::Front => DeviceKind::DualCamera,
        CameraPosition::Back => DeviceKind::TrueDepth,
    }
}

/// Select the best available device at `position` from the discovery set.
///
/// Prefers the position-specific kind, falls back to the first device at that
/// position, and fails with `DeviceMissing` when the position has no device
/// at all.
pub fn resolve(
    position: CameraPosition,
    devices: &[CameraDeviceInfo],
) -> Result<CameraDeviceInfo, CaptureError> {
    let preferred = preferred_kind(position);

    devices
        .iter()
        .find(|device| device.position == position && device.kind == preferred)
        .or_else(|| devices.iter().find(|device| device.position == position))
        .cloned()
        .ok_or(CaptureError::DeviceMissing(MediaType::Video))
}
