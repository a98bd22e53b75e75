//! Camera discovery over `/dev/video*` via the v4l crate.
//!
//! Keeps capture-capable streaming nodes and maps driver card strings to
//! position and hardware-kind descriptors. V4L2 reports no mounting position,
//! so the card name is the only available signal; unmatched cards default to
//! a back-mounted wide-angle camera.

use v4l::capability::Flags;
use v4l::Device;

use camera_capture_core::models::device::{CameraDeviceInfo, CameraPosition, DeviceKind};

/// V4L2 control id for continuous autofocus (`V4L2_CID_FOCUS_AUTO`).
pub(crate) const V4L2_CID_FOCUS_AUTO: u32 = 0x009a_090c;

/// Camera device enumerator over the V4L2 context.
pub struct DeviceEnumerator;

impl DeviceEnumerator {
    /// List capture-capable, streamable video nodes as camera descriptors.
    pub fn list_video_devices() -> Vec<CameraDeviceInfo> {
        let mut devices = Vec::new();

        for node in v4l::context::enum_devices() {
            let path = node.path().to_path_buf();

            let device = match Device::with_path(&path) {
                Ok(device) => device,
                Err(err) => {
                    log::debug!("skipping {}: {err}", path.display());
                    continue;
                }
            };
            let caps = match device.query_caps() {
                Ok(caps) => caps,
                Err(err) => {
                    log::debug!("skipping {}: query_caps failed: {err}", path.display());
                    continue;
                }
            };
            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE)
                || !caps.capabilities.contains(Flags::STREAMING)
            {
                continue;
            }

            let card = caps.card.clone();
            devices.push(CameraDeviceInfo {
                id: path.to_string_lossy().into_owned(),
                position: position_for_card(&card),
                kind: kind_for_card(&card),
                supports_continuous_autofocus: supports_continuous_autofocus(&device),
                name: card,
            });
        }

        devices
    }
}

pub(crate) fn position_for_card(card: &str) -> CameraPosition {
    let lower = card.to_lowercase();
    if lower.contains("front") || lower.contains("user") {
        CameraPosition::Front
    } else {
        CameraPosition::Back
    }
}

pub(crate) fn kind_for_card(card: &str) -> DeviceKind {
    let lower = card.to_lowercase();
    if lower.contains("depth") {
        DeviceKind::TrueDepth
    } else if lower.contains("dual") || lower.contains("stereo") {
        DeviceKind::DualCamera
    } else {
        DeviceKind::WideAngle
    }
}

fn supports_continuous_autofocus(device: &Device) -> bool {
    device
        .query_controls()
        .map(|controls| controls.iter().any(|ctrl| ctrl.id == V4L2_CID_FOCUS_AUTO))
        .unwrap_or(false)
}
