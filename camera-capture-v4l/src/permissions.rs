//! Camera permission probe for Linux video device nodes.
//!
//! V4L2 has no per-app consent dialog; access is governed by node ownership
//! and the `video` group. Opening a node is the only reliable probe, so the
//! status is undetermined until the first `request_access` runs it.
//!
//! A machine with no video nodes at all reports authorized; the absence of a
//! camera is `DeviceMissing` territory, not a permission failure.

use std::io;

use parking_lot::Mutex;
use v4l::Device;

use camera_capture_core::traits::authorization::{AuthorizationProvider, AuthorizationStatus};

/// Permission gate backed by opening `/dev/video*` nodes.
pub struct DeviceNodeAuthorization {
    probed: Mutex<Option<bool>>,
}

impl DeviceNodeAuthorization {
    pub fn new() -> Self {
        Self {
            probed: Mutex::new(None),
        }
    }
}

impl Default for DeviceNodeAuthorization {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationProvider for DeviceNodeAuthorization {
    fn status(&self) -> AuthorizationStatus {
        match *self.probed.lock() {
            None => AuthorizationStatus::NotDetermined,
            Some(true) => AuthorizationStatus::Authorized,
            Some(false) => AuthorizationStatus::Denied,
        }
    }

    fn request_access(&self, response: Box<dyn FnOnce(bool) + Send + 'static>) {
        let granted = probe_device_nodes();
        *self.probed.lock() = Some(granted);
        response(granted);
    }
}

/// Try to open each video node; an access error on every node means the user
/// lacks device permissions.
fn probe_device_nodes() -> bool {
    let mut saw_denied = false;

    for node in v4l::context::enum_devices() {
        match Device::with_path(node.path()) {
            Ok(_) => return true,
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                log::warn!("access denied opening {}", node.path().display());
                saw_denied = true;
            }
            Err(err) => {
                log::debug!("could not open {}: {err}", node.path().display());
            }
        }
    }

    !saw_denied
}
