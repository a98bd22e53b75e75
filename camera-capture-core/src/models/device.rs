/// Physical mounting position of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraPosition {
    Front,
    Back,
}

impl CameraPosition {
    pub fn opposite(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// Hardware class of a camera device.
///
/// Dual-camera and depth-capable classes provide better autofocus and depth
/// data; the plain wide-angle class is the universal fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    WideAngle,
    DualCamera,
    TrueDepth,
}

/// Descriptor for a physical capture device.
///
/// Owned by the enumeration layer; the session stores the descriptor of the
/// active device next to its input handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDeviceInfo {
    pub id: String,
    pub name: String,
    pub position: CameraPosition,
    pub kind: DeviceKind,
    pub supports_continuous_autofocus: bool,
}
