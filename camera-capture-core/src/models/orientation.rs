/// Physical attitude of the device as reported by the motion layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

/// Orientation hint applied to the photo output connection before a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl DeviceOrientation {
    /// Capture orientation for this device attitude.
    ///
    /// The sensor and device coordinate systems are mirrored, so the two
    /// landscape cases swap. Face-up and face-down carry no usable hint and
    /// yield `None`; an unknown attitude falls back to portrait.
    pub fn capture_orientation(self) -> Option<CaptureOrientation> {
        match self {
            Self::Portrait => Some(CaptureOrientation::Portrait),
            Self::PortraitUpsideDown => Some(CaptureOrientation::PortraitUpsideDown),
            Self::LandscapeLeft => Some(CaptureOrientation::LandscapeRight),
            Self::LandscapeRight => Some(CaptureOrientation::LandscapeLeft),
            Self::Unknown => Some(CaptureOrientation::Portrait),
            Self::FaceUp | Self::FaceDown => None,
        }
    }
}

/// Display orientation of captured pixels, as encoded by the standard EXIF
/// orientation tags 1 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageOrientation {
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    Left,
    LeftMirrored,
    Right,
    RightMirrored,
}

impl ImageOrientation {
    /// Map a raw EXIF orientation tag to a display orientation.
    ///
    /// Total over the eight standard tags; anything else yields `None` so the
    /// caller can drop the capture instead of mis-rotating it.
    pub fn from_raw(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::Up),
            2 => Some(Self::UpMirrored),
            3 => Some(Self::Down),
            4 => Some(Self::DownMirrored),
            5 => Some(Self::LeftMirrored),
            6 => Some(Self::Right),
            7 => Some(Self::RightMirrored),
            8 => Some(Self::Left),
            _ => None,
        }
    }

    /// Whether pixels with this orientation came from a landscape capture.
    ///
    /// For this sensor mounting the up/down tags correspond to landscape
    /// stills; everything else is treated as portrait.
    pub fn is_landscape(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}
