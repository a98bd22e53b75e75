/// Per-capture flash behaviour.
///
/// Cycling is a pure state transition; the mode only reaches the hardware as
/// part of the settings attached to the next photo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

impl FlashMode {
    /// Cycle to the next mode: Off -> On -> Auto -> Off.
    pub fn next(self) -> Self {
        match self {
            Self::On => Self::Auto,
            Self::Auto => Self::Off,
            Self::Off => Self::On,
        }
    }

    /// Icon identifier for the flash status button.
    pub fn symbol_name(self) -> &'static str {
        match self {
            Self::On => "bolt.fill",
            Self::Auto => "bolt.badge.a.fill",
            Self::Off => "bolt.slash.fill",
        }
    }
}
