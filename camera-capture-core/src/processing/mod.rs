pub mod geometry;

pub use geometry::{
    crop_to_preview_viewport, downsample, normalize_orientation, CAPTURE_WORKING_BOUND,
};
