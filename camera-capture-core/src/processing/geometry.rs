//! Image geometry post-processing: downsampling, viewport cropping, and
//! orientation normalization.
//!
//! The still image covers the full sensor field of view, which is wider than
//! the on-screen preview viewport; the crop here brings the delivered still
//! in line with what the user framed. All degradations are graceful: a failed
//! crop returns the uncropped image, a degenerate downsample bound yields
//! `None`.

use image::DynamicImage;

use crate::models::geometry::{PreviewViewport, Rect, Size};
use crate::models::orientation::ImageOrientation;

/// Longest-edge bound applied to full-resolution captures before cropping.
pub const CAPTURE_WORKING_BOUND: Size = Size::new(1600.0, 1600.0);

/// Downsample `image` so its longest edge fits within
/// `max(target.width, target.height) * scale`, preserving aspect ratio.
///
/// An image already inside the bound is returned unscaled; content is never
/// upscaled. A degenerate bound yields `None`.
pub fn downsample(image: &DynamicImage, target: Size, scale: f32) -> Option<DynamicImage> {
    let bound = target.max_dimension() * scale;
    if !bound.is_finite() || bound < 1.0 {
        return None;
    }
    let bound = bound.floor() as u32;

    if image.width().max(image.height()) <= bound {
        return Some(image.clone());
    }
    Some(image.thumbnail(bound, bound))
}

/// Crop the full-sensor still down to the area visible in the preview.
///
/// Scale factors relate image pixels to the viewport's sensor rect in view
/// coordinates. Landscape captures (up/down tags) swap the axis mapping: the
/// width/height factors trade places and the crop offset takes the viewport's
/// vertical origin for the horizontal axis and vice versa. An out-of-bounds
/// or degenerate crop rect returns the uncropped image unchanged.
pub fn crop_to_preview_viewport(
    image: &DynamicImage,
    orientation: ImageOrientation,
    viewport: &PreviewViewport,
) -> DynamicImage {
    let sensor = viewport.sensor_rect;
    let bounds = viewport.view_bounds;
    let image_width = image.width() as f32;
    let image_height = image.height() as f32;

    let crop = if orientation.is_landscape() {
        let factor_x = image_width / sensor.size.height;
        let factor_y = image_height / sensor.size.width;
        Rect::new(
            -sensor.origin.y * factor_x,
            sensor.origin.x * factor_y,
            bounds.height * factor_x,
            bounds.width * factor_y,
        )
    } else {
        let factor_x = image_width / sensor.size.width;
        let factor_y = image_height / sensor.size.height;
        Rect::new(
            sensor.origin.x * factor_x,
            -sensor.origin.y * factor_y,
            bounds.width * factor_x,
            bounds.height * factor_y,
        )
    };

    match crop_rect(image, crop) {
        Some(cropped) => cropped,
        None => {
            log::warn!(
                "crop rect {:?} outside {}x{} image, returning uncropped",
                crop,
                image.width(),
                image.height()
            );
            image.clone()
        }
    }
}

/// Crop `image` to `rect` in pixel space.
///
/// Tolerates sub-pixel overshoot from the float scale factors; anything
/// further out of bounds yields `None`.
fn crop_rect(image: &DynamicImage, rect: Rect) -> Option<DynamicImage> {
    let image_width = i64::from(image.width());
    let image_height = i64::from(image.height());

    let x = rect.origin.x.round() as i64;
    let y = rect.origin.y.round() as i64;
    let mut width = rect.size.width.round() as i64;
    let mut height = rect.size.height.round() as i64;

    if x < 0 || y < 0 || width <= 0 || height <= 0 {
        return None;
    }
    if x + width > image_width {
        if x + width - image_width > 1 {
            return None;
        }
        width = image_width - x;
    }
    if y + height > image_height {
        if y + height - image_height > 1 {
            return None;
        }
        height = image_height - y;
    }
    if width <= 0 || height <= 0 {
        return None;
    }

    Some(image.crop_imm(x as u32, y as u32, width as u32, height as u32))
}

/// Bake `orientation` into the pixel data so the result renders upright
/// without carrying an orientation tag.
pub fn normalize_orientation(image: &DynamicImage, orientation: ImageOrientation) -> DynamicImage {
    match orientation {
        ImageOrientation::Up => image.clone(),
        ImageOrientation::UpMirrored => image.fliph(),
        ImageOrientation::Down => image.rotate180(),
        ImageOrientation::DownMirrored => image.flipv(),
        ImageOrientation::Right => image.rotate90(),
        ImageOrientation::Left => image.rotate270(),
        ImageOrientation::LeftMirrored => image.rotate90().fliph(),
        ImageOrientation::RightMirrored => image.rotate270().fliph(),
    }
}
