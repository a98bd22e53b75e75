use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::orientation::ImageOrientation;

/// A decoded still frame as delivered by the hardware, before geometry
/// post-processing.
#[derive(Debug, Clone)]
pub struct RawPhoto {
    pub image: DynamicImage,

    /// EXIF-style orientation tag from the sensor metadata.
    pub orientation_raw: u32,
}

/// A post-processed still, ownership transferred to the caller on delivery.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub image: DynamicImage,
    pub orientation: ImageOrientation,
}

/// Result delivered when a clip recording finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub metadata: RecordingMetadata,
}

impl RecordingResult {
    pub fn new(file_path: PathBuf) -> Self {
        let metadata = RecordingMetadata::new(&file_path);
        Self {
            file_path,
            metadata,
        }
    }
}

/// Metadata exported alongside a recorded clip.
///
/// Serializable for handing off to the caller's media pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_path: String,
    pub container: String,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn new(file_path: &Path) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string_lossy().into_owned(),
            container: file_path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
