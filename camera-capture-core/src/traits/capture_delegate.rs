use crate::models::capture_result::{CapturedImage, RecordingResult};

/// Event delegate for capture controller results.
///
/// Each callback fires at most once per request and is marshalled through the
/// controller's main dispatcher before invocation.
pub trait CaptureControllerDelegate: Send + Sync {
    /// A processed still is ready.
    fn on_image_captured(&self, image: CapturedImage);

    /// A recorded clip was finalized.
    fn on_video_recorded(&self, result: RecordingResult);
}
