use crate::types::{CameraOption, Stream};

/// Errors surfaced by mode negotiation, frame delivery, and the capture session.
#[derive(Debug, thiserror::Error)]
pub enum DepthCamError {
    #[error("no compatible mode for subdevice {subdevice} under the current stream requests")]
    NoCompatibleMode { subdevice: usize },

    #[error("stream {0} is not supported by this camera model")]
    UnsupportedStream(Stream),

    #[error("option {0} is not supported by this camera model")]
    UnsupportedOption(CameraOption),

    #[error("bad frame size for subdevice {subdevice}: expected {expected} bytes, got {got}")]
    BadFrameSize {
        subdevice: usize,
        expected: usize,
        got: usize,
    },

    #[error("invalid calibration data: {0}")]
    InvalidCalibration(String),

    #[error("invalid mode catalog: {0}")]
    InvalidCatalog(String),

    #[error("stream {0} is not enabled")]
    StreamNotEnabled(Stream),

    #[error("no streams enabled")]
    NoStreamsEnabled,

    #[error("capture has not been started")]
    CaptureNotStarted,

    #[error("operation not permitted while capture is running")]
    CaptureRunning,

    #[error("capture stopped")]
    StreamStopped,
}
