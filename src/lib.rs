//! # depthcam - mode negotiation and frame decoding for depth camera SDKs
//!
//! The device-independent core of a multi-stream depth camera SDK:
//! - Per-model mode catalogs and a request/constraint solver that picks one
//!   hardware mode per sub-device ([`StaticCameraInfo::select_mode`])
//! - Bit-exact wire-format codecs turning raw hardware buffers into client
//!   pixel images, plus the frame-counter contract used to align
//!   independently clocked sub-devices
//! - Rigid-pose algebra and per-mode calibration lookups
//! - A capture session with a wait-for-all-streams synchronization point
//!
//! The USB transport, option plumbing, and rendering live outside this crate;
//! a transport feeds raw frames in through [`CaptureSession::deliver`].
//!
//! ## Quick Start
//! ```no_run
//! use depthcam::{catalog, CaptureSession, Preset, Stream};
//! # fn read_device_calibration() -> depthcam::CalibrationInfo { unimplemented!() }
//!
//! let calib = read_device_calibration();
//! let mut session = CaptureSession::new(catalog::sc300(), calib).unwrap();
//! session.enable_stream_preset(Stream::Depth, Preset::BestQuality).unwrap();
//! session.enable_stream_preset(Stream::Color, Preset::BestQuality).unwrap();
//! session.start_capture().unwrap();
//!
//! // ... transport threads call session.deliver(subdevice, raw) ...
//! session.wait_all_streams().unwrap();
//! let depth = session.image(Stream::Depth).unwrap();
//! println!("depth frame {}", session.frame_number(Stream::Depth).unwrap());
//! ```

pub mod calib;
pub mod catalog;
pub mod error;
pub mod math;
pub mod modes;
pub mod session;
pub mod types;
pub mod unpack;

pub use calib::CalibrationInfo;
pub use error::DepthCamError;
pub use math::{Float3, Float3x3, Pose};
pub use modes::{InterstreamRule, RequestField, StaticCameraInfo, StreamMode, SubdeviceMode, WireFormat};
pub use session::{CaptureSession, SubdeviceSlot};
pub use types::*;
pub use unpack::{FrameNumberRoutine, UnpackRoutine};

/// Result type alias for depthcam operations.
pub type Result<T> = std::result::Result<T, DepthCamError>;
