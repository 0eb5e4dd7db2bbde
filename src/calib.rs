//! Per-device calibration: intrinsics tables, stream extrinsics, depth scale.
//!
//! Populated from device-read calibration blobs at open time and read-only
//! afterwards. Invalid calibration is fatal at open time only; nothing here
//! is consulted on the frame-delivery path.

use crate::math::{Float3, Pose};
use crate::modes::{StaticCameraInfo, StreamMode};
use crate::types::{Intrinsics, Stream};
use crate::{DepthCamError, Result};

#[derive(Debug, Clone)]
pub struct CalibrationInfo {
    /// Indexed by [`StreamMode::intrinsics_index`].
    pub intrinsics: Vec<Intrinsics>,
    pub stream_poses: [Pose; Stream::COUNT],
    /// Meters per depth unit.
    pub depth_scale: f32,
}

impl CalibrationInfo {
    /// Intrinsics of one client stream under the active mode.
    pub fn intrinsics_for(&self, mode: &StreamMode) -> &Intrinsics {
        &self.intrinsics[mode.intrinsics_index]
    }

    /// Rigid transform from the stream's coordinate frame to the device
    /// reference frame.
    pub fn pose_for(&self, stream: Stream) -> Pose {
        self.stream_poses[stream as usize]
    }

    pub fn depth_scale(&self) -> f32 {
        self.depth_scale
    }

    /// Reject calibration data that cannot serve the given catalog: a short
    /// intrinsics table, a non-positive depth scale, or a non-orthonormal
    /// stream orientation.
    pub fn validate(&self, info: &StaticCameraInfo) -> Result<()> {
        let required = info.required_intrinsics();
        if self.intrinsics.len() < required {
            return Err(DepthCamError::InvalidCalibration(format!(
                "{} intrinsics present, catalog references {}",
                self.intrinsics.len(),
                required
            )));
        }
        if !(self.depth_scale > 0.0) {
            return Err(DepthCamError::InvalidCalibration(format!(
                "depth scale {} is not positive",
                self.depth_scale
            )));
        }
        for stream in Stream::ALL {
            let orientation = self.pose_for(stream).orientation;
            // R is orthonormal iff transpose(R) * R is the identity in every
            // entry; the diagonal alone misses non-orthogonal unit columns.
            let residual = orientation.transpose() * orientation;
            let near = |a: Float3, b: Float3| {
                (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4 && (a.z - b.z).abs() < 1e-4
            };
            let ok = near(residual.x, Float3::new(1.0, 0.0, 0.0))
                && near(residual.y, Float3::new(0.0, 1.0, 0.0))
                && near(residual.z, Float3::new(0.0, 0.0, 1.0));
            if !ok {
                return Err(DepthCamError::InvalidCalibration(format!(
                    "orientation for {stream} is not orthonormal"
                )));
            }
        }
        Ok(())
    }
}
