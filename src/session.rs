//! Capture session: request management, per-sub-device frame state, and the
//! wait-for-all-streams synchronization point.
//!
//! The transport delivers raw frames through [`CaptureSession::deliver`] (or
//! a per-sub-device [`SubdeviceSlot`] handle), one serialized callback chain
//! per sub-device; different sub-devices may deliver concurrently. Each slot
//! publishes its latest decoded frame under a mutex with the delivery path as
//! sole writer, double-buffered so readers never observe a torn image.

use crate::calib::CalibrationInfo;
use crate::math::Pose;
use crate::modes::{StaticCameraInfo, StreamMode, SubdeviceMode};
use crate::types::{image_size, CameraOption, Format, Intrinsics, Preset, Stream, StreamRequest};
use crate::{DepthCamError, Result};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SlotState {
    running: bool,
    has_frame: bool,
    frame_number: u32,
    /// Latest published image per carried stream, in `mode.streams` order.
    front: Vec<Vec<u8>>,
}

/// Shared frame state for one active sub-device.
pub struct SubdeviceSlot {
    mode: SubdeviceMode,
    /// Scratch buffers the delivery path unpacks into before publishing.
    /// Uncontended: the transport serializes deliveries per sub-device.
    back: Mutex<Vec<Vec<u8>>>,
    state: Mutex<SlotState>,
    cond: Condvar,
}

impl SubdeviceSlot {
    fn new(mode: SubdeviceMode) -> Self {
        let buffers = || -> Vec<Vec<u8>> {
            mode.streams
                .iter()
                .map(|s| vec![0u8; image_size(s.width, s.height, s.format)])
                .collect()
        };
        SubdeviceSlot {
            back: Mutex::new(buffers()),
            state: Mutex::new(SlotState {
                running: true,
                has_frame: false,
                frame_number: 0,
                front: buffers(),
            }),
            cond: Condvar::new(),
            mode,
        }
    }

    pub fn mode(&self) -> &SubdeviceMode {
        &self.mode
    }

    /// Accept one raw frame from the transport. Returns `Ok(true)` when a
    /// new frame was published, `Ok(false)` for duplicates or after stop.
    /// A wrong-length buffer is reported and dropped; the stream continues.
    pub fn deliver(&self, raw: &[u8]) -> Result<bool> {
        let expected = self.mode.wire_frame_size();
        if raw.len() != expected {
            log::warn!(
                "subdevice {}: dropping frame of {} bytes (expected {})",
                self.mode.subdevice,
                raw.len(),
                expected
            );
            return Err(DepthCamError::BadFrameSize {
                subdevice: self.mode.subdevice,
                expected,
                got: raw.len(),
            });
        }

        let number = self.mode.frame_number(raw);
        {
            let state = lock(&self.state);
            if !state.running {
                return Ok(false);
            }
            if state.has_frame && number <= state.frame_number {
                log::trace!(
                    "subdevice {}: frame {} not newer than {}, skipping",
                    self.mode.subdevice,
                    number,
                    state.frame_number
                );
                return Ok(false);
            }
        }

        // Unpack outside the publish lock so waiters never block on decode.
        let mut back = lock(&self.back);
        self.mode.unpack(&mut back, raw);

        let mut state = lock(&self.state);
        if !state.running {
            return Ok(false);
        }
        std::mem::swap(&mut state.front, &mut *back);
        state.frame_number = number;
        state.has_frame = true;
        self.cond.notify_all();
        Ok(true)
    }

    /// Block until a frame newer than `last` is published.
    fn wait_newer(&self, last: Option<u32>) -> Result<u32> {
        let mut state = lock(&self.state);
        loop {
            if state.has_frame && last.map_or(true, |l| state.frame_number > l) {
                return Ok(state.frame_number);
            }
            if !state.running {
                return Err(DepthCamError::StreamStopped);
            }
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn stop(&self) {
        let mut state = lock(&self.state);
        state.running = false;
        self.cond.notify_all();
    }

    fn frame_number(&self) -> u32 {
        lock(&self.state).frame_number
    }

    fn image(&self, index: usize) -> Vec<u8> {
        lock(&self.state).front[index].clone()
    }
}

/// One opened camera: its catalog and calibration, the client's request
/// table, and (while capturing) the per-sub-device frame slots.
pub struct CaptureSession {
    info: StaticCameraInfo,
    calib: CalibrationInfo,
    requests: [StreamRequest; Stream::COUNT],
    slots: Vec<Arc<SubdeviceSlot>>,
    /// Last frame number handed out by `wait_all_streams`, per slot.
    observed: Mutex<Vec<Option<u32>>>,
    capturing: bool,
}

impl CaptureSession {
    /// Open a session over a model catalog and its device calibration.
    /// Invalid calibration is fatal here; nothing later re-checks it.
    pub fn new(info: StaticCameraInfo, calib: CalibrationInfo) -> Result<Self> {
        info.validate()?;
        calib.validate(&info)?;
        Ok(CaptureSession {
            info,
            calib,
            requests: [StreamRequest::default(); Stream::COUNT],
            slots: Vec::new(),
            observed: Mutex::new(Vec::new()),
            capturing: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &StaticCameraInfo {
        &self.info
    }

    pub fn enable_stream(
        &mut self,
        stream: Stream,
        width: u32,
        height: u32,
        format: Format,
        fps: u32,
    ) -> Result<()> {
        self.set_request(stream, StreamRequest::new(width, height, format, fps))
    }

    pub fn enable_stream_preset(&mut self, stream: Stream, preset: Preset) -> Result<()> {
        self.set_request(stream, self.info.preset_request(stream, preset))
    }

    fn set_request(&mut self, stream: Stream, request: StreamRequest) -> Result<()> {
        if self.capturing {
            return Err(DepthCamError::CaptureRunning);
        }
        if !self.info.supports_stream(stream) {
            return Err(DepthCamError::UnsupportedStream(stream));
        }
        self.requests[stream as usize] = request;
        Ok(())
    }

    pub fn disable_stream(&mut self, stream: Stream) -> Result<()> {
        if self.capturing {
            return Err(DepthCamError::CaptureRunning);
        }
        self.requests[stream as usize] = StreamRequest::default();
        Ok(())
    }

    pub fn is_stream_enabled(&self, stream: Stream) -> bool {
        self.requests[stream as usize].enabled
    }

    pub fn supports_option(&self, option: CameraOption) -> bool {
        self.info.supports_option(option)
    }

    /// Typed rejection for capabilities this model does not carry.
    pub fn verify_option(&self, option: CameraOption) -> Result<()> {
        if self.info.supports_option(option) {
            Ok(())
        } else {
            Err(DepthCamError::UnsupportedOption(option))
        }
    }

    /// Resolve one hardware mode per active sub-device and create its frame
    /// slot. Fails without side effects when any sub-device has no
    /// compatible mode.
    pub fn start_capture(&mut self) -> Result<()> {
        if self.capturing {
            return Err(DepthCamError::CaptureRunning);
        }

        let mut subdevices: Vec<usize> = Stream::ALL
            .iter()
            .filter(|&&s| self.requests[s as usize].enabled)
            .filter_map(|&s| self.info.subdevice_for(s))
            .collect();
        subdevices.sort_unstable();
        subdevices.dedup();
        if subdevices.is_empty() {
            return Err(DepthCamError::NoStreamsEnabled);
        }

        let mut modes = Vec::with_capacity(subdevices.len());
        for &subdevice in &subdevices {
            let mode = self
                .info
                .select_mode(&self.requests, subdevice)
                .ok_or(DepthCamError::NoCompatibleMode { subdevice })?;
            modes.push(mode.clone());
        }

        for mode in &modes {
            log::info!(
                "{}: subdevice {} -> {}x{} {:?} @ {} fps ({} streams)",
                self.info.name,
                mode.subdevice,
                mode.width,
                mode.height,
                mode.wire_format,
                mode.fps,
                mode.streams.len()
            );
        }

        self.slots = modes
            .into_iter()
            .map(|mode| Arc::new(SubdeviceSlot::new(mode)))
            .collect();
        *lock(&self.observed) = vec![None; self.slots.len()];
        self.capturing = true;
        Ok(())
    }

    /// Stop capture and wake any blocked waiter. Safe while delivery
    /// callbacks are in flight; they become no-ops.
    pub fn stop_capture(&mut self) {
        for slot in &self.slots {
            slot.stop();
        }
        if self.capturing {
            log::info!("{}: capture stopped", self.info.name);
        }
        self.capturing = false;
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Shared handle for the transport thread serving one sub-device.
    pub fn slot(&self, subdevice: usize) -> Option<Arc<SubdeviceSlot>> {
        self.slots
            .iter()
            .find(|slot| slot.mode.subdevice == subdevice)
            .cloned()
    }

    /// Transport-facing delivery entry point. Callable concurrently for
    /// different sub-devices.
    pub fn deliver(&self, subdevice: usize, raw: &[u8]) -> Result<bool> {
        match self.slot(subdevice) {
            Some(slot) => slot.deliver(raw),
            None => Ok(false),
        }
    }

    /// Block until every active sub-device has published a frame newer than
    /// the one observed by the previous call.
    pub fn wait_all_streams(&self) -> Result<()> {
        if self.slots.is_empty() {
            return Err(DepthCamError::CaptureNotStarted);
        }
        let mut observed = lock(&self.observed);
        for (i, slot) in self.slots.iter().enumerate() {
            let number = slot.wait_newer(observed[i])?;
            observed[i] = Some(number);
        }
        Ok(())
    }

    fn active_slot(&self, stream: Stream) -> Result<(&Arc<SubdeviceSlot>, usize)> {
        if self.slots.is_empty() {
            return Err(DepthCamError::CaptureNotStarted);
        }
        if !self.is_stream_enabled(stream) {
            return Err(DepthCamError::StreamNotEnabled(stream));
        }
        self.slots
            .iter()
            .find_map(|slot| {
                slot.mode
                    .streams
                    .iter()
                    .position(|s| s.stream == stream)
                    .map(|index| (slot, index))
            })
            .ok_or(DepthCamError::StreamNotEnabled(stream))
    }

    /// The stream's geometry and format under the selected mode.
    pub fn stream_mode(&self, stream: Stream) -> Result<&StreamMode> {
        let (slot, index) = self.active_slot(stream)?;
        Ok(&slot.mode.streams[index])
    }

    pub fn stream_intrinsics(&self, stream: Stream) -> Result<&Intrinsics> {
        Ok(self.calib.intrinsics_for(self.stream_mode(stream)?))
    }

    pub fn pose_for(&self, stream: Stream) -> Pose {
        self.calib.pose_for(stream)
    }

    pub fn depth_scale(&self) -> f32 {
        self.calib.depth_scale()
    }

    /// Latest unpacked image for a stream. Zero-filled until the first frame
    /// is published; call [`wait_all_streams`](Self::wait_all_streams) first.
    pub fn image(&self, stream: Stream) -> Result<Vec<u8>> {
        let (slot, index) = self.active_slot(stream)?;
        Ok(slot.image(index))
    }

    /// Latest decoded hardware frame counter for a stream's sub-device.
    pub fn frame_number(&self, stream: Stream) -> Result<u32> {
        let (slot, _) = self.active_slot(stream)?;
        Ok(slot.frame_number())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop_capture();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{StaticCameraInfo, StreamMode, SubdeviceMode, WireFormat};
    use crate::types::{Distortion, Format};
    use crate::unpack::{FrameNumberRoutine, UnpackRoutine};

    fn tiny_info() -> StaticCameraInfo {
        let mut info = StaticCameraInfo::new("tiny");
        info.stream_subdevices[Stream::Depth as usize] = Some(0);
        info.stream_subdevices[Stream::Color as usize] = Some(1);
        info.subdevice_modes = vec![
            SubdeviceMode {
                subdevice: 0,
                width: 4,
                height: 4,
                wire_format: WireFormat::Z16,
                fps: 30,
                streams: vec![StreamMode {
                    stream: Stream::Depth,
                    width: 4,
                    height: 4,
                    format: Format::Z16,
                    fps: 30,
                    intrinsics_index: 0,
                }],
                unpacker: UnpackRoutine::Strided,
                frame_counter: FrameNumberRoutine::TrailerLe32,
            },
            SubdeviceMode {
                subdevice: 1,
                width: 2,
                height: 2,
                wire_format: WireFormat::Yuyv,
                fps: 30,
                streams: vec![StreamMode {
                    stream: Stream::Color,
                    width: 2,
                    height: 2,
                    format: Format::Rgb8,
                    fps: 30,
                    intrinsics_index: 1,
                }],
                unpacker: UnpackRoutine::YuyvToRgb,
                frame_counter: FrameNumberRoutine::HeaderLe32,
            },
        ];
        info
    }

    fn tiny_calib() -> CalibrationInfo {
        let intrin = Intrinsics {
            image_size: [4, 4],
            focal_length: [2.0, 2.0],
            principal_point: [1.5, 1.5],
            distortion_coeff: [0.0; 5],
            distortion: Distortion::None,
        };
        CalibrationInfo {
            intrinsics: vec![intrin, intrin],
            stream_poses: [Pose::IDENTITY; Stream::COUNT],
            depth_scale: 0.001,
        }
    }

    fn started_session() -> CaptureSession {
        let mut session = CaptureSession::new(tiny_info(), tiny_calib()).unwrap();
        session
            .enable_stream(Stream::Depth, 4, 4, Format::Z16, 30)
            .unwrap();
        session
            .enable_stream(Stream::Color, 2, 2, Format::Rgb8, 30)
            .unwrap();
        session.start_capture().unwrap();
        session
    }

    fn depth_frame(counter: u32) -> Vec<u8> {
        let mut raw = vec![0x11u8; 32];
        let end = raw.len();
        raw[end - 4..].copy_from_slice(&counter.to_le_bytes());
        raw
    }

    fn color_frame(counter: u32) -> Vec<u8> {
        let mut raw = vec![128u8; 8];
        raw[0..4].copy_from_slice(&counter.to_le_bytes());
        raw
    }

    #[test]
    fn test_wait_all_streams_with_concurrent_delivery() {
        let session = started_session();

        std::thread::scope(|scope| {
            let depth_slot = session.slot(0).unwrap();
            let color_slot = session.slot(1).unwrap();
            scope.spawn(move || {
                for n in 1..=3u32 {
                    depth_slot.deliver(&depth_frame(n)).unwrap();
                }
            });
            scope.spawn(move || {
                for n in 1..=3u32 {
                    color_slot.deliver(&color_frame(n)).unwrap();
                }
            });

            session.wait_all_streams().unwrap();
            let first_depth = session.frame_number(Stream::Depth).unwrap();
            assert!(first_depth >= 1);
            assert_eq!(session.image(Stream::Depth).unwrap().len(), 4 * 4 * 2);
            assert_eq!(session.image(Stream::Color).unwrap().len(), 2 * 2 * 3);
        });

        // Afterwards, all frames are in; the counters landed at 3.
        assert_eq!(session.frame_number(Stream::Depth).unwrap(), 3);
        assert_eq!(session.frame_number(Stream::Color).unwrap(), 3);
    }

    #[test]
    fn test_wait_requires_strictly_newer_frames() {
        let session = started_session();
        session.deliver(0, &depth_frame(5)).unwrap();
        session.deliver(1, &color_frame(5)).unwrap();
        session.wait_all_streams().unwrap();

        // Re-delivering the same counters publishes nothing; only newer
        // frames satisfy the second wait.
        assert!(!session.deliver(0, &depth_frame(5)).unwrap());
        assert!(session.deliver(0, &depth_frame(6)).unwrap());
        assert!(session.deliver(1, &color_frame(7)).unwrap());
        session.wait_all_streams().unwrap();
        assert_eq!(session.frame_number(Stream::Depth).unwrap(), 6);
    }

    #[test]
    fn test_malformed_frame_dropped_stream_continues() {
        let session = started_session();
        let err = session.deliver(0, &[0u8; 7]).unwrap_err();
        assert!(matches!(
            err,
            DepthCamError::BadFrameSize { subdevice: 0, expected: 32, got: 7 }
        ));
        assert!(session.deliver(0, &depth_frame(1)).unwrap());
        assert_eq!(session.frame_number(Stream::Depth).unwrap(), 1);
    }

    #[test]
    fn test_tiny_frame_dropped_before_counter_decode() {
        // Buffers shorter than the counter field itself must still take the
        // drop path; the length check runs before any decoding.
        let session = started_session();
        for raw in [&[][..], &[0u8; 2][..]] {
            assert!(matches!(
                session.deliver(0, raw),
                Err(DepthCamError::BadFrameSize { subdevice: 0, expected: 32, .. })
            ));
        }
        assert!(session.deliver(0, &depth_frame(1)).unwrap());
    }

    #[test]
    fn test_stop_wakes_waiter_and_mutes_delivery() {
        let mut session = started_session();
        let slot = session.slot(0).unwrap();
        session.stop_capture();

        assert!(!slot.deliver(&depth_frame(1)).unwrap());
        assert!(matches!(
            session.wait_all_streams(),
            Err(DepthCamError::StreamStopped)
        ));
    }

    #[test]
    fn test_stop_while_delivery_loop_runs() {
        // Stop is called while another thread is mid-delivery-loop; the
        // loop observes the cleared running flag and goes quiet, and any
        // frames published before the stop drain without blocking.
        let mut session = CaptureSession::new(tiny_info(), tiny_calib()).unwrap();
        session
            .enable_stream(Stream::Depth, 4, 4, Format::Z16, 30)
            .unwrap();
        session.start_capture().unwrap();
        let slot = session.slot(0).unwrap();

        std::thread::scope(|scope| {
            let producer = scope.spawn(move || {
                let mut published = 0u32;
                for n in 1u32.. {
                    if !slot.deliver(&depth_frame(n)).unwrap() {
                        break;
                    }
                    published = n;
                }
                published
            });

            session.wait_all_streams().unwrap();
            session.stop_capture();
            let published = producer.join().unwrap();
            assert!(published >= 1);

            // Frames published before the stop drain one per wait; once the
            // backlog is gone the waiter is released with the stop error.
            loop {
                match session.wait_all_streams() {
                    Ok(()) => continue,
                    Err(DepthCamError::StreamStopped) => break,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        });

        assert!(!session.slot(0).unwrap().deliver(&depth_frame(u32::MAX)).unwrap());
    }

    #[test]
    fn test_unpacked_image_contents() {
        let session = started_session();
        let mut raw = depth_frame(1);
        raw[0] = 0xAB;
        session.deliver(0, &raw).unwrap();
        session.deliver(1, &color_frame(1)).unwrap();
        let image = session.image(Stream::Depth).unwrap();
        assert_eq!(image[0], 0xAB);
        assert_eq!(image.len(), 32);
    }

    #[test]
    fn test_request_errors() {
        let mut session = CaptureSession::new(tiny_info(), tiny_calib()).unwrap();
        assert!(matches!(
            session.enable_stream(Stream::Infrared, 0, 0, Format::Any, 0),
            Err(DepthCamError::UnsupportedStream(Stream::Infrared))
        ));

        session
            .enable_stream(Stream::Depth, 4, 4, Format::Z16, 30)
            .unwrap();
        session.start_capture().unwrap();
        assert!(matches!(
            session.enable_stream(Stream::Color, 2, 2, Format::Rgb8, 30),
            Err(DepthCamError::CaptureRunning)
        ));
        assert!(matches!(
            session.image(Stream::Color),
            Err(DepthCamError::StreamNotEnabled(Stream::Color))
        ));
    }

    #[test]
    fn test_no_compatible_mode_leaves_session_unchanged() {
        let mut session = CaptureSession::new(tiny_info(), tiny_calib()).unwrap();
        session
            .enable_stream(Stream::Depth, 4, 4, Format::Y16, 30)
            .unwrap();
        assert!(matches!(
            session.start_capture(),
            Err(DepthCamError::NoCompatibleMode { subdevice: 0 })
        ));
        assert!(!session.is_capturing());
    }

    #[test]
    fn test_option_queries() {
        let mut info = tiny_info();
        info.options = CameraOption::EmitterEnabled.flag();
        let session = CaptureSession::new(info, tiny_calib()).unwrap();
        assert!(session.supports_option(CameraOption::EmitterEnabled));
        assert!(matches!(
            session.verify_option(CameraOption::LaserPower),
            Err(DepthCamError::UnsupportedOption(CameraOption::LaserPower))
        ));
    }
}
