//! Per-model mode catalogs and the mode-selection engine.
//!
//! A camera model is described by a [`StaticCameraInfo`]: which sub-device
//! serves each stream, the hardware modes each sub-device can be put into,
//! the arithmetic rules tying paired streams together, the preset table, and
//! the supported option set. Built once at device-open time, read-only after.

use crate::types::{CameraOption, Format, OptionSet, Preset, Stream, StreamRequest};
use crate::unpack::{FrameNumberRoutine, UnpackRoutine};

/// Pixel layout a sub-device transmits over the wire. Discriminants are the
/// hardware protocol's format tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Any = 0,
    Yuyv = 3,
    /// Interleaved stereo 12-bit infrared.
    Y12i = 5,
    Y8 = 7,
    Z16 = 8,
    /// 8-bit infrared.
    Invi = 14,
    /// 16-bit depth.
    Invr = 16,
    /// 16-bit depth + 8-bit infrared, combined.
    Inri = 18,
}

impl WireFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            WireFormat::Any => 0,
            WireFormat::Y8 | WireFormat::Invi => 1,
            WireFormat::Yuyv | WireFormat::Z16 | WireFormat::Invr => 2,
            WireFormat::Y12i | WireFormat::Inri => 3,
        }
    }
}

/// How one stream is exposed to the client while a given hardware mode is
/// active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMode {
    pub stream: Stream,
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub fps: u32,
    /// Index into [`CalibrationInfo::intrinsics`](crate::calib::CalibrationInfo).
    pub intrinsics_index: usize,
}

/// One hardware operating point of a sub-device, together with the client
/// streams it carries and its decoding routines.
#[derive(Debug, Clone, PartialEq)]
pub struct SubdeviceMode {
    pub subdevice: usize,
    /// Resolution advertised over the wire (may exceed the client images).
    pub width: u32,
    pub height: u32,
    pub wire_format: WireFormat,
    pub fps: u32,
    pub streams: Vec<StreamMode>,
    pub unpacker: UnpackRoutine,
    pub frame_counter: FrameNumberRoutine,
}

impl SubdeviceMode {
    /// Exact byte length of one raw wire frame in this mode.
    pub fn wire_frame_size(&self) -> usize {
        self.width as usize * self.height as usize * self.wire_format.bytes_per_pixel()
    }

    pub fn stream_mode(&self, stream: Stream) -> Option<&StreamMode> {
        self.streams.iter().find(|s| s.stream == stream)
    }

    /// Decode one raw frame into per-stream client buffers.
    ///
    /// `raw` must be exactly [`wire_frame_size`](Self::wire_frame_size) bytes
    /// and each `dest` buffer pre-sized for its stream; the delivery path
    /// ([`SubdeviceSlot::deliver`](crate::session::SubdeviceSlot::deliver))
    /// checks the length and drops short frames before dispatching here.
    pub fn unpack(&self, dest: &mut [Vec<u8>], raw: &[u8]) {
        self.unpacker.unpack(dest, self, raw);
    }

    /// Extract the hardware frame counter from a raw frame.
    ///
    /// `raw` must be exactly [`wire_frame_size`](Self::wire_frame_size) bytes;
    /// see [`unpack`](Self::unpack).
    pub fn frame_number(&self, raw: &[u8]) -> u32 {
        self.frame_counter.frame_number(self, raw)
    }
}

/// Request field referenced by an [`InterstreamRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestField {
    Width,
    Height,
    Fps,
    Format,
}

impl RequestField {
    /// The requested value, or `None` when the request leaves it don't-care.
    fn request_value(self, request: &StreamRequest) -> Option<i32> {
        match self {
            RequestField::Width => (request.width != 0).then_some(request.width as i32),
            RequestField::Height => (request.height != 0).then_some(request.height as i32),
            RequestField::Fps => (request.fps != 0).then_some(request.fps as i32),
            RequestField::Format => {
                (request.format != Format::Any).then_some(request.format as i32)
            }
        }
    }

    /// The value a stream mode advertises for this field.
    fn mode_value(self, mode: &StreamMode) -> i32 {
        match self {
            RequestField::Width => mode.width as i32,
            RequestField::Height => mode.height as i32,
            RequestField::Fps => mode.fps as i32,
            RequestField::Format => mode.format as i32,
        }
    }
}

/// Pairing constraint between two streams: requires
/// `value(a, field) + delta == value(b, field)` whenever both streams are
/// enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterstreamRule {
    pub a: Stream,
    pub b: Stream,
    pub field: RequestField,
    pub delta: i32,
}

/// Everything fixed about a camera model. Shared read-only by all
/// negotiation calls for a device instance.
#[derive(Debug, Clone)]
pub struct StaticCameraInfo {
    pub name: String,
    /// Which sub-device serves each stream; `None` if unavailable.
    pub stream_subdevices: [Option<usize>; Stream::COUNT],
    /// Declared in preferred order; earlier entries win selection ties.
    pub subdevice_modes: Vec<SubdeviceMode>,
    pub interstream_rules: Vec<InterstreamRule>,
    pub presets: [[StreamRequest; Preset::COUNT]; Stream::COUNT],
    pub options: OptionSet,
}

/// True when every explicit field of `request` equals the advertised value.
fn request_matches(request: &StreamRequest, mode: &StreamMode) -> bool {
    (request.width == 0 || request.width == mode.width)
        && (request.height == 0 || request.height == mode.height)
        && (request.format == Format::Any || request.format == mode.format)
        && (request.fps == 0 || request.fps == mode.fps)
}

impl StaticCameraInfo {
    pub fn new(name: &str) -> Self {
        StaticCameraInfo {
            name: name.to_string(),
            stream_subdevices: [None; Stream::COUNT],
            subdevice_modes: Vec::new(),
            interstream_rules: Vec::new(),
            presets: [[StreamRequest::default(); Preset::COUNT]; Stream::COUNT],
            options: OptionSet::empty(),
        }
    }

    pub fn subdevice_for(&self, stream: Stream) -> Option<usize> {
        self.stream_subdevices[stream as usize]
    }

    pub fn supports_stream(&self, stream: Stream) -> bool {
        self.subdevice_for(stream).is_some()
    }

    pub fn supports_option(&self, option: CameraOption) -> bool {
        self.options.contains(option.flag())
    }

    pub fn preset_request(&self, stream: Stream, preset: Preset) -> StreamRequest {
        self.presets[stream as usize][preset as usize]
    }

    /// Smallest intrinsics table length satisfying every catalog index.
    pub fn required_intrinsics(&self) -> usize {
        self.subdevice_modes
            .iter()
            .flat_map(|m| m.streams.iter())
            .map(|s| s.intrinsics_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Select the hardware mode for one sub-device under the given requests,
    /// or `None` when no catalog entry satisfies them. Ties are broken by
    /// lowest unpack cost, then declared catalog order.
    pub fn select_mode(
        &self,
        requests: &[StreamRequest; Stream::COUNT],
        subdevice: usize,
    ) -> Option<&SubdeviceMode> {
        // Rules between two explicit requests reject outright, independent
        // of which modes exist.
        for rule in &self.interstream_rules {
            let ra = &requests[rule.a as usize];
            let rb = &requests[rule.b as usize];
            if !ra.enabled || !rb.enabled {
                continue;
            }
            if let (Some(va), Some(vb)) =
                (rule.field.request_value(ra), rule.field.request_value(rb))
            {
                if va + rule.delta != vb {
                    log::debug!(
                        "{}: requests for {} and {} violate {:?} rule (delta {})",
                        self.name, rule.a, rule.b, rule.field, rule.delta
                    );
                    return None;
                }
            }
        }

        let selected = self
            .subdevice_modes
            .iter()
            .filter(|mode| mode.subdevice == subdevice)
            .filter(|mode| self.mode_satisfies(mode, requests))
            .min_by_key(|mode| mode.unpacker.cost());
        if selected.is_none() {
            log::debug!("{}: no compatible mode for subdevice {}", self.name, subdevice);
        }
        selected
    }

    fn mode_satisfies(&self, mode: &SubdeviceMode, requests: &[StreamRequest; Stream::COUNT]) -> bool {
        // The mode must carry every enabled stream mapped to its sub-device.
        for stream in Stream::ALL {
            if requests[stream as usize].enabled
                && self.subdevice_for(stream) == Some(mode.subdevice)
                && mode.stream_mode(stream).is_none()
            {
                return false;
            }
        }

        // Every explicit request field must match the advertised value.
        for stream_mode in &mode.streams {
            let request = &requests[stream_mode.stream as usize];
            if request.enabled && !request_matches(request, stream_mode) {
                return false;
            }
        }

        // Re-check rules with the mode's advertised values standing in for
        // don't-care request fields. Rules touching no stream of this mode
        // stay unchecked here.
        for rule in &self.interstream_rules {
            let ra = &requests[rule.a as usize];
            let rb = &requests[rule.b as usize];
            if !ra.enabled || !rb.enabled {
                continue;
            }
            let va = rule
                .field
                .request_value(ra)
                .or_else(|| mode.stream_mode(rule.a).map(|s| rule.field.mode_value(s)));
            let vb = rule
                .field
                .request_value(rb)
                .or_else(|| mode.stream_mode(rule.b).map(|s| rule.field.mode_value(s)));
            if let (Some(va), Some(vb)) = (va, vb) {
                if va + rule.delta != vb {
                    return false;
                }
            }
        }

        true
    }

    /// Check the structural invariants of the catalog.
    pub fn validate(&self) -> crate::Result<()> {
        use crate::DepthCamError::InvalidCatalog;

        for (index, mode) in self.subdevice_modes.iter().enumerate() {
            if mode.streams.is_empty() {
                return Err(InvalidCatalog(format!("mode {index} carries no streams")));
            }
            for (i, a) in mode.streams.iter().enumerate() {
                if mode.streams[..i].iter().any(|b| b.stream == a.stream) {
                    return Err(InvalidCatalog(format!(
                        "mode {index} lists stream {} twice",
                        a.stream
                    )));
                }
                if self.subdevice_for(a.stream) != Some(mode.subdevice) {
                    return Err(InvalidCatalog(format!(
                        "mode {index} carries stream {} not mapped to subdevice {}",
                        a.stream, mode.subdevice
                    )));
                }
            }
        }
        for rule in &self.interstream_rules {
            if rule.a == rule.b {
                return Err(InvalidCatalog(format!(
                    "interstream rule relates {} to itself",
                    rule.a
                )));
            }
        }
        Ok(())
    }
}
