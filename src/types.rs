use std::fmt;

/// Client-visible streams a camera can expose. Each stream is served by
/// exactly one hardware sub-device, or is unsupported on a given model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stream {
    Depth = 0,
    Color = 1,
    Infrared = 2,
    Infrared2 = 3,
}

/// Client-visible pixel formats. `Any` is a request wildcard, never an
/// image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Any = 0,
    Z16 = 1,
    Yuyv = 2,
    Rgb8 = 3,
    Bgr8 = 4,
    Rgba8 = 5,
    Bgra8 = 6,
    Y8 = 7,
    Y16 = 8,
}

/// Named request presets, resolved per stream via the model's preset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    BestQuality = 0,
    LargestImage = 1,
    HighestFramerate = 2,
}

/// Lens distortion models carried by calibration data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distortion {
    None = 0,
    ModifiedBrownConrady = 1,
    InverseBrownConrady = 2,
}

/// Device-specific controls. Which options a model supports is declared in
/// its [`StaticCameraInfo`](crate::modes::StaticCameraInfo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraOption {
    LrAutoExposureEnabled = 0,
    LrGain = 1,
    LrExposure = 2,
    EmitterEnabled = 3,
    DepthControlPreset = 4,
    LaserPower = 5,
    Accuracy = 6,
    MotionRange = 7,
    FilterOption = 8,
    ConfidenceThreshold = 9,
}

macro_rules! enum_helpers {
    ($type:ident, $count:expr, [$($variant:ident => $name:expr),+ $(,)?]) => {
        impl $type {
            pub const COUNT: usize = $count;
            pub const ALL: [$type; $count] = [$($type::$variant),+];

            /// Map an index back to a variant; `None` outside the valid range.
            pub fn from_index(index: usize) -> Option<$type> {
                Self::ALL.get(index).copied()
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($type::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

enum_helpers!(Stream, 4, [
    Depth => "DEPTH",
    Color => "COLOR",
    Infrared => "INFRARED",
    Infrared2 => "INFRARED_2",
]);

enum_helpers!(Format, 9, [
    Any => "ANY",
    Z16 => "Z16",
    Yuyv => "YUYV",
    Rgb8 => "RGB8",
    Bgr8 => "BGR8",
    Rgba8 => "RGBA8",
    Bgra8 => "BGRA8",
    Y8 => "Y8",
    Y16 => "Y16",
]);

enum_helpers!(Preset, 3, [
    BestQuality => "BEST_QUALITY",
    LargestImage => "LARGEST_IMAGE",
    HighestFramerate => "HIGHEST_FRAMERATE",
]);

enum_helpers!(Distortion, 3, [
    None => "NONE",
    ModifiedBrownConrady => "MODIFIED_BROWN_CONRADY",
    InverseBrownConrady => "INVERSE_BROWN_CONRADY",
]);

enum_helpers!(CameraOption, 10, [
    LrAutoExposureEnabled => "LR_AUTO_EXPOSURE_ENABLED",
    LrGain => "LR_GAIN",
    LrExposure => "LR_EXPOSURE",
    EmitterEnabled => "EMITTER_ENABLED",
    DepthControlPreset => "DEPTH_CONTROL_PRESET",
    LaserPower => "LASER_POWER",
    Accuracy => "ACCURACY",
    MotionRange => "MOTION_RANGE",
    FilterOption => "FILTER_OPTION",
    ConfidenceThreshold => "CONFIDENCE_THRESHOLD",
]);

impl Format {
    /// Bytes per pixel of a concrete image format. `Any` has no pixel size.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Format::Any => 0,
            Format::Y8 => 1,
            Format::Z16 | Format::Yuyv | Format::Y16 => 2,
            Format::Rgb8 | Format::Bgr8 => 3,
            Format::Rgba8 | Format::Bgra8 => 4,
        }
    }
}

bitflags::bitflags! {
    /// Set of supported [`CameraOption`]s, one bit per option.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OptionSet: u32 {
        const LR_AUTO_EXPOSURE_ENABLED = 1 << 0;
        const LR_GAIN                  = 1 << 1;
        const LR_EXPOSURE              = 1 << 2;
        const EMITTER_ENABLED          = 1 << 3;
        const DEPTH_CONTROL_PRESET     = 1 << 4;
        const LASER_POWER              = 1 << 5;
        const ACCURACY                 = 1 << 6;
        const MOTION_RANGE             = 1 << 7;
        const FILTER_OPTION            = 1 << 8;
        const CONFIDENCE_THRESHOLD     = 1 << 9;
    }
}

impl CameraOption {
    /// The bit representing this option in an [`OptionSet`].
    pub fn flag(self) -> OptionSet {
        OptionSet::from_bits_truncate(1 << self as u32)
    }
}

/// Size in bytes of a client image with the given geometry.
pub fn image_size(width: u32, height: u32, format: Format) -> usize {
    width as usize * height as usize * format.bytes_per_pixel()
}

/// One stream's capture request, as submitted by the client. Zero and
/// `Format::Any` mean "don't care".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub fps: u32,
}

impl Default for StreamRequest {
    fn default() -> Self {
        StreamRequest {
            enabled: false,
            width: 0,
            height: 0,
            format: Format::Any,
            fps: 0,
        }
    }
}

impl StreamRequest {
    pub fn new(width: u32, height: u32, format: Format, fps: u32) -> Self {
        StreamRequest {
            enabled: true,
            width,
            height,
            format,
            fps,
        }
    }
}

/// Per-mode optical calibration for one stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub image_size: [i32; 2],
    pub focal_length: [f32; 2],
    pub principal_point: [f32; 2],
    pub distortion_coeff: [f32; 5],
    pub distortion: Distortion,
}

/// Angular field of view of an image axis, in degrees. Diagnostic only.
pub fn fov(image_size: i32, focal_length: f32, principal_point: f32) -> f32 {
    ((principal_point + 0.5).atan2(focal_length)
        + (image_size as f32 - principal_point - 0.5).atan2(focal_length))
        .to_degrees()
}

impl Intrinsics {
    pub fn hfov(&self) -> f32 {
        fov(self.image_size[0], self.focal_length[0], self.principal_point[0])
    }

    pub fn vfov(&self) -> f32 {
        fov(self.image_size[1], self.focal_length[1], self.principal_point[1])
    }
}
