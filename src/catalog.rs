//! Built-in camera model catalogs.
//!
//! Mode tables are authored in preferred order; selection falls back to that
//! order when unpack costs tie. Intrinsics indices are assigned per client
//! geometry and resolved against the device's calibration table at open time.

use crate::modes::{InterstreamRule, RequestField, StaticCameraInfo, StreamMode, SubdeviceMode, WireFormat};
use crate::types::{CameraOption, Format, Preset, Stream, StreamRequest};
use crate::unpack::{FrameNumberRoutine, UnpackRoutine};

fn stream_mode(
    stream: Stream,
    width: u32,
    height: u32,
    format: Format,
    fps: u32,
    intrinsics_index: usize,
) -> StreamMode {
    StreamMode { stream, width, height, format, fps, intrinsics_index }
}

/// The five client renditions of one YUYV color wire mode.
fn color_modes(
    subdevice: usize,
    width: u32,
    height: u32,
    fps: u32,
    frame_counter: FrameNumberRoutine,
    intrinsics_index: usize,
) -> Vec<SubdeviceMode> {
    [
        (Format::Yuyv, UnpackRoutine::Strided),
        (Format::Rgb8, UnpackRoutine::YuyvToRgb),
        (Format::Bgr8, UnpackRoutine::YuyvToBgr),
        (Format::Rgba8, UnpackRoutine::YuyvToRgba),
        (Format::Bgra8, UnpackRoutine::YuyvToBgra),
    ]
    .into_iter()
    .map(|(format, unpacker)| SubdeviceMode {
        subdevice,
        width,
        height,
        wire_format: WireFormat::Yuyv,
        fps,
        streams: vec![stream_mode(Stream::Color, width, height, format, fps, intrinsics_index)],
        unpacker,
        frame_counter,
    })
    .collect()
}

/// Stereo infrared pair carried by one interleaved 12-bit wire mode.
fn lr_mode(
    width: u32,
    height: u32,
    fps: u32,
    format: Format,
    unpacker: UnpackRoutine,
    intrinsics_index: usize,
) -> SubdeviceMode {
    SubdeviceMode {
        subdevice: 0,
        width,
        height,
        wire_format: WireFormat::Y12i,
        fps,
        streams: vec![
            stream_mode(Stream::Infrared, width, height, format, fps, intrinsics_index),
            stream_mode(Stream::Infrared2, width, height, format, fps, intrinsics_index),
        ],
        unpacker,
        frame_counter: FrameNumberRoutine::TrailerLe32,
    }
}

/// SC300 stereo depth camera.
///
/// Sub-device 0 carries the left/right imagers over interleaved 12-bit
/// infrared, sub-device 1 the depth engine output (whose wire rows are padded
/// to the imager width), sub-device 2 the YUYV color sensor. The depth image
/// is 12 pixels smaller than the imagers on both axes, reflected in the
/// pairing rules.
pub fn sc300() -> StaticCameraInfo {
    let mut info = StaticCameraInfo::new("SC300");
    info.stream_subdevices[Stream::Depth as usize] = Some(1);
    info.stream_subdevices[Stream::Color as usize] = Some(2);
    info.stream_subdevices[Stream::Infrared as usize] = Some(0);
    info.stream_subdevices[Stream::Infrared2 as usize] = Some(0);

    // Intrinsics indices: 0 = imagers 640x480, 1 = imagers 320x240,
    // 2 = depth 628x468, 3 = depth 308x228, 4 = color VGA, 5 = color 1080p.
    info.subdevice_modes = vec![
        lr_mode(640, 480, 30, Format::Y8, UnpackRoutine::Y12iToY8, 0),
        lr_mode(640, 480, 30, Format::Y16, UnpackRoutine::Y12iToY16, 0),
        lr_mode(320, 240, 60, Format::Y8, UnpackRoutine::Y12iToY8, 1),
        lr_mode(320, 240, 60, Format::Y16, UnpackRoutine::Y12iToY16, 1),
        SubdeviceMode {
            subdevice: 1,
            width: 640,
            height: 480,
            wire_format: WireFormat::Z16,
            fps: 30,
            streams: vec![stream_mode(Stream::Depth, 628, 468, Format::Z16, 30, 2)],
            unpacker: UnpackRoutine::Strided,
            frame_counter: FrameNumberRoutine::TrailerLe32,
        },
        SubdeviceMode {
            subdevice: 1,
            width: 320,
            height: 240,
            wire_format: WireFormat::Z16,
            fps: 60,
            streams: vec![stream_mode(Stream::Depth, 308, 228, Format::Z16, 60, 3)],
            unpacker: UnpackRoutine::Strided,
            frame_counter: FrameNumberRoutine::TrailerLe32,
        },
    ];
    info.subdevice_modes.extend(color_modes(2, 640, 480, 30, FrameNumberRoutine::HeaderLe32, 4));
    info.subdevice_modes.extend(color_modes(2, 1920, 1080, 30, FrameNumberRoutine::HeaderLe32, 5));

    // The second imager is physically locked to the first; the depth image
    // trails the imagers by the 12-pixel correlation border.
    info.interstream_rules = vec![
        InterstreamRule { a: Stream::Infrared, b: Stream::Infrared2, field: RequestField::Width, delta: 0 },
        InterstreamRule { a: Stream::Infrared, b: Stream::Infrared2, field: RequestField::Height, delta: 0 },
        InterstreamRule { a: Stream::Infrared, b: Stream::Infrared2, field: RequestField::Fps, delta: 0 },
        InterstreamRule { a: Stream::Infrared, b: Stream::Infrared2, field: RequestField::Format, delta: 0 },
        InterstreamRule { a: Stream::Depth, b: Stream::Infrared, field: RequestField::Width, delta: 12 },
        InterstreamRule { a: Stream::Depth, b: Stream::Infrared, field: RequestField::Height, delta: 12 },
        InterstreamRule { a: Stream::Depth, b: Stream::Infrared, field: RequestField::Fps, delta: 0 },
    ];

    let presets = &mut info.presets;
    for preset in [Preset::BestQuality, Preset::LargestImage] {
        presets[Stream::Depth as usize][preset as usize] = StreamRequest::new(628, 468, Format::Z16, 30);
        presets[Stream::Infrared as usize][preset as usize] = StreamRequest::new(640, 480, Format::Y8, 30);
        presets[Stream::Infrared2 as usize][preset as usize] = StreamRequest::new(640, 480, Format::Y8, 30);
    }
    presets[Stream::Depth as usize][Preset::HighestFramerate as usize] =
        StreamRequest::new(308, 228, Format::Z16, 60);
    presets[Stream::Infrared as usize][Preset::HighestFramerate as usize] =
        StreamRequest::new(320, 240, Format::Y8, 60);
    presets[Stream::Infrared2 as usize][Preset::HighestFramerate as usize] =
        StreamRequest::new(320, 240, Format::Y8, 60);
    presets[Stream::Color as usize][Preset::BestQuality as usize] =
        StreamRequest::new(640, 480, Format::Rgb8, 30);
    presets[Stream::Color as usize][Preset::LargestImage as usize] =
        StreamRequest::new(1920, 1080, Format::Rgb8, 30);
    presets[Stream::Color as usize][Preset::HighestFramerate as usize] =
        StreamRequest::new(640, 480, Format::Rgb8, 30);

    info.options = CameraOption::LrAutoExposureEnabled.flag()
        | CameraOption::LrGain.flag()
        | CameraOption::LrExposure.flag()
        | CameraOption::EmitterEnabled.flag()
        | CameraOption::DepthControlPreset.flag();

    info
}

/// TL100 coded-light camera.
///
/// Sub-device 0 serves depth and infrared, preferring the combined
/// depth+infrared wire format when both streams are enabled and falling back
/// to single-stream wire formats otherwise. Sub-device 1 is the YUYV color
/// sensor.
pub fn tl100() -> StaticCameraInfo {
    let mut info = StaticCameraInfo::new("TL100");
    info.stream_subdevices[Stream::Depth as usize] = Some(0);
    info.stream_subdevices[Stream::Color as usize] = Some(1);
    info.stream_subdevices[Stream::Infrared as usize] = Some(0);

    // Intrinsics indices: 0 = depth/infrared VGA, 1 = color VGA.
    info.subdevice_modes = vec![
        SubdeviceMode {
            subdevice: 0,
            width: 640,
            height: 480,
            wire_format: WireFormat::Inri,
            fps: 60,
            streams: vec![
                stream_mode(Stream::Depth, 640, 480, Format::Z16, 60, 0),
                stream_mode(Stream::Infrared, 640, 480, Format::Y8, 60, 0),
            ],
            unpacker: UnpackRoutine::InriSplit,
            frame_counter: FrameNumberRoutine::HeaderLe32,
        },
        SubdeviceMode {
            subdevice: 0,
            width: 640,
            height: 480,
            wire_format: WireFormat::Invr,
            fps: 60,
            streams: vec![stream_mode(Stream::Depth, 640, 480, Format::Z16, 60, 0)],
            unpacker: UnpackRoutine::Strided,
            frame_counter: FrameNumberRoutine::HeaderLe32,
        },
        SubdeviceMode {
            subdevice: 0,
            width: 640,
            height: 480,
            wire_format: WireFormat::Invi,
            fps: 60,
            streams: vec![stream_mode(Stream::Infrared, 640, 480, Format::Y8, 60, 0)],
            unpacker: UnpackRoutine::Strided,
            frame_counter: FrameNumberRoutine::HeaderLe32,
        },
    ];
    info.subdevice_modes.extend(color_modes(1, 640, 480, 30, FrameNumberRoutine::HeaderLe32, 1));

    info.interstream_rules = vec![
        InterstreamRule { a: Stream::Depth, b: Stream::Infrared, field: RequestField::Width, delta: 0 },
        InterstreamRule { a: Stream::Depth, b: Stream::Infrared, field: RequestField::Height, delta: 0 },
        InterstreamRule { a: Stream::Depth, b: Stream::Infrared, field: RequestField::Fps, delta: 0 },
    ];

    for preset in Preset::ALL {
        info.presets[Stream::Depth as usize][preset as usize] =
            StreamRequest::new(640, 480, Format::Z16, 60);
        info.presets[Stream::Infrared as usize][preset as usize] =
            StreamRequest::new(640, 480, Format::Y8, 60);
        info.presets[Stream::Color as usize][preset as usize] =
            StreamRequest::new(640, 480, Format::Rgb8, 30);
    }

    info.options = CameraOption::LaserPower.flag()
        | CameraOption::Accuracy.flag()
        | CameraOption::MotionRange.flag()
        | CameraOption::FilterOption.flag()
        | CameraOption::ConfidenceThreshold.flag();

    info
}
