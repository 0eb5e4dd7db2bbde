//! Capture demo against a synthetic transport.
//!
//! Opens an SC300 catalog with synthetic calibration, enables the best-quality
//! presets, and spawns one producer thread per active sub-device that plays
//! the hardware's role: it generates wire-accurate raw buffers with embedded
//! frame counters and pushes them through the delivery path. The main thread
//! waits on all streams and prints per-stream frame numbers.

use depthcam::{
    catalog, CalibrationInfo, CameraOption, CaptureSession, Distortion, FrameNumberRoutine,
    Intrinsics, Pose, Preset, StaticCameraInfo, Stream,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Plausible pinhole intrinsics for every geometry the catalog references.
/// A real SDK reads these from the device at open time.
fn synthetic_calibration(info: &StaticCameraInfo) -> CalibrationInfo {
    let mut intrinsics = vec![None; info.required_intrinsics()];
    for mode in &info.subdevice_modes {
        for s in &mode.streams {
            intrinsics[s.intrinsics_index].get_or_insert(Intrinsics {
                image_size: [s.width as i32, s.height as i32],
                focal_length: [s.width as f32 * 0.92, s.width as f32 * 0.92],
                principal_point: [s.width as f32 / 2.0 - 0.5, s.height as f32 / 2.0 - 0.5],
                distortion_coeff: [0.0; 5],
                distortion: Distortion::None,
            });
        }
    }
    CalibrationInfo {
        intrinsics: intrinsics.into_iter().map(|i| i.unwrap()).collect(),
        stream_poses: [Pose::IDENTITY; Stream::COUNT],
        depth_scale: 0.001,
    }
}

fn synthetic_frame(mode: &depthcam::SubdeviceMode, counter: u32) -> Vec<u8> {
    let mut raw: Vec<u8> = (0..mode.wire_frame_size())
        .map(|i| (i as u32).wrapping_add(counter) as u8)
        .collect();
    let end = raw.len();
    match mode.frame_counter {
        FrameNumberRoutine::HeaderLe32 => raw[0..4].copy_from_slice(&counter.to_le_bytes()),
        FrameNumberRoutine::TrailerLe32 => raw[end - 4..].copy_from_slice(&counter.to_le_bytes()),
    }
    raw
}

fn main() {
    env_logger::init();

    let info = catalog::sc300();
    let calib = synthetic_calibration(&info);
    let mut session = CaptureSession::new(info, calib).expect("open session");

    session
        .enable_stream_preset(Stream::Depth, Preset::BestQuality)
        .unwrap();
    session
        .enable_stream_preset(Stream::Color, Preset::BestQuality)
        .unwrap();
    session
        .enable_stream_preset(Stream::Infrared, Preset::BestQuality)
        .unwrap();
    // A format for the second imager that matches the first.
    session
        .enable_stream(Stream::Infrared2, 0, 0, depthcam::Format::Any, 0)
        .unwrap();

    session.start_capture().expect("start capture");

    for stream in Stream::ALL {
        if !session.is_stream_enabled(stream) {
            continue;
        }
        let mode = session.stream_mode(stream).unwrap();
        let intrin = session.stream_intrinsics(stream).unwrap();
        println!(
            "Capturing {stream} at {}x{} {}, fov = {:.1} x {:.1}",
            mode.width,
            mode.height,
            mode.format,
            intrin.hfov(),
            intrin.vfov()
        );
    }

    for option in CameraOption::ALL {
        if session.supports_option(option) {
            println!("Option {option} supported");
        }
    }

    let running = AtomicBool::new(true);
    std::thread::scope(|scope| {
        for subdevice in 0..3 {
            let Some(slot) = session.slot(subdevice) else {
                continue;
            };
            let running = &running;
            scope.spawn(move || {
                let period = Duration::from_millis(1000 / slot.mode().fps as u64);
                let mut counter = 1u32;
                while running.load(Ordering::Relaxed) {
                    if let Err(e) = slot.deliver(&synthetic_frame(slot.mode(), counter)) {
                        log::warn!("delivery failed: {e}");
                    }
                    counter += 1;
                    std::thread::sleep(period);
                }
            });
        }

        for _ in 0..10 {
            session.wait_all_streams().expect("wait for streams");
            print!("Frame numbers:");
            for stream in [Stream::Depth, Stream::Color, Stream::Infrared] {
                print!(" {stream}={}", session.frame_number(stream).unwrap());
            }
            println!();
        }
        running.store(false, Ordering::Relaxed);
    });

    session.stop_capture();
}
