//! Print the built-in camera model catalogs: stream mappings, hardware
//! modes, pairing rules, and supported options.

use depthcam::{catalog, CameraOption, Preset, Stream};

fn main() {
    env_logger::init();

    for info in [catalog::sc300(), catalog::tl100()] {
        println!("== {} ==", info.name);

        for stream in Stream::ALL {
            match info.subdevice_for(stream) {
                Some(subdevice) => println!("  {stream}: subdevice {subdevice}"),
                None => println!("  {stream}: unsupported"),
            }
        }

        println!("  {} hardware modes:", info.subdevice_modes.len());
        for mode in &info.subdevice_modes {
            let streams: Vec<String> = mode
                .streams
                .iter()
                .map(|s| format!("{} {}x{} {}", s.stream, s.width, s.height, s.format))
                .collect();
            println!(
                "    subdevice {} {}x{} {:?} @ {} fps -> {}",
                mode.subdevice,
                mode.width,
                mode.height,
                mode.wire_format,
                mode.fps,
                streams.join(", ")
            );
        }

        println!("  presets:");
        for stream in Stream::ALL {
            if !info.supports_stream(stream) {
                continue;
            }
            for preset in Preset::ALL {
                let r = info.preset_request(stream, preset);
                if r.enabled {
                    println!(
                        "    {stream} {preset}: {}x{} {} @ {} fps",
                        r.width, r.height, r.format, r.fps
                    );
                }
            }
        }

        let supported: Vec<String> = CameraOption::ALL
            .iter()
            .filter(|o| info.supports_option(**o))
            .map(|o| o.to_string())
            .collect();
        println!("  options: {}", supported.join(", "));
        println!();
    }
}
