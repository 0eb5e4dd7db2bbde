//! Wire-format codecs: per-mode frame unpacking and frame-number extraction.
//!
//! Every routine is a pure function of `(mode, raw)`. Destination buffers are
//! pre-sized by the caller to `width * height * bytes_per_pixel(format)` for
//! each stream carried by the mode. Byte layouts are fixed by the hardware
//! protocol and reproduced exactly.

use crate::modes::SubdeviceMode;

/// Decoding routine attached to each catalog mode. Closed set, dispatched by
/// match, so the catalog stays free of code pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackRoutine {
    /// Wire format matches the single client format 1:1; rows are copied,
    /// tolerating a wire row stride wider than the client row.
    Strided,
    /// Interleaved stereo 12-bit infrared, shifted down to two Y8 images.
    Y12iToY8,
    /// Interleaved stereo 12-bit infrared, shifted up into two Y16 images.
    Y12iToY16,
    YuyvToRgb,
    YuyvToRgba,
    YuyvToBgr,
    YuyvToBgra,
    /// Combined 16-bit depth + 8-bit infrared wire pixels, split into a Z16
    /// image and a Y8 image.
    InriSplit,
}

impl UnpackRoutine {
    /// Relative decode overhead, used as the primary mode-selection
    /// tie-break. Lower is preferred.
    pub(crate) fn cost(self) -> u8 {
        match self {
            UnpackRoutine::Strided => 0,
            UnpackRoutine::Y12iToY8 | UnpackRoutine::Y12iToY16 | UnpackRoutine::InriSplit => 1,
            UnpackRoutine::YuyvToRgb | UnpackRoutine::YuyvToBgr => 2,
            UnpackRoutine::YuyvToRgba | UnpackRoutine::YuyvToBgra => 3,
        }
    }

    /// Demultiplex one raw wire buffer into the client images for each
    /// stream carried by `mode`. `dest` holds one buffer per stream, in
    /// `mode.streams` order.
    pub fn unpack(self, dest: &mut [Vec<u8>], mode: &SubdeviceMode, raw: &[u8]) {
        debug_assert_eq!(dest.len(), mode.streams.len());
        debug_assert_eq!(raw.len(), mode.wire_frame_size());
        match self {
            UnpackRoutine::Strided => unpack_strided(dest, mode, raw),
            UnpackRoutine::Y12iToY8 => unpack_y12i(dest, mode, raw, Depth12::To8),
            UnpackRoutine::Y12iToY16 => unpack_y12i(dest, mode, raw, Depth12::To16),
            UnpackRoutine::YuyvToRgb => unpack_yuyv(dest, mode, raw, &[R, G, B]),
            UnpackRoutine::YuyvToRgba => unpack_yuyv(dest, mode, raw, &[R, G, B, A]),
            UnpackRoutine::YuyvToBgr => unpack_yuyv(dest, mode, raw, &[B, G, R]),
            UnpackRoutine::YuyvToBgra => unpack_yuyv(dest, mode, raw, &[B, G, R, A]),
            UnpackRoutine::InriSplit => unpack_inri(dest, mode, raw),
        }
    }
}

/// Frame-counter layout within the wire buffer. The counter region is part
/// of the hardware frame and opaque to everything but this decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameNumberRoutine {
    /// Little-endian u32 in the first four bytes of the frame.
    HeaderLe32,
    /// Little-endian u32 in the last four bytes of the frame.
    TrailerLe32,
}

impl FrameNumberRoutine {
    /// Read the counter from `raw`, which must be exactly
    /// `mode.wire_frame_size()` bytes (the delivery path enforces this).
    pub fn frame_number(self, mode: &SubdeviceMode, raw: &[u8]) -> u32 {
        debug_assert_eq!(raw.len(), mode.wire_frame_size());
        let at = match self {
            FrameNumberRoutine::HeaderLe32 => 0,
            FrameNumberRoutine::TrailerLe32 => raw.len() - 4,
        };
        u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
    }
}

fn unpack_strided(dest: &mut [Vec<u8>], mode: &SubdeviceMode, raw: &[u8]) {
    let stream = &mode.streams[0];
    let bpp = stream.format.bytes_per_pixel();
    let wire_stride = mode.width as usize * bpp;
    let row = stream.width as usize * bpp;
    let out = &mut dest[0];
    debug_assert!(wire_stride >= row && mode.height >= stream.height);
    for y in 0..stream.height as usize {
        let src = y * wire_stride;
        out[y * row..(y + 1) * row].copy_from_slice(&raw[src..src + row]);
    }
}

enum Depth12 {
    To8,
    To16,
}

/// Each 3-byte macropixel holds one 12-bit sample per imager:
/// sample 0 = `b0` | low nibble of `b1` << 8, sample 1 = high nibble of
/// `b1` | `b2` << 4.
fn unpack_y12i(dest: &mut [Vec<u8>], mode: &SubdeviceMode, raw: &[u8], depth: Depth12) {
    let pixels = mode.width as usize * mode.height as usize;
    let (left, right) = dest.split_at_mut(1);
    let (left, right) = (&mut left[0], &mut right[0]);
    for (i, chunk) in raw[..pixels * 3].chunks_exact(3).enumerate() {
        let s0 = chunk[0] as u16 | ((chunk[1] as u16 & 0x0F) << 8);
        let s1 = (chunk[1] as u16 >> 4) | ((chunk[2] as u16) << 4);
        match depth {
            Depth12::To8 => {
                left[i] = (s0 >> 4) as u8;
                right[i] = (s1 >> 4) as u8;
            }
            Depth12::To16 => {
                left[i * 2..i * 2 + 2].copy_from_slice(&(s0 << 4).to_le_bytes());
                right[i * 2..i * 2 + 2].copy_from_slice(&(s1 << 4).to_le_bytes());
            }
        }
    }
}

// Channel selectors for the YUYV decode output.
const R: usize = 0;
const G: usize = 1;
const B: usize = 2;
const A: usize = 3;

/// ITU-R BT.601 integer decode of one luma/chroma pair.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 4] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let clamp = |x: i32| x.clamp(0, 255) as u8;
    [
        clamp((298 * c + 409 * e + 128) >> 8),
        clamp((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp((298 * c + 516 * d + 128) >> 8),
        255,
    ]
}

/// Two pixels per 4-byte (Y0, U, Y1, V) macropixel, chroma shared.
fn unpack_yuyv(dest: &mut [Vec<u8>], mode: &SubdeviceMode, raw: &[u8], channels: &[usize]) {
    let out = &mut dest[0];
    let bytes = mode.width as usize * mode.height as usize * 2;
    let mut at = 0;
    for chunk in raw[..bytes].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        for y in [y0, y1] {
            let rgba = yuv_to_rgb(y, u, v);
            for &ch in channels {
                out[at] = rgba[ch];
                at += 1;
            }
        }
    }
}

/// 3-byte wire pixel: little-endian u16 depth followed by one infrared byte.
fn unpack_inri(dest: &mut [Vec<u8>], mode: &SubdeviceMode, raw: &[u8]) {
    let pixels = mode.width as usize * mode.height as usize;
    let (depth, ir) = dest.split_at_mut(1);
    let (depth, ir) = (&mut depth[0], &mut ir[0]);
    for (i, chunk) in raw[..pixels * 3].chunks_exact(3).enumerate() {
        depth[i * 2] = chunk[0];
        depth[i * 2 + 1] = chunk[1];
        ir[i] = chunk[2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{StreamMode, SubdeviceMode, WireFormat};
    use crate::types::{image_size, Format, Stream};

    fn mode(
        width: u32,
        height: u32,
        wire_format: WireFormat,
        streams: Vec<StreamMode>,
        unpacker: UnpackRoutine,
    ) -> SubdeviceMode {
        SubdeviceMode {
            subdevice: 0,
            width,
            height,
            wire_format,
            fps: 30,
            streams,
            unpacker,
            frame_counter: FrameNumberRoutine::TrailerLe32,
        }
    }

    fn stream(s: Stream, width: u32, height: u32, format: Format) -> StreamMode {
        StreamMode {
            stream: s,
            width,
            height,
            format,
            fps: 30,
            intrinsics_index: 0,
        }
    }

    fn dest_buffers(mode: &SubdeviceMode) -> Vec<Vec<u8>> {
        mode.streams
            .iter()
            .map(|s| vec![0u8; image_size(s.width, s.height, s.format)])
            .collect()
    }

    #[test]
    fn test_strided_roundtrip_with_padding() {
        // Wire rows are 8 pixels wide, client image is 6: the copy must skip
        // the 2-pixel padding at the end of every wire row.
        let m = mode(
            8,
            4,
            WireFormat::Z16,
            vec![stream(Stream::Depth, 6, 4, Format::Z16)],
            UnpackRoutine::Strided,
        );
        let raw: Vec<u8> = (0..m.wire_frame_size()).map(|i| i as u8).collect();
        let mut dest = dest_buffers(&m);
        m.unpacker.unpack(&mut dest, &m, &raw);

        for y in 0..4usize {
            let row = &dest[0][y * 12..(y + 1) * 12];
            assert_eq!(row, &raw[y * 16..y * 16 + 12]);
        }
    }

    #[test]
    fn test_strided_exact_roundtrip() {
        let m = mode(
            4,
            3,
            WireFormat::Y8,
            vec![stream(Stream::Infrared, 4, 3, Format::Y8)],
            UnpackRoutine::Strided,
        );
        let raw: Vec<u8> = (10..22).collect();
        let mut dest = dest_buffers(&m);
        m.unpacker.unpack(&mut dest, &m, &raw);
        assert_eq!(dest[0], raw);
    }

    fn pack_y12i(s0: u16, s1: u16) -> [u8; 3] {
        [
            (s0 & 0xFF) as u8,
            ((s0 >> 8) & 0x0F) as u8 | ((s1 & 0x0F) << 4) as u8,
            (s1 >> 4) as u8,
        ]
    }

    #[test]
    fn test_y12i_to_y8_known_samples() {
        let m = mode(
            2,
            1,
            WireFormat::Y12i,
            vec![
                stream(Stream::Infrared, 2, 1, Format::Y8),
                stream(Stream::Infrared2, 2, 1, Format::Y8),
            ],
            UnpackRoutine::Y12iToY8,
        );
        let mut raw = Vec::new();
        raw.extend_from_slice(&pack_y12i(0x0AB, 0x1CD));
        raw.extend_from_slice(&pack_y12i(0xFFF, 0x000));
        let mut dest = dest_buffers(&m);
        m.unpacker.unpack(&mut dest, &m, &raw);

        assert_eq!(dest[0], [0x0A, 0xFF]);
        assert_eq!(dest[1], [0x1C, 0x00]);
    }

    #[test]
    fn test_y12i_to_y16_known_samples() {
        let m = mode(
            1,
            1,
            WireFormat::Y12i,
            vec![
                stream(Stream::Infrared, 1, 1, Format::Y16),
                stream(Stream::Infrared2, 1, 1, Format::Y16),
            ],
            UnpackRoutine::Y12iToY16,
        );
        let raw = pack_y12i(0x0AB, 0x1CD).to_vec();
        let mut dest = dest_buffers(&m);
        m.unpacker.unpack(&mut dest, &m, &raw);

        assert_eq!(dest[0], 0x0AB0u16.to_le_bytes());
        assert_eq!(dest[1], 0x1CD0u16.to_le_bytes());
    }

    #[test]
    fn test_yuyv_full_luma_gray_is_white() {
        // Regression fixture: Y=235 with neutral chroma decodes to exactly
        // (255, 255, 255) under the BT.601 integer matrix.
        let m = mode(
            2,
            1,
            WireFormat::Yuyv,
            vec![stream(Stream::Color, 2, 1, Format::Rgb8)],
            UnpackRoutine::YuyvToRgb,
        );
        let raw = [235, 128, 235, 128];
        let mut dest = dest_buffers(&m);
        m.unpacker.unpack(&mut dest, &m, &raw);
        assert_eq!(dest[0], [255, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn test_yuyv_red_channel_order() {
        // (Y=81, U=90, V=240) is saturated red: pins R against B ordering.
        let raw = [81, 90, 81, 240];

        let rgb = mode(
            2,
            1,
            WireFormat::Yuyv,
            vec![stream(Stream::Color, 2, 1, Format::Rgb8)],
            UnpackRoutine::YuyvToRgb,
        );
        let mut dest = dest_buffers(&rgb);
        rgb.unpacker.unpack(&mut dest, &rgb, &raw);
        assert_eq!(dest[0], [255, 0, 0, 255, 0, 0]);

        let bgra = mode(
            2,
            1,
            WireFormat::Yuyv,
            vec![stream(Stream::Color, 2, 1, Format::Bgra8)],
            UnpackRoutine::YuyvToBgra,
        );
        let mut dest = dest_buffers(&bgra);
        bgra.unpacker.unpack(&mut dest, &bgra, &raw);
        assert_eq!(dest[0], [0, 0, 255, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn test_inri_split() {
        let m = mode(
            2,
            1,
            WireFormat::Inri,
            vec![
                stream(Stream::Depth, 2, 1, Format::Z16),
                stream(Stream::Infrared, 2, 1, Format::Y8),
            ],
            UnpackRoutine::InriSplit,
        );
        let raw = [0x34, 0x12, 0xAA, 0x78, 0x56, 0xBB];
        let mut dest = dest_buffers(&m);
        m.unpacker.unpack(&mut dest, &m, &raw);
        assert_eq!(dest[0], [0x34, 0x12, 0x78, 0x56]);
        assert_eq!(dest[1], [0xAA, 0xBB]);
    }

    #[test]
    fn test_frame_number_positions() {
        let m = mode(
            4,
            1,
            WireFormat::Z16,
            vec![stream(Stream::Depth, 4, 1, Format::Z16)],
            UnpackRoutine::Strided,
        );
        let mut raw = vec![0u8; m.wire_frame_size()];
        raw[0..4].copy_from_slice(&7u32.to_le_bytes());
        raw[4..8].copy_from_slice(&9u32.to_le_bytes());
        assert_eq!(FrameNumberRoutine::HeaderLe32.frame_number(&m, &raw), 7);
        assert_eq!(FrameNumberRoutine::TrailerLe32.frame_number(&m, &raw), 9);
    }

    #[test]
    fn test_frame_number_non_decreasing() {
        let m = mode(
            4,
            1,
            WireFormat::Z16,
            vec![stream(Stream::Depth, 4, 1, Format::Z16)],
            UnpackRoutine::Strided,
        );
        // An uninterrupted stream repeats or advances the counter, never
        // steps backwards.
        let sequence = [1u32, 1, 2, 3, 3, 3, 4, 10, 11];
        let mut last = 0;
        for n in sequence {
            let mut raw = vec![0u8; m.wire_frame_size()];
            let end = raw.len();
            raw[end - 4..].copy_from_slice(&n.to_le_bytes());
            let decoded = FrameNumberRoutine::TrailerLe32.frame_number(&m, &raw);
            assert!(decoded >= last);
            last = decoded;
        }
    }
}
