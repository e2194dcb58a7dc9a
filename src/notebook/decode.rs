//! RATTA_RLE bitmap decoding.
//!
//! Supernote stores each layer as a run-length stream of `(colorcode,
//! length)` byte pairs. Plain lengths are `raw + 1` (1–128). A length byte
//! with the high bit set is *held back*: if the next pair carries the same
//! colorcode the two combine into a long run of
//! `((held & 0x7f) + 1) << 7 + next + 1`; otherwise the held pair stands
//! alone as `((held & 0x7f) + 1) << 7`. The marker length `0xff` denotes a
//! fixed 16384-pixel run, used for blank stretches.
//!
//! The decoder is deliberately forgiving about stream length: a short
//! stream pads with background, an overlong run is clipped at the expected
//! pixel count. Real devices produce both off-by-a-run cases.

/// Colorcodes as they appear in the RLE stream.
pub const COLORCODE_BLACK: u8 = 0x61;
pub const COLORCODE_BACKGROUND: u8 = 0x62;
pub const COLORCODE_DARK_GRAY: u8 = 0x63;
pub const COLORCODE_GRAY: u8 = 0x64;
pub const COLORCODE_WHITE: u8 = 0x65;
pub const COLORCODE_MARKER_BLACK: u8 = 0x66;
pub const COLORCODE_MARKER_DARK_GRAY: u8 = 0x67;
pub const COLORCODE_MARKER_GRAY: u8 = 0x68;

/// Run length encoded by the `0xff` marker byte.
const SPECIAL_LENGTH: usize = 0x4000;
const SPECIAL_LENGTH_MARKER: u8 = 0xff;

/// Map a stream colorcode to an 8-bit grayscale value.
fn gray_value(colorcode: u8) -> u8 {
    match colorcode {
        COLORCODE_BLACK | COLORCODE_MARKER_BLACK => 0x00,
        COLORCODE_DARK_GRAY | COLORCODE_MARKER_DARK_GRAY => 0x9d,
        COLORCODE_GRAY | COLORCODE_MARKER_GRAY => 0xc9,
        COLORCODE_WHITE => 0xfe,
        // Background and anything unrecognised render as paper.
        _ => 0xff,
    }
}

/// Decode a RATTA_RLE stream into `width * height` grayscale bytes.
///
/// Returns `Err` with a description when the stream has a dangling
/// colorcode byte (odd length); all other irregularities are tolerated.
pub fn decode(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, String> {
    if data.len() % 2 != 0 {
        return Err(format!(
            "RLE stream has odd length {} (dangling colorcode byte)",
            data.len()
        ));
    }

    let expected = width as usize * height as usize;
    let mut pixels: Vec<u8> = Vec::with_capacity(expected);
    let mut holder: Option<(u8, u8)> = None;

    let mut emit = |pixels: &mut Vec<u8>, colorcode: u8, length: usize| {
        let remaining = expected.saturating_sub(pixels.len());
        let run = length.min(remaining);
        let value = gray_value(colorcode);
        pixels.extend(std::iter::repeat(value).take(run));
    };

    for pair in data.chunks_exact(2) {
        let (colorcode, raw_len) = (pair[0], pair[1]);

        if let Some((held_color, held_len)) = holder.take() {
            let base = ((held_len as usize & 0x7f) + 1) << 7;
            if colorcode == held_color {
                // The held pair and this one combine into one long run.
                emit(&mut pixels, colorcode, base + raw_len as usize + 1);
                continue;
            }
            // Different colorcode: the held pair stands alone.
            emit(&mut pixels, held_color, base);
        }

        if raw_len == SPECIAL_LENGTH_MARKER {
            emit(&mut pixels, colorcode, SPECIAL_LENGTH);
        } else if raw_len & 0x80 != 0 {
            holder = Some((colorcode, raw_len));
        } else {
            emit(&mut pixels, colorcode, raw_len as usize + 1);
        }
    }

    // A pair still held at stream end stands alone.
    if let Some((held_color, held_len)) = holder {
        let base = ((held_len as usize & 0x7f) + 1) << 7;
        emit(&mut pixels, held_color, base);
    }

    // Short streams pad with background.
    pixels.resize(expected, gray_value(COLORCODE_BACKGROUND));
    Ok(pixels)
}
