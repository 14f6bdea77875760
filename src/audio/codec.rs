// G.711 µ-law companding between 8-bit telephony codes and 16-bit linear PCM.
//
// Codes are stored bit-inverted: sign in bit 7, a 3-bit exponent in bits 4-6
// and a 4-bit mantissa in bits 0-3. Magnitudes are biased by 0x84 before
// the exponent is taken so that every segment starts on a power of two.

/// Added to the magnitude before encoding, removed after decoding
pub const BIAS: i32 = 0x84;

/// Largest magnitude that survives encoding; louder samples are clipped
pub const CLIP: i32 = 32635;

/// Lower bound of the biased magnitude for exponents 7 down to 1
const EXPONENT_THRESHOLDS: [i32; 7] = [0x4000, 0x2000, 0x1000, 0x800, 0x400, 0x200, 0x100];

/// The code every silent sample encodes to
pub const SILENCE: u8 = 0xFF;

/// Decode one µ-law code to a linear sample
pub fn decode(code: u8) -> i16 {
    let code = !code;
    let negative = code & 0x80 != 0;
    let exponent = ((code >> 4) & 0x07) as u32;
    let mantissa = (code & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + BIAS) << exponent) - BIAS;
    let sample = if negative { -magnitude } else { magnitude };

    sample.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Encode one linear sample to a µ-law code
pub fn encode(sample: i16) -> u8 {
    let sample = sample as i32;
    let sign = ((sample >> 8) & 0x80) as u8;

    let magnitude = sample.abs().min(CLIP) + BIAS;

    let mut exponent: u8 = 7;
    for threshold in EXPONENT_THRESHOLDS {
        if magnitude >= threshold {
            break;
        }
        exponent -= 1;
    }

    let mantissa = ((magnitude >> (exponent + 3)) & 0x0F) as u8;

    !(sign | (exponent << 4) | mantissa)
}

/// Decode a µ-law frame into little-endian PCM16 bytes (N codes -> 2N bytes)
pub fn decode_frame(codes: &[u8]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(codes.len() * 2);
    for &code in codes {
        pcm.extend_from_slice(&decode(code).to_le_bytes());
    }
    pcm
}

/// Encode little-endian PCM16 bytes into a µ-law frame (2N or 2N+1 bytes -> N codes)
///
/// A trailing odd byte cannot form a sample and is dropped.
pub fn encode_frame(pcm: &[u8]) -> Vec<u8> {
    pcm.chunks_exact(2)
        .map(|pair| encode(i16::from_le_bytes([pair[0], pair[1]])))
        .collect()
}

/// Read little-endian PCM16 bytes as samples, ignoring a trailing odd byte
pub fn pcm_to_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

pub fn samples_to_pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
