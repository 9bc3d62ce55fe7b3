//! Gray code decoding.

/// Decode a Gray-coded bit field (most significant bit first) into an integer.
///
/// An empty field decodes to 0. Fields wider than 64 bits overflow; field
/// widths are validated to at most 32 bits before decoding.
pub fn decode(bits: &[bool]) -> u64 {
    let mut out = 0;
    let mut prev = false;
    for &bit in bits {
        prev ^= bit;
        out = (out << 1) | prev as u64;
    }
    out
}
