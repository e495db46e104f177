//! 8-bit Fletcher checksum used to protect tracker messages (RFC 1146).

/// Compute the two Fletcher checksum bytes over `data`.
///
/// `a` is the running sum of all bytes and `b` the running sum of `a`,
/// both modulo 256.
#[must_use]
pub fn checksum(data: &[u8]) -> (u8, u8) {
    data.iter().fold((0u8, 0u8), |(a, b), &byte| {
        let a = a.wrapping_add(byte);
        (a, b.wrapping_add(a))
    })
}
