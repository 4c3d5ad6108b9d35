//! Block check character (BCC) of a USS telegram.
//!
//! The BCC is the XOR of every byte that precedes it on the wire: STX, LGE,
//! ADR and the payload. The checksum byte itself is never part of the
//! computation.

/// Folds one more byte into a running BCC.
pub(crate) fn bcc_update(bcc: u8, data: &u8) -> u8 {
    bcc ^ *data
}

/// Computes the BCC over `bytes`.
///
/// `bytes` must be the telegram **without** its trailing checksum byte.
///
/// # Example
/// ```rust
/// use uss485::bcc::compute_bcc;
///
/// let frame = [0x02, 0x05, 0x00, 0x11, 0x22];
/// assert_eq!(compute_bcc(&frame), 0x02 ^ 0x05 ^ 0x00 ^ 0x11 ^ 0x22);
/// ```
pub fn compute_bcc(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, bcc_update)
}

/// Checks a complete wire frame (checksum byte last) against its BCC.
///
/// Returns `false` for an empty slice.
pub fn bcc_matches(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((bcc, rest)) => compute_bcc(rest) == *bcc,
        None => false,
    }
}
