//! Line timing of the USS protocol.
//!
//! All protocol times are multiples of the character time, i.e. 11 bit
//! periods at the configured baud rate:
//!
//! | Quantity        | Definition                       | 115 200 baud |
//! |-----------------|----------------------------------|--------------|
//! | character time  | `11 / baud`                      | 95.5 µs      |
//! | response delay  | `2 × character time`, rounded up | 191 µs       |
//! | residual time   | `1.5 × LGE × character time`     | LGE × 143 µs |
//!
//! The residual time supervisor counts bit periods: its one-shot timer is
//! clocked at the baud rate, so [`residual_time_bits`] is directly the number
//! of timer ticks to arm.
//!
//! The response delay exists as a runtime function and as a `const fn`
//! variant for use in statics.

use libm::ceil;

use crate::consts::USS_CHARACTER_BITS;

/// Microseconds per second
pub const MICROS_PER_SECOND: u32 = 1_000_000;

/// Computes the duration of one character in microseconds.
///
/// # Arguments
/// - `baud`: line speed in bits per second (non-zero)
pub fn character_time_us(baud: u32) -> f64 {
    (USS_CHARACTER_BITS as f64) * (MICROS_PER_SECOND as f64) / (baud as f64)
}

/// Computes the minimum delay between the end of a master telegram and the
/// start of the slave response, in whole microseconds, rounded up.
///
/// # Arguments
/// - `baud`: line speed in bits per second (non-zero)
pub fn response_delay_us(baud: u32) -> u32 {
    ceil(2.0 * character_time_us(baud)) as u32
}

/// Compile-time response delay calculator
///
/// Same result as [`response_delay_us`], using integer arithmetic only.
pub const fn const_response_delay_us(baud: u32) -> u32 {
    let numerator = 2 * USS_CHARACTER_BITS as u64 * MICROS_PER_SECOND as u64;
    numerator.div_ceil(baud as u64) as u32
}

/// Maximum time allowed to receive the `lge` bytes following LGE, in bit
/// periods, rounded up.
pub const fn residual_time_bits(lge: u8) -> u32 {
    (3 * lge as u32 * USS_CHARACTER_BITS).div_ceil(2)
}
