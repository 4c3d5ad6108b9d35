//! Constants used across the USS protocol implementation.
//!
//! This module defines the framing bytes, buffer capacities, address bit layout
//! and line timing constants of the USS telegram protocol.
//!
//! ## Key Concepts
//!
//! - **Framing**: every telegram starts with [`USS_STX`], followed by the length
//!   byte (LGE), the address byte (ADR), the payload and the BCC checksum.
//! - **Capacity**: a telegram body (everything after LGE) never exceeds
//!   [`USS_MAX_LGE`] bytes. Longer declared lengths are rejected before any
//!   receive is armed.
//! - **Address byte**: the three upper bits select the telegram class, the
//!   five lower bits carry the node number.
//! - **Character time**: one character on the wire is 11 bit periods
//!   (start + 8 data + even parity + stop).
//!
//! These values should be used wherever framing or buffer logic is implemented
//! so that every component agrees on frame boundaries and timing.

/// Start-of-telegram marker.
pub const USS_STX: u8 = 0x02;

/// Number of bytes preceding the telegram body on the wire (STX and LGE).
pub const USS_HEADER_LEN: usize = 2;

/// Smallest legal LGE value: an ADR byte and a BCC byte, no payload.
pub const USS_MIN_LGE: u8 = 2;

/// Largest LGE value this driver accepts.
///
/// This is the capacity of the body buffer (ADR, payload and BCC).
pub const USS_MAX_LGE: u8 = 50;

/// See [`USS_MAX_LGE`]
pub const USS_MAX_LGE_USIZE: usize = USS_MAX_LGE as usize;

/// Maximum payload length (LGE minus ADR and BCC).
pub const USS_MAX_PAYLOAD_LEN: usize = USS_MAX_LGE_USIZE - 2;

/// Maximum length of a complete telegram on the wire, STX and LGE included.
pub const USS_MAX_TELEGRAM_LEN: usize = USS_MAX_LGE_USIZE + USS_HEADER_LEN;

/// ADR bit marking a special telegram. Evaluated before anything else.
pub const USS_ADR_SPECIAL: u8 = 0x80;

/// ADR bit marking a mirror telegram. The addressed slave echoes it unchanged.
pub const USS_ADR_MIRROR: u8 = 0x40;

/// ADR bit marking a broadcast telegram. The node number is not evaluated.
pub const USS_ADR_BROADCAST: u8 = 0x20;

/// Mask over the three class bits of the ADR byte.
pub const USS_ADR_CLASS_MASK: u8 = 0xe0;

/// Mask over the node number bits of the ADR byte.
pub const USS_ADR_NODE_MASK: u8 = 0x1f;

/// Highest node number that fits into the ADR byte.
pub const USS_MAX_NODE_NUMBER: u8 = USS_ADR_NODE_MASK;

/// Bit periods per character: start, 8 data bits, even parity, stop.
pub const USS_CHARACTER_BITS: u32 = 11;

/// Baud rate used when no other rate is configured.
pub const USS_DEFAULT_BAUD: u32 = 115_200;

/// Upper bound of the slave response delay window, in microseconds.
///
/// A slave must answer after at least two character times and within 20 ms.
pub const USS_MAX_RESPONSE_DELAY_US: u32 = 20_000;

/// Header written once at the start of every telegram log.
pub const USS_LOG_MAGIC: [u8; 4] = *b"PLOP";

/// Default queue length of the logging relay.
///
/// `heapless::spsc` rings keep one slot free, so this yields a pool of
/// `USS_RELAY_QUEUE_LEN - 1` telegram buffers.
pub const USS_RELAY_QUEUE_LEN: usize = 5;

/// How long the relay worker waits on the filled queue before re-checking
/// for shutdown, in microseconds.
pub const USS_RELAY_WAIT_US: u32 = 100_000;

/// Polling interval used by the worker loops while they wait, in microseconds.
pub const USS_POLL_INTERVAL_US: u32 = 100;
