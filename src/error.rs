//! Error types shared across the driver, the relay and the logger.
//!
//! None of these conditions is fatal: the receive path falls back to waiting
//! for the next STX, the transmit path to idle, and the relay drops frames
//! instead of blocking.

use thiserror::Error;

/// Reasons a byte sequence is not a well-formed USS telegram.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TelegramError {
    /// The first byte is not STX.
    #[error("expected STX, found {found:#04x}")]
    MissingStart {
        /// The byte found in place of STX.
        found: u8,
    },
    /// The declared LGE is below the minimum or above the buffer capacity.
    #[error("telegram length {lge} out of range")]
    LengthOutOfRange {
        /// The declared LGE value.
        lge: u8,
    },
    /// The number of bytes available does not match the declared length.
    #[error("expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Bytes required by the declared LGE.
        expected: usize,
        /// Bytes actually provided.
        actual: usize,
    },
    /// The payload does not fit into a telegram.
    #[error("payload of {len} bytes does not fit into a telegram")]
    PayloadTooLong {
        /// Length of the rejected payload.
        len: usize,
    },
    /// The received BCC does not match the one computed over the frame.
    #[error("BCC mismatch: computed {computed:#04x}, received {received:#04x}")]
    BccMismatch {
        /// BCC computed over STX, LGE, ADR and payload.
        computed: u8,
        /// BCC carried by the frame.
        received: u8,
    },
}

/// Errors reported by the USS driver.
///
/// `E` is the error type of the underlying [`SerialLink`](crate::link::SerialLink).
#[derive(Error, Debug)]
pub enum UssError<E: core::fmt::Debug> {
    /// Node numbers are five bits wide.
    #[error("node number {0} out of range")]
    InvalidNodeNumber(u8),
    /// The baud rate must be non-zero.
    #[error("invalid baud rate {0}")]
    InvalidBaud(u32),
    /// A received telegram was malformed or failed its checksum.
    #[error(transparent)]
    Telegram(#[from] TelegramError),
    /// A transmission was requested while the previous one is still pending.
    #[error("transmitter busy")]
    Busy,
    /// A block completion arrived while no telegram body was expected.
    #[error("no telegram body expected")]
    NotReceiving,
    /// No scheduled transmission is waiting for its response delay.
    #[error("nothing scheduled for transmission")]
    NothingScheduled,
    /// The parked reply was scheduled after the last wake signal was consumed;
    /// its response delay has not started yet.
    #[error("reply not yet claimed by the sender")]
    ResponsePending,
    /// The serial link rejected an operation.
    #[error("serial link error: {0:?}")]
    Link(E),
}

/// Errors raised by the logging relay.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RelayError {
    /// Every buffer is in flight; the telegram was dropped.
    #[error("relay pool exhausted")]
    PoolExhausted,
    /// A queue refused a buffer. Only possible when a buffer foreign to the
    /// pool is handed back.
    #[error("relay queue full")]
    QueueFull,
}

/// Errors raised by the telegram logger.
///
/// `E` is the error type of the underlying [`TelegramSink`](crate::logger::TelegramSink).
#[derive(Error, Debug)]
pub enum LogError<E: core::fmt::Debug> {
    /// Logging has not been started, the telegram was not written.
    #[error("logging not started")]
    NotLogging,
    /// The sink failed to open, write or close.
    #[error("log sink error: {0:?}")]
    Sink(E),
}
