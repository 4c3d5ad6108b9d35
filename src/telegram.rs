//! The USS telegram: one complete protocol frame.
//!
//! ```text
//! byte 0       STX  (0x02)
//! byte 1       LGE  (payload length + 2)
//! byte 2       ADR  (class bits and node number)
//! byte 3..n-2  payload
//! byte n-1     BCC  (XOR over bytes 0..n-2)
//! ```
//!
//! A [`Telegram`] stores the frame exactly as it travels on the wire, so it can
//! be echoed, logged or transmitted without re-encoding.

use core::fmt;

use crate::bcc::{bcc_matches, compute_bcc};
use crate::consts::{
    USS_ADR_NODE_MASK, USS_HEADER_LEN, USS_MAX_LGE, USS_MAX_PAYLOAD_LEN, USS_MAX_TELEGRAM_LEN,
    USS_MIN_LGE, USS_STX,
};
use crate::error::TelegramError;

/// Fixed-capacity buffer holding one telegram in wire format.
///
/// The buffer never allocates. Its length is derived from the LGE byte, so a
/// freshly created telegram is empty until a header has been written.
///
/// Equality and `Debug` only look at [`Telegram::as_bytes`]. Bytes past the
/// end of the frame are left over from earlier use and carry no meaning.
#[derive(Clone, Copy)]
pub struct Telegram {
    buf: [u8; USS_MAX_TELEGRAM_LEN],
}

impl PartialEq for Telegram {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Telegram {}

impl fmt::Debug for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telegram")
            .field("frame", &self.as_bytes())
            .finish()
    }
}

impl Default for Telegram {
    fn default() -> Self {
        Self::new()
    }
}

impl Telegram {
    /// Creates an empty telegram (STX set, LGE zero).
    pub const fn new() -> Self {
        let mut buf = [0; USS_MAX_TELEGRAM_LEN];
        buf[0] = USS_STX;
        Self { buf }
    }

    /// Returns `true` if `lge` is a length this driver can receive.
    pub const fn lge_in_range(lge: u8) -> bool {
        lge >= USS_MIN_LGE && lge <= USS_MAX_LGE
    }

    /// Builds a telegram from an address byte and a payload, appending the BCC.
    ///
    /// # Errors
    /// [`TelegramError::PayloadTooLong`] if the payload exceeds the capacity.
    pub fn build(adr: u8, payload: &[u8]) -> Result<Self, TelegramError> {
        if payload.len() > USS_MAX_PAYLOAD_LEN {
            return Err(TelegramError::PayloadTooLong { len: payload.len() });
        }
        let mut telegram = Self::new();
        let lge = (payload.len() + 2) as u8;
        telegram.buf[1] = lge;
        telegram.buf[2] = adr;
        telegram.buf[3..3 + payload.len()].copy_from_slice(payload);
        let bcc_at = telegram.wire_len() - 1;
        telegram.buf[bcc_at] = compute_bcc(&telegram.buf[..bcc_at]);
        Ok(telegram)
    }

    /// Parses a complete wire frame.
    ///
    /// Checks the STX marker, the LGE range and that `frame` holds exactly
    /// `LGE + 2` bytes. The checksum is **not** verified here, see
    /// [`Telegram::validate`].
    pub fn from_bytes(frame: &[u8]) -> Result<Self, TelegramError> {
        let (&stx, rest) = frame.split_first().ok_or(TelegramError::LengthMismatch {
            expected: USS_HEADER_LEN,
            actual: 0,
        })?;
        if stx != USS_STX {
            return Err(TelegramError::MissingStart { found: stx });
        }
        let &lge = rest.first().ok_or(TelegramError::LengthMismatch {
            expected: USS_HEADER_LEN,
            actual: frame.len(),
        })?;
        let mut telegram = Self::new();
        telegram.set_lge(lge)?;
        telegram.fill_body(&frame[USS_HEADER_LEN..])?;
        Ok(telegram)
    }

    /// Writes the LGE byte after checking its range.
    pub(crate) fn set_lge(&mut self, lge: u8) -> Result<(), TelegramError> {
        if !Self::lge_in_range(lge) {
            return Err(TelegramError::LengthOutOfRange { lge });
        }
        self.buf[1] = lge;
        Ok(())
    }

    /// Copies a received body (ADR, payload, BCC) behind the header.
    pub(crate) fn fill_body(&mut self, body: &[u8]) -> Result<(), TelegramError> {
        let expected = self.lge() as usize;
        if body.len() != expected {
            return Err(TelegramError::LengthMismatch {
                expected,
                actual: body.len(),
            });
        }
        self.buf[USS_HEADER_LEN..USS_HEADER_LEN + expected].copy_from_slice(body);
        Ok(())
    }

    /// Resets to an empty telegram.
    pub fn clear(&mut self) {
        self.buf[1] = 0;
    }

    /// The start marker, always [`USS_STX`].
    pub fn stx(&self) -> u8 {
        self.buf[0]
    }

    /// Number of bytes following LGE (ADR, payload and BCC).
    pub fn lge(&self) -> u8 {
        self.buf[1]
    }

    /// Address byte.
    pub fn adr(&self) -> u8 {
        self.buf[2]
    }

    /// Node number carried in the low bits of ADR.
    pub fn node_number(&self) -> u8 {
        self.adr() & USS_ADR_NODE_MASK
    }

    /// Payload bytes between ADR and BCC.
    pub fn payload(&self) -> &[u8] {
        match self.lge() {
            lge if lge >= USS_MIN_LGE => &self.buf[3..USS_HEADER_LEN + lge as usize - 1],
            _ => &[],
        }
    }

    /// Checksum byte as received or built.
    pub fn bcc(&self) -> u8 {
        match self.wire_len() {
            USS_HEADER_LEN => 0,
            len => self.buf[len - 1],
        }
    }

    /// Length of the frame on the wire, STX and LGE included.
    pub fn wire_len(&self) -> usize {
        USS_HEADER_LEN + self.lge() as usize
    }

    /// Returns `true` when no header has been written yet.
    pub fn is_empty(&self) -> bool {
        self.lge() == 0
    }

    /// The complete frame as it appears on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.wire_len()]
    }

    /// BCC computed over every byte preceding the checksum.
    pub fn computed_bcc(&self) -> u8 {
        match self.wire_len() {
            USS_HEADER_LEN => compute_bcc(&self.buf[..USS_HEADER_LEN]),
            len => compute_bcc(&self.buf[..len - 1]),
        }
    }

    /// Verifies the checksum.
    ///
    /// # Errors
    /// [`TelegramError::BccMismatch`] when the computed and received BCC differ.
    pub fn validate(&self) -> Result<(), TelegramError> {
        if bcc_matches(self.as_bytes()) {
            return Ok(());
        }
        Err(TelegramError::BccMismatch {
            computed: self.computed_bcc(),
            received: self.bcc(),
        })
    }
}
