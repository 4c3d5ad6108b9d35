//! Receive state machine for USS telegrams.
//!
//! Telegrams carry no end delimiter. The receiver watches single characters
//! until it has seen STX and LGE, then the remainder of the frame arrives as
//! one block of exactly LGE bytes (typically through DMA):
//!
//! ```text
//!   AwaitStart --STX--> AwaitLength --LGE ok--> AwaitBody --block--> AwaitStart
//!       ^                    |                      |
//!       +----LGE rejected----+      timeout / line error / stop
//! ```
//!
//! This type only tracks state and owns the receive buffer. Arming the block
//! receive and the residual timer is up to [`UssDriver`](crate::driver::UssDriver),
//! which acts on the [`RxAction`] returned for each character.

use crate::consts::USS_STX;
use crate::error::TelegramError;
use crate::telegram::Telegram;

/// Position of the receiver within a telegram.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RxState {
    /// Hunting for STX. Every other character is discarded.
    #[default]
    AwaitStart,
    /// STX seen. The next character is LGE.
    AwaitLength,
    /// LGE accepted. Waiting for the block of LGE bytes.
    AwaitBody,
}

/// What the owner of a [`Receiver`] has to do after a character.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RxAction {
    /// Nothing to do.
    None,
    /// Arm a block receive of `lge` bytes and the residual timer.
    ArmBody {
        /// Number of bytes following LGE.
        lge: u8,
    },
    /// The declared length cannot be received. The receiver is hunting
    /// for STX again.
    Rejected {
        /// The offending LGE value.
        lge: u8,
    },
}

/// Byte/block driven telegram reassembly.
#[derive(Debug, Default)]
pub struct Receiver {
    state: RxState,
    telegram: Telegram,
}

impl Receiver {
    /// Creates a receiver hunting for STX.
    pub const fn new() -> Self {
        Self {
            state: RxState::AwaitStart,
            telegram: Telegram::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Length of the body currently expected, if any.
    pub fn expected_body_len(&self) -> Option<u8> {
        match self.state {
            RxState::AwaitBody => Some(self.telegram.lge()),
            _ => None,
        }
    }

    /// Feeds one character received outside of a block receive.
    pub fn on_char(&mut self, byte: u8) -> RxAction {
        match self.state {
            RxState::AwaitStart => {
                if byte == USS_STX {
                    self.telegram.clear();
                    self.state = RxState::AwaitLength;
                }
                RxAction::None
            }
            RxState::AwaitLength => match self.telegram.set_lge(byte) {
                Ok(()) => {
                    self.state = RxState::AwaitBody;
                    RxAction::ArmBody { lge: byte }
                }
                Err(_) => {
                    self.state = RxState::AwaitStart;
                    RxAction::Rejected { lge: byte }
                }
            },
            // The body arrives as a block, single characters are stray.
            RxState::AwaitBody => RxAction::None,
        }
    }

    /// Completes the telegram with the received body and verifies its BCC.
    ///
    /// The receiver hunts for STX again afterwards, whatever the outcome. On
    /// success the returned telegram stays valid until the next STX.
    ///
    /// # Errors
    /// - [`TelegramError::LengthMismatch`] if no body was expected or `body`
    ///   is not exactly LGE bytes long
    /// - [`TelegramError::BccMismatch`] if the checksum does not match
    pub fn complete(&mut self, body: &[u8]) -> Result<&Telegram, TelegramError> {
        let expected = self.expected_body_len();
        self.state = RxState::AwaitStart;
        if expected.is_none() {
            return Err(TelegramError::LengthMismatch {
                expected: 0,
                actual: body.len(),
            });
        }
        self.telegram.fill_body(body)?;
        self.telegram.validate()?;
        Ok(&self.telegram)
    }

    /// Abandons the telegram in progress.
    ///
    /// Returns `true` if a telegram was being assembled.
    pub fn abort(&mut self) -> bool {
        let was_busy = self.state != RxState::AwaitStart;
        self.state = RxState::AwaitStart;
        was_busy
    }
}
