//! Telegram classification and the handler interface.
//!
//! The address byte alone decides what happens to a validated telegram. The
//! rules are evaluated in order and the first match wins:
//!
//! | ADR                                      | Kind          |
//! |------------------------------------------|---------------|
//! | bit 7 set                                | `Special`     |
//! | bit 6 set and node bits match            | `Mirror`      |
//! | bit 5 set                                | `Broadcast`   |
//! | bits 7..5 clear and node bits match      | `Standard`    |
//! | anything else                            | `Unaddressed` |

use crate::consts::{
    USS_ADR_BROADCAST, USS_ADR_CLASS_MASK, USS_ADR_MIRROR, USS_ADR_NODE_MASK, USS_ADR_SPECIAL,
};
use crate::telegram::Telegram;

/// Classification of a validated telegram.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TelegramKind {
    /// Special telegram, handed to the handler regardless of node number.
    Special,
    /// Mirror telegram for this node. Echoed back unchanged by the driver.
    Mirror,
    /// Broadcast telegram, handed to the handler regardless of node number.
    Broadcast,
    /// Standard data telegram addressed to this node.
    Standard,
    /// Telegram for another node. Ignored.
    Unaddressed,
}

impl TelegramKind {
    /// Classifies an address byte for the given local node number.
    pub fn classify(adr: u8, node_number: u8) -> Self {
        let for_us = (adr & USS_ADR_NODE_MASK) == node_number;
        if adr & USS_ADR_SPECIAL != 0 {
            Self::Special
        } else if adr & USS_ADR_MIRROR != 0 && for_us {
            Self::Mirror
        } else if adr & USS_ADR_BROADCAST != 0 {
            Self::Broadcast
        } else if adr & USS_ADR_CLASS_MASK == 0 && for_us {
            Self::Standard
        } else {
            Self::Unaddressed
        }
    }

    /// Returns `true` for the kinds delivered to [`TelegramHandler::on_telegram`].
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Special | Self::Broadcast | Self::Standard)
    }
}

/// Receiver of validated telegrams.
///
/// Both methods run in the completion context of the serial link, typically
/// an interrupt handler. They must return quickly and must not block. Heavier
/// work belongs behind a [`RelayProducer`](crate::relay::RelayProducer).
pub trait TelegramHandler {
    /// Called for [`TelegramKind::Special`], [`TelegramKind::Broadcast`] and
    /// [`TelegramKind::Standard`] telegrams.
    fn on_telegram(&mut self, kind: TelegramKind, telegram: &Telegram);

    /// Called for every telegram that passed its checksum, before the
    /// kind-specific handling.
    fn on_any(&mut self, telegram: &Telegram) {
        let _ = telegram;
    }
}

/// Discards everything.
impl TelegramHandler for () {
    fn on_telegram(&mut self, _kind: TelegramKind, _telegram: &Telegram) {}
}

impl<H: TelegramHandler + ?Sized> TelegramHandler for &mut H {
    fn on_telegram(&mut self, kind: TelegramKind, telegram: &Telegram) {
        (**self).on_telegram(kind, telegram)
    }

    fn on_any(&mut self, telegram: &Telegram) {
        (**self).on_any(telegram)
    }
}
