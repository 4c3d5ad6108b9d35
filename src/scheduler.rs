//! Transmit scheduler enforcing the slave response delay.
//!
//! A slave may only answer once the line has been silent for at least two
//! character times. Scheduling a reply therefore does not transmit anything;
//! it parks the telegram, raises a wake signal for the sender task and waits
//! for that task to come back after the response delay:
//!
//! ```text
//!   Idle --schedule()--> ResponseWait --begin()--> Sending --complete()--> Idle
//! ```
//!
//! The response delay of a reply starts when the sender consumes its wake
//! signal, so `begin()` refuses a reply whose wake is still pending. A sender
//! that woke up for an earlier reply cannot send a newer one early.
//!
//! The sender side lives in [`crate::tasks`].

use core::convert::Infallible;

use crate::telegram::Telegram;

/// State of the transmit path.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TxState {
    /// Nothing to send.
    #[default]
    Idle,
    /// A reply is parked until the response delay has elapsed.
    ResponseWait,
    /// The reply is on the wire.
    Sending,
}

/// Owner of the transmit buffer and its state.
#[derive(Debug)]
pub struct TransmitScheduler {
    state: TxState,
    /// Binary wake signal for the sender task.
    wake: bool,
    tx: Telegram,
    response_delay_us: u32,
}

impl TransmitScheduler {
    /// Creates an idle scheduler using the given response delay.
    pub const fn new(response_delay_us: u32) -> Self {
        Self {
            state: TxState::Idle,
            wake: false,
            tx: Telegram::new(),
            response_delay_us,
        }
    }

    /// Current state.
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Minimum line silence before a reply, in microseconds.
    pub fn response_delay_us(&self) -> u32 {
        self.response_delay_us
    }

    /// The telegram parked or being sent.
    pub fn pending(&self) -> Option<&Telegram> {
        match self.state {
            TxState::Idle => None,
            _ => Some(&self.tx),
        }
    }

    /// Parks `telegram` for transmission and wakes the sender.
    ///
    /// Returns `false`, leaving the buffer untouched, if the previous reply
    /// has not completed yet.
    pub fn schedule(&mut self, telegram: &Telegram) -> bool {
        if self.state != TxState::Idle {
            return false;
        }
        self.tx = *telegram;
        self.state = TxState::ResponseWait;
        self.wake = true;
        true
    }

    /// Returns `true` while a parked reply waits for the sender to notice it.
    pub fn wake_pending(&self) -> bool {
        self.wake
    }

    /// Consumes the wake signal.
    ///
    /// Returns [`nb::Error::WouldBlock`] while the sender has nothing to do.
    pub fn poll_wake(&mut self) -> nb::Result<(), Infallible> {
        if self.wake {
            self.wake = false;
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Moves a parked reply to `Sending` and hands out the bytes to transmit.
    ///
    /// Returns `None` if nothing is parked (e.g. the driver was stopped while
    /// the sender was sleeping), or if the wake of the parked reply has not
    /// been consumed yet.
    pub fn begin(&mut self) -> Option<&[u8]> {
        if self.state != TxState::ResponseWait || self.wake {
            return None;
        }
        self.state = TxState::Sending;
        Some(self.tx.as_bytes())
    }

    /// Marks the physical end of transmission.
    ///
    /// Returns `true` if a transmission was in progress.
    pub fn complete(&mut self) -> bool {
        let was_sending = self.state == TxState::Sending;
        if was_sending {
            self.state = TxState::Idle;
        }
        was_sending
    }

    /// Returns [`nb::Error::WouldBlock`] until the transmit path is idle again.
    pub fn poll_idle(&self) -> nb::Result<(), Infallible> {
        match self.state {
            TxState::Idle => Ok(()),
            _ => Err(nb::Error::WouldBlock),
        }
    }

    /// Drops any parked or in-flight reply.
    pub fn abort(&mut self) {
        self.state = TxState::Idle;
        self.wake = false;
    }
}
