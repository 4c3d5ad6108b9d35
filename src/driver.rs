//! USS slave driver for half-duplex RS-485 links.
//!
//! This module provides the [`UssDriver`] struct, which receives USS telegrams
//! from a [`SerialLink`], supervises their residual time with a
//! [`OneShotTimer`], validates their BCC, classifies them by address and
//! either hands them to a [`TelegramHandler`] or, for mirror telegrams,
//! schedules the unchanged frame for transmission.
//!
//! The driver is an event sink. Every method named `on_*` corresponds to one
//! peripheral interrupt and must be called from one serialized context: the
//! driver is meant to live in a `critical_section::Mutex` (see
//! [`crate::tasks`]) or to be owned by a single interrupt priority.
//!
//! ## Example
//!
//! ```rust,ignore
//! use uss485::driver::{UssConfig, UssDriver};
//!
//! let config = UssConfig::new(115_200, 3);
//! let mut driver = UssDriver::start(config, uart, gpt, handler, Some(de_pin), None)?;
//!
//! // USART character interrupt, outside of a DMA receive
//! let _ = driver.on_char_received(byte);
//! // DMA transfer complete
//! let _ = driver.on_block_received(dma_buffer);
//! ```
//!
//! ## Design Notes
//!
//! Line errors, residual timeouts, rejected lengths and checksum failures all
//! bring the receiver back to hunting for STX. None of them stops the driver.
//!
//! For the sender task that applies the response delay, see [`crate::tasks`].

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;

use crate::consts::{USS_DEFAULT_BAUD, USS_MAX_NODE_NUMBER, USS_MAX_RESPONSE_DELAY_US};
use crate::dispatch::{TelegramHandler, TelegramKind};
use crate::error::{TelegramError, UssError};
use crate::link::{LineError, OneShotTimer, SerialLink};
use crate::receiver::{Receiver, RxAction, RxState};
use crate::scheduler::{TransmitScheduler, TxState};
use crate::telegram::Telegram;
use crate::timing::{const_response_delay_us, residual_time_bits, response_delay_us};

/// Runtime configuration consumed by [`UssDriver::start`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct UssConfig {
    /// Line speed in bits per second.
    pub baud: u32,
    /// Node number of this slave (0–31).
    pub node_number: u8,
}

impl Default for UssConfig {
    fn default() -> Self {
        Self::new(USS_DEFAULT_BAUD, 0)
    }
}

impl UssConfig {
    /// Creates a configuration.
    pub const fn new(baud: u32, node_number: u8) -> Self {
        Self { baud, node_number }
    }

    /// Checks the node number range and the baud rate.
    ///
    /// The baud rate must be high enough for two character times to fit into
    /// the response window.
    pub fn validate<E: core::fmt::Debug>(&self) -> Result<(), UssError<E>> {
        if self.node_number > USS_MAX_NODE_NUMBER {
            return Err(UssError::InvalidNodeNumber(self.node_number));
        }
        if self.baud == 0 || const_response_delay_us(self.baud) > USS_MAX_RESPONSE_DELAY_US {
            return Err(UssError::InvalidBaud(self.baud));
        }
        Ok(())
    }
}

/// Outcome of the last completed telegram.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum UssStatus {
    /// The last telegram passed its checksum (or none was received yet).
    #[default]
    Ok,
    /// The last telegram failed its checksum and was dropped.
    BccMismatch,
}

/// Receive and transmit counters. All counters wrap.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct UssStats {
    /// Telegrams that passed their checksum.
    pub rx_good: u16,
    /// Telegrams dropped for a checksum or length mismatch.
    pub rx_bad: u16,
    /// LGE bytes rejected before arming a receive.
    pub rx_rejected: u16,
    /// Telegrams abandoned because their residual time expired.
    pub rx_timeouts: u16,
    /// Line errors reported by the serial link.
    pub rx_line_errors: u16,
    /// Mirror replies dropped because the transmitter was still busy.
    pub tx_busy: u16,
    /// Replies completely transmitted.
    pub tx_good: u16,
}

/// Peripherals and handler handed back by [`UssDriver::stop`].
#[derive(Debug)]
pub struct UssParts<L, T, H, DE> {
    /// The serial link, disabled.
    pub link: L,
    /// The residual time timer, disabled.
    pub timer: T,
    /// The telegram handler.
    pub handler: H,
    /// The RS-485 driver-enable pin, released.
    pub de: Option<DE>,
}

/// A USS slave bound to one serial link.
///
/// ## Type Parameters
///
/// - `L`: the [`SerialLink`] carrying the telegrams
/// - `T`: the [`OneShotTimer`] supervising residual time, clocked at the baud rate
/// - `H`: the [`TelegramHandler`] receiving standard, broadcast and special telegrams
/// - `DE`: an optional RS-485 driver-enable pin, asserted while transmitting
///
/// ## Notes
///
/// - Exactly one telegram is received and one is transmitted at a time.
/// - Handlers run inside [`on_block_received`](UssDriver::on_block_received),
///   in interrupt context on real hardware.
#[derive(Debug)]
pub struct UssDriver<L, T, H, DE>
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    config: UssConfig,
    /// Serial link
    pub link: L,
    /// Residual time timer
    pub timer: T,
    /// Telegram handler
    pub handler: H,
    /// RS-485 driver-enable pin
    pub de: Option<DE>,
    de_inverted: bool,
    receiver: Receiver,
    scheduler: TransmitScheduler,
    status: UssStatus,
    /// Receive and transmit counters
    pub stats: UssStats,
}

impl<L, T, H, DE> UssDriver<L, T, H, DE>
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    /// Validates `config`, powers up the link and the timer and starts
    /// hunting for STX.
    ///
    /// # Arguments
    /// - `config`: baud rate and node number
    /// - `link`: the serial link, configured for 8-E-1 at `config.baud`
    /// - `timer`: the residual time timer, clocked at `config.baud`
    /// - `handler`: receives standard, broadcast and special telegrams
    /// - `de`: the optional RS-485 driver-enable pin
    /// - `de_inverted`: whether the pin is active low (defaults to `false`)
    ///
    /// # Errors
    /// - [`UssError::InvalidNodeNumber`] / [`UssError::InvalidBaud`] for a bad config
    /// - [`UssError::Link`] if the link cannot be enabled
    pub fn start(
        config: UssConfig,
        link: L,
        timer: T,
        handler: H,
        de: Option<DE>,
        de_inverted: Option<bool>,
    ) -> Result<Self, UssError<L::Error>> {
        config.validate::<L::Error>()?;
        let mut link = link;
        let mut timer = timer;
        link.enable(config.baud).map_err(UssError::Link)?;
        timer.enable(config.baud);

        let mut driver = Self {
            config,
            link,
            timer,
            handler,
            de,
            de_inverted: de_inverted.unwrap_or(false),
            receiver: Receiver::new(),
            scheduler: TransmitScheduler::new(response_delay_us(config.baud)),
            status: UssStatus::Ok,
            stats: UssStats::default(),
        };
        Self::drive_de(&mut driver.de, driver.de_inverted, false);
        info!(
            "uss: started at {} baud as node {}",
            config.baud, config.node_number
        );
        Ok(driver)
    }

    /// Quiesces the driver and hands back its peripherals.
    ///
    /// Any telegram being received is abandoned, any pending reply dropped,
    /// the driver-enable pin released and the link and timer disabled.
    pub fn stop(self) -> UssParts<L, T, H, DE> {
        let mut driver = self;
        driver.link.stop_block_receive();
        driver.timer.stop();
        let _ = driver.receiver.abort();
        driver.scheduler.abort();
        Self::drive_de(&mut driver.de, driver.de_inverted, false);
        driver.link.disable();
        driver.timer.disable();
        info!("uss: stopped");
        UssParts {
            link: driver.link,
            timer: driver.timer,
            handler: driver.handler,
            de: driver.de,
        }
    }

    fn drive_de(de: &mut Option<DE>, inverted: bool, active: bool) {
        let level = if inverted { !active } else { active };
        if let Some(pin) = de.as_mut() {
            let _ = if level { pin.set_high() } else { pin.set_low() };
        }
    }

    /// The configuration the driver was started with.
    pub fn config(&self) -> &UssConfig {
        &self.config
    }

    /// Outcome of the last completed telegram.
    pub fn status(&self) -> UssStatus {
        self.status
    }

    /// State of the receive path.
    pub fn rx_state(&self) -> RxState {
        self.receiver.state()
    }

    /// State of the transmit path.
    pub fn tx_state(&self) -> TxState {
        self.scheduler.state()
    }

    /// The reply parked or being transmitted, if any.
    pub fn pending_reply(&self) -> Option<&Telegram> {
        self.scheduler.pending()
    }

    /// Minimum line silence before a reply, in microseconds.
    pub fn response_delay_us(&self) -> u32 {
        self.scheduler.response_delay_us()
    }

    /// Handles a character received outside of a block receive.
    ///
    /// After STX and an acceptable LGE, arms a block receive of LGE bytes and
    /// the residual timer for `1.5 × LGE` character times.
    ///
    /// # Errors
    /// - [`UssError::Telegram`] with [`TelegramError::LengthOutOfRange`] if LGE
    ///   is rejected
    /// - [`UssError::Link`] if the block receive cannot be armed
    ///
    /// In both cases the receiver is hunting for STX again.
    pub fn on_char_received(&mut self, byte: u8) -> Result<(), UssError<L::Error>> {
        match self.receiver.on_char(byte) {
            RxAction::None => Ok(()),
            RxAction::ArmBody { lge } => {
                if let Err(err) = self.link.start_block_receive(lge as usize) {
                    let _ = self.receiver.abort();
                    return Err(UssError::Link(err));
                }
                self.timer.start(residual_time_bits(lge));
                trace!("uss: expecting {} bytes", lge);
                Ok(())
            }
            RxAction::Rejected { lge } => {
                self.stats.rx_rejected = self.stats.rx_rejected.wrapping_add(1);
                warn!("uss: rejected telegram length {}", lge);
                Err(TelegramError::LengthOutOfRange { lge }.into())
            }
        }
    }

    /// Handles the completion of a block receive.
    ///
    /// Disarms the residual timer, validates the BCC, then dispatches the
    /// telegram:
    /// - [`TelegramHandler::on_any`] for every valid telegram
    /// - [`TelegramHandler::on_telegram`] for special, broadcast and standard
    ///   telegrams
    /// - mirror telegrams are copied verbatim and scheduled for transmission
    ///
    /// # Returns
    /// The classification of the telegram.
    ///
    /// # Errors
    /// - [`UssError::NotReceiving`] if no body was expected
    /// - [`UssError::Telegram`] for a BCC or length mismatch; the status
    ///   becomes [`UssStatus::BccMismatch`] for the former
    /// - [`UssError::Busy`] if a mirror reply could not be scheduled
    pub fn on_block_received(&mut self, body: &[u8]) -> Result<TelegramKind, UssError<L::Error>> {
        if self.receiver.state() != RxState::AwaitBody {
            return Err(UssError::NotReceiving);
        }
        self.timer.stop();

        let telegram = match self.receiver.complete(body) {
            Ok(telegram) => telegram,
            Err(err) => {
                self.stats.rx_bad = self.stats.rx_bad.wrapping_add(1);
                if let TelegramError::BccMismatch { computed, received } = err {
                    self.status = UssStatus::BccMismatch;
                    debug!("uss: BCC mismatch {} != {}", computed, received);
                }
                return Err(err.into());
            }
        };
        self.status = UssStatus::Ok;
        self.stats.rx_good = self.stats.rx_good.wrapping_add(1);

        let kind = TelegramKind::classify(telegram.adr(), self.config.node_number);
        self.handler.on_any(telegram);
        match kind {
            kind if kind.is_delivered() => self.handler.on_telegram(kind, telegram),
            TelegramKind::Mirror => {
                if !self.scheduler.schedule(telegram) {
                    self.stats.tx_busy = self.stats.tx_busy.wrapping_add(1);
                    warn!("uss: mirror dropped, transmitter busy");
                    return Err(UssError::Busy);
                }
                trace!("uss: mirror scheduled");
            }
            _ => trace!("uss: telegram for node {} ignored", telegram.node_number()),
        }
        Ok(kind)
    }

    /// Handles a framing, parity, overrun, noise or break error.
    ///
    /// Cancels any block receive and the residual timer; the receiver hunts
    /// for STX again.
    pub fn on_line_error(&mut self, error: LineError) {
        self.link.stop_block_receive();
        self.timer.stop();
        let _ = self.receiver.abort();
        self.stats.rx_line_errors = self.stats.rx_line_errors.wrapping_add(1);
        debug!("uss: line error {:?}", error);
    }

    /// Handles the expiry of the residual timer.
    ///
    /// # Returns
    /// `true` if a telegram was abandoned, `false` for a late or spurious
    /// expiry.
    pub fn on_residual_timeout(&mut self) -> bool {
        if self.receiver.state() != RxState::AwaitBody {
            return false;
        }
        self.link.stop_block_receive();
        let _ = self.receiver.abort();
        self.stats.rx_timeouts = self.stats.rx_timeouts.wrapping_add(1);
        debug!("uss: residual time expired");
        true
    }

    /// Handles the physical end of a transmission.
    pub fn on_transmit_complete(&mut self) {
        if self.scheduler.complete() {
            Self::drive_de(&mut self.de, self.de_inverted, false);
            self.stats.tx_good = self.stats.tx_good.wrapping_add(1);
        }
    }

    /// Consumes the sender wake signal raised by a scheduled reply.
    ///
    /// Returns [`nb::Error::WouldBlock`] while nothing is scheduled.
    pub fn poll_send_request(&mut self) -> nb::Result<(), Infallible> {
        self.scheduler.poll_wake()
    }

    /// Starts transmitting the parked reply.
    ///
    /// Must only be called once the response delay has elapsed since the wake
    /// signal was consumed. Asserts the driver-enable pin first.
    ///
    /// # Errors
    /// - [`UssError::NothingScheduled`] if no reply is parked
    /// - [`UssError::ResponsePending`] if the parked reply still has its wake
    ///   signal pending; it stays parked for the next
    ///   [`UssDriver::poll_send_request`]
    /// - [`UssError::Link`] if the link refuses the frame; the reply is dropped
    pub fn begin_transmission(&mut self) -> Result<(), UssError<L::Error>> {
        if self.scheduler.wake_pending() {
            return Err(UssError::ResponsePending);
        }
        let frame = self.scheduler.begin().ok_or(UssError::NothingScheduled)?;
        Self::drive_de(&mut self.de, self.de_inverted, true);
        if let Err(err) = self.link.start_send(frame) {
            self.scheduler.abort();
            Self::drive_de(&mut self.de, self.de_inverted, false);
            error!("uss: link refused reply");
            return Err(UssError::Link(err));
        }
        Ok(())
    }

    /// Returns [`nb::Error::WouldBlock`] until the transmit path is idle.
    pub fn poll_transmit_idle(&self) -> nb::Result<(), Infallible> {
        self.scheduler.poll_idle()
    }
}
