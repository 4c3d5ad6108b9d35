//! Peripheral abstractions the driver is built on.
//!
//! The driver never touches registers. A board support layer implements
//! [`SerialLink`] on top of its UART/DMA and [`OneShotTimer`] on top of a
//! general purpose timer, then forwards the peripheral interrupts to the
//! driver's event methods:
//!
//! | Interrupt                        | Driver event                                  |
//! |----------------------------------|-----------------------------------------------|
//! | character received (outside DMA) | [`on_char_received`](crate::driver::UssDriver::on_char_received) |
//! | DMA receive buffer filled        | [`on_block_received`](crate::driver::UssDriver::on_block_received) |
//! | framing/parity/overrun/noise     | [`on_line_error`](crate::driver::UssDriver::on_line_error) |
//! | timer expired                    | [`on_residual_timeout`](crate::driver::UssDriver::on_residual_timeout) |
//! | physical end of transmission     | [`on_transmit_complete`](crate::driver::UssDriver::on_transmit_complete) |

/// Half-duplex serial line configured for 8 data bits, even parity, one stop
/// bit, LSB first.
pub trait SerialLink {
    /// Error reported by the underlying peripheral.
    type Error: core::fmt::Debug;

    /// Powers up the link at `baud` bits per second.
    fn enable(&mut self, baud: u32) -> Result<(), Self::Error>;

    /// Stops all activity and powers the link down.
    fn disable(&mut self);

    /// Arms a block receive of exactly `len` bytes.
    ///
    /// While armed, received characters go to the block buffer and are not
    /// reported one by one. Completion is reported through
    /// [`on_block_received`](crate::driver::UssDriver::on_block_received).
    fn start_block_receive(&mut self, len: usize) -> Result<(), Self::Error>;

    /// Cancels an armed block receive. Must be a no-op when none is armed.
    fn stop_block_receive(&mut self);

    /// Starts transmitting `frame`. The implementation copies the bytes.
    ///
    /// The physical end of transmission is reported through
    /// [`on_transmit_complete`](crate::driver::UssDriver::on_transmit_complete).
    fn start_send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

/// One-shot countdown timer supervising the residual time of a telegram.
pub trait OneShotTimer {
    /// Powers up the timer, counting at `tick_hz`.
    ///
    /// The driver passes the baud rate, so one tick is one bit period.
    fn enable(&mut self, tick_hz: u32);

    /// Powers the timer down.
    fn disable(&mut self);

    /// Arms the timer to fire once after `ticks`. Re-arming restarts it.
    fn start(&mut self, ticks: u32);

    /// Disarms the timer. Must be a no-op when it is not running.
    fn stop(&mut self);
}

/// Receive errors reported by the serial peripheral.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LineError {
    /// Stop bit not found where expected.
    Framing,
    /// Even parity check failed.
    Parity,
    /// A character arrived before the previous one was read.
    Overrun,
    /// Noise detected on the line.
    Noise,
    /// Line held low for longer than a character.
    Break,
}
