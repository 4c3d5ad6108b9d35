//! Glue between interrupt handlers, the driver and the background tasks.
//!
//! The driver itself is an event sink. On a real target it lives in a
//! `critical_section::Mutex<RefCell<Option<UssDriver>>>` slot declared by the
//! application (`isr` feature):
//!
//! - `global_uss_*` helpers and the `uss_event!()` macro forward peripheral
//!   interrupts to the driver in the slot
//! - [`run_uss_sender_loop`] waits for a scheduled reply, sleeps the response
//!   delay and starts the transmission (`isr` feature)
//! - [`run_relay_worker`] drains a [`TelegramRelay`](crate::relay::TelegramRelay)
//!   into a [`UssLogger`](crate::logger::UssLogger)
//!
//! Both loops return once their [`Shutdown`] flag is raised. The sender also
//! returns when the driver slot is emptied by `global_uss_driver_stop`.

use core::sync::atomic::{AtomicBool, Ordering};

mod worker;
pub use worker::*;

#[cfg(feature = "isr")]
mod isr;
#[cfg(feature = "isr")]
pub use isr::*;

#[cfg(feature = "isr")]
mod sender;
#[cfg(feature = "isr")]
pub use sender::*;

#[cfg(feature = "isr")]
mod macros;

/// Stop request shared between the application and the task loops.
#[derive(Debug, Default)]
pub struct Shutdown(AtomicBool);

impl Shutdown {
    /// Creates a flag that is not raised.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Asks every loop watching this flag to return.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Lowers the flag so the loops can be started again.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether a stop was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
