//! Bounded, lossy hand-off of telegrams from interrupt context to a task.
//!
//! The relay owns a fixed pool of telegram buffers that circulate between two
//! single-producer/single-consumer rings:
//!
//! ```text
//!              +------------ free ------------+
//!              v                              |
//!   RelayProducer::offer            RelayConsumer::recycle
//!              |                              ^
//!              +----------- filled ---------->+
//!                                   RelayConsumer::poll
//! ```
//!
//! The producer never blocks. When every buffer is in flight the telegram is
//! dropped and counted, so a slow consumer can only lose telegrams, never
//! stall the receive path.
//!
//! A driver living in a `static` slot needs a `'static` producer, so the
//! relay itself has to be `'static`. [`TelegramRelay::new`] is a `const fn`
//! and the pool is loaded by the first [`TelegramRelay::split`]:
//!
//! ```rust,ignore
//! use static_cell::StaticCell;
//!
//! static RELAY: StaticCell<UssRelay> = StaticCell::new();
//!
//! let (producer, consumer) = RELAY.init(UssRelay::new()).split();
//! start_uss_driver!(config, uart, gpt, producer, Some(de), None)?;
//! ```

use core::convert::Infallible;
use core::fmt;

use embedded_hal::delay::DelayNs;
use heapless::spsc::{Consumer, Producer, Queue};

use crate::consts::USS_RELAY_QUEUE_LEN;
use crate::dispatch::{TelegramHandler, TelegramKind};
use crate::error::RelayError;
use crate::telegram::Telegram;

/// Relay sized with the default queue length.
pub type UssRelay = TelegramRelay<USS_RELAY_QUEUE_LEN>;

/// Storage for the pool and both rings.
///
/// Each ring holds `Q - 1` elements, which is also the number of buffers in
/// the pool.
#[derive(Debug)]
pub struct TelegramRelay<const Q: usize> {
    free: Queue<Telegram, Q>,
    filled: Queue<Telegram, Q>,
    loaded: bool,
}

impl<const Q: usize> Default for TelegramRelay<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const Q: usize> TelegramRelay<Q> {
    /// Number of telegram buffers in circulation.
    pub const POOL_SIZE: usize = Q - 1;

    /// Creates an empty relay, usable in a `static` initializer.
    pub const fn new() -> Self {
        Self {
            free: Queue::new(),
            filled: Queue::new(),
            loaded: false,
        }
    }

    /// Splits the relay into its interrupt side and its task side.
    ///
    /// The first call puts every buffer of the pool into the free ring. Later
    /// calls reuse whatever buffers the previous halves left behind.
    pub fn split(&mut self) -> (RelayProducer<'_, Q>, RelayConsumer<'_, Q>) {
        if !self.loaded {
            while self.free.enqueue(Telegram::new()).is_ok() {}
            self.loaded = true;
        }
        let (free_tx, free_rx) = self.free.split();
        let (filled_tx, filled_rx) = self.filled.split();
        (
            RelayProducer {
                free: free_rx,
                filled: filled_tx,
                dropped: 0,
            },
            RelayConsumer {
                free: free_tx,
                filled: filled_rx,
            },
        )
    }
}

/// Interrupt side of a [`TelegramRelay`].
///
/// Implements [`TelegramHandler`] by offering every valid telegram, so it can
/// be installed directly as the driver's handler.
pub struct RelayProducer<'a, const Q: usize> {
    free: Consumer<'a, Telegram, Q>,
    filled: Producer<'a, Telegram, Q>,
    dropped: u32,
}

impl<const Q: usize> fmt::Debug for RelayProducer<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayProducer")
            .field("free", &self.free.len())
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl<const Q: usize> RelayProducer<'_, Q> {
    /// Copies `telegram` into a free buffer and queues it.
    ///
    /// # Errors
    /// [`RelayError::PoolExhausted`] if no buffer is free. The telegram is
    /// dropped and counted.
    pub fn offer(&mut self, telegram: &Telegram) -> Result<(), RelayError> {
        let Some(mut slot) = self.free.dequeue() else {
            self.dropped = self.dropped.wrapping_add(1);
            trace!("uss relay: pool exhausted, telegram dropped");
            return Err(RelayError::PoolExhausted);
        };
        slot.clone_from(telegram);
        self.filled
            .enqueue(slot)
            .map_err(|_| RelayError::QueueFull)
    }

    /// Telegrams dropped because the pool was exhausted.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const Q: usize> TelegramHandler for RelayProducer<'_, Q> {
    fn on_telegram(&mut self, _kind: TelegramKind, _telegram: &Telegram) {}

    fn on_any(&mut self, telegram: &Telegram) {
        let _ = self.offer(telegram);
    }
}

/// Task side of a [`TelegramRelay`].
pub struct RelayConsumer<'a, const Q: usize> {
    free: Producer<'a, Telegram, Q>,
    filled: Consumer<'a, Telegram, Q>,
}

impl<const Q: usize> fmt::Debug for RelayConsumer<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConsumer")
            .field("pending", &self.filled.len())
            .finish()
    }
}

impl<const Q: usize> RelayConsumer<'_, Q> {
    /// Takes the oldest queued telegram.
    ///
    /// Returns [`nb::Error::WouldBlock`] while the queue is empty. The buffer
    /// must be handed back with [`recycle`](Self::recycle) once processed.
    pub fn poll(&mut self) -> nb::Result<Telegram, Infallible> {
        self.filled.dequeue().ok_or(nb::Error::WouldBlock)
    }

    /// Returns a processed buffer to the pool.
    ///
    /// # Errors
    /// [`RelayError::QueueFull`] if the buffer did not come from this relay
    /// and the pool is already complete.
    pub fn recycle(&mut self, telegram: Telegram) -> Result<(), RelayError> {
        self.free
            .enqueue(telegram)
            .map_err(|_| RelayError::QueueFull)
    }

    /// Waits up to `timeout_us` for a telegram, polling every `poll_us`.
    pub fn recv_timeout<D: DelayNs>(
        &mut self,
        delay: &mut D,
        timeout_us: u32,
        poll_us: u32,
    ) -> Option<Telegram> {
        let poll_us = poll_us.max(1);
        let mut waited = 0u32;
        loop {
            if let Ok(telegram) = self.poll() {
                return Some(telegram);
            }
            if waited >= timeout_us {
                return None;
            }
            delay.delay_us(poll_us);
            waited = waited.saturating_add(poll_us);
        }
    }

    /// Number of telegrams waiting.
    pub fn pending(&self) -> usize {
        self.filled.len()
    }
}
