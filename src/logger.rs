//! Raw telegram logging.
//!
//! [`UssLogger`] appends every telegram it is given, byte for byte as it
//! appeared on the wire, to a [`TelegramSink`] (typically a file on an SD
//! card). A session starts with the four byte marker [`USS_LOG_MAGIC`] so
//! that sessions can be found in a concatenated log. An optional activity LED
//! toggles once per logged telegram.
//!
//! Writing to storage is slow. Either call [`UssLogger::log`] from a task fed
//! by a [`TelegramRelay`](crate::relay::TelegramRelay), or install the logger
//! directly as the driver's [`TelegramHandler`] when the sink is fast enough
//! for interrupt context.

use embedded_hal::digital::OutputPin;

use crate::consts::USS_LOG_MAGIC;
use crate::dispatch::{TelegramHandler, TelegramKind};
use crate::error::LogError;
use crate::telegram::Telegram;

/// Append-only byte storage.
pub trait TelegramSink {
    /// Error reported by the storage.
    type Error: core::fmt::Debug;

    /// Opens a new log.
    fn open(&mut self) -> Result<(), Self::Error>;

    /// Appends `bytes` to the open log.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Flushes and closes the log.
    fn close(&mut self) -> Result<(), Self::Error>;
}

/// Logs telegrams to a [`TelegramSink`].
#[derive(Debug)]
pub struct UssLogger<S, LED>
where
    S: TelegramSink,
    LED: OutputPin,
{
    sink: S,
    /// Activity LED
    pub led: Option<LED>,
    led_on: bool,
    logging: bool,
    written: u32,
    failed: u32,
}

impl<S, LED> UssLogger<S, LED>
where
    S: TelegramSink,
    LED: OutputPin,
{
    /// Creates an idle logger.
    pub fn new(sink: S, led: Option<LED>) -> Self {
        Self {
            sink,
            led,
            led_on: false,
            logging: false,
            written: 0,
            failed: 0,
        }
    }

    /// Opens the sink and writes the session marker.
    ///
    /// Does nothing if logging is already running.
    ///
    /// # Errors
    /// [`LogError::Sink`] if the sink cannot be opened or the marker written.
    /// The logger stays stopped.
    pub fn start(&mut self) -> Result<(), LogError<S::Error>> {
        if self.logging {
            return Ok(());
        }
        self.sink.open().map_err(LogError::Sink)?;
        if let Err(err) = self.sink.write(&USS_LOG_MAGIC) {
            let _ = self.sink.close();
            warn!("uss log: cannot write session marker");
            return Err(LogError::Sink(err));
        }
        self.logging = true;
        info!("uss log: started");
        Ok(())
    }

    /// Closes the sink. Does nothing if logging is not running.
    pub fn stop(&mut self) -> Result<(), LogError<S::Error>> {
        if !self.logging {
            return Ok(());
        }
        self.logging = false;
        info!("uss log: stopped after {} telegrams", self.written);
        self.sink.close().map_err(LogError::Sink)
    }

    /// Whether a session is open.
    pub fn is_logging(&self) -> bool {
        self.logging
    }

    /// Telegrams written in total.
    pub fn written(&self) -> u32 {
        self.written
    }

    /// Telegrams the sink failed to store.
    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Appends the complete wire frame of `telegram` and toggles the LED.
    ///
    /// # Errors
    /// - [`LogError::NotLogging`] if no session is open
    /// - [`LogError::Sink`] if the write failed
    pub fn log(&mut self, telegram: &Telegram) -> Result<(), LogError<S::Error>> {
        if !self.logging {
            return Err(LogError::NotLogging);
        }
        if let Err(err) = self.sink.write(telegram.as_bytes()) {
            self.failed = self.failed.wrapping_add(1);
            return Err(LogError::Sink(err));
        }
        self.written = self.written.wrapping_add(1);
        self.toggle_led();
        Ok(())
    }

    fn toggle_led(&mut self) {
        self.led_on = !self.led_on;
        if let Some(led) = self.led.as_mut() {
            let _ = if self.led_on {
                led.set_high()
            } else {
                led.set_low()
            };
        }
    }

    /// Closes any open session and hands back the sink and the LED.
    pub fn release(self) -> (S, Option<LED>) {
        let mut logger = self;
        let _ = logger.stop();
        (logger.sink, logger.led)
    }
}

/// Logs every valid telegram, silently skipping while stopped.
impl<S, LED> TelegramHandler for UssLogger<S, LED>
where
    S: TelegramSink,
    LED: OutputPin,
{
    fn on_telegram(&mut self, _kind: TelegramKind, _telegram: &Telegram) {}

    fn on_any(&mut self, telegram: &Telegram) {
        let _ = self.log(telegram);
    }
}
