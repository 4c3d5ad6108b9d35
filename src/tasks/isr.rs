use crate::driver::{UssConfig, UssDriver, UssParts};
use crate::dispatch::{TelegramHandler, TelegramKind};
use crate::error::UssError;
use crate::link::{LineError, OneShotTimer, SerialLink};
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::digital::OutputPin;

/// Interrupt-safe slot holding a running [`UssDriver`].
pub type GlobalUssDriver<L, T, H, DE> = Mutex<RefCell<Option<UssDriver<L, T, H, DE>>>>;

/// Creates an empty driver slot, usable in a `static`.
///
/// # Example
/// ```rust,ignore
/// use uss485::tasks::{GlobalUssDriver, global_uss_driver_init};
///
/// static USS_DRIVER: GlobalUssDriver<Uart1, Gpt5, Handler, PA12> =
///     global_uss_driver_init();
/// ```
pub const fn global_uss_driver_init<L, T, H, DE>() -> GlobalUssDriver<L, T, H, DE>
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    Mutex::new(RefCell::new(None))
}

/// Starts a driver and places it in the slot.
///
/// A driver already in the slot is stopped and dropped first.
///
/// # Errors
/// Whatever [`UssDriver::start`] reports. The slot is left empty.
pub fn global_uss_driver_start<L, T, H, DE>(
    global_driver: &GlobalUssDriver<L, T, H, DE>,
    config: UssConfig,
    link: L,
    timer: T,
    handler: H,
    de: Option<DE>,
    de_inverted: Option<bool>,
) -> Result<(), UssError<L::Error>>
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    let _ = global_uss_driver_stop(global_driver);
    let driver = UssDriver::start(config, link, timer, handler, de, de_inverted)?;
    critical_section::with(|cs| {
        let _ = global_driver.borrow(cs).replace(Some(driver));
    });
    Ok(())
}

/// Removes the driver from the slot, stops it and hands back its parts.
///
/// Returns `None` if the slot was empty. The sender loop returns on its next
/// iteration.
pub fn global_uss_driver_stop<L, T, H, DE>(
    global_driver: &GlobalUssDriver<L, T, H, DE>,
) -> Option<UssParts<L, T, H, DE>>
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    critical_section::with(|cs| global_driver.borrow(cs).take()).map(UssDriver::stop)
}

/// Runs `f` on the driver in the slot, inside a critical section.
///
/// Returns `None` if the slot is empty.
pub fn global_uss_with<L, T, H, DE, R>(
    global_driver: &GlobalUssDriver<L, T, H, DE>,
    f: impl FnOnce(&mut UssDriver<L, T, H, DE>) -> R,
) -> Option<R>
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    critical_section::with(|cs| global_driver.borrow(cs).borrow_mut().as_mut().map(f))
}

/// Forwards a received character.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn USART1() {
///     let byte = read_data_register();
///     let _ = global_uss_char_received(&USS_DRIVER, byte);
/// }
/// ```
pub fn global_uss_char_received<L, T, H, DE>(
    global_driver: &GlobalUssDriver<L, T, H, DE>,
    byte: u8,
) -> Option<Result<(), UssError<L::Error>>>
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    global_uss_with(global_driver, |driver| driver.on_char_received(byte))
}

/// Forwards a completed block receive.
pub fn global_uss_block_received<L, T, H, DE>(
    global_driver: &GlobalUssDriver<L, T, H, DE>,
    body: &[u8],
) -> Option<Result<TelegramKind, UssError<L::Error>>>
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    global_uss_with(global_driver, |driver| driver.on_block_received(body))
}

/// Forwards a line error.
pub fn global_uss_line_error<L, T, H, DE>(
    global_driver: &GlobalUssDriver<L, T, H, DE>,
    error: LineError,
) where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    let _ = global_uss_with(global_driver, |driver| driver.on_line_error(error));
}

/// Forwards the expiry of the residual timer.
pub fn global_uss_residual_timeout<L, T, H, DE>(global_driver: &GlobalUssDriver<L, T, H, DE>)
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    let _ = global_uss_with(global_driver, |driver| driver.on_residual_timeout());
}

/// Forwards the physical end of a transmission.
pub fn global_uss_transmit_complete<L, T, H, DE>(global_driver: &GlobalUssDriver<L, T, H, DE>)
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
{
    let _ = global_uss_with(global_driver, |driver| driver.on_transmit_complete());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::UssStatus;
    use crate::mock::{MockLink, MockTimer, Recorder, frame};
    use crate::receiver::RxState;
    use embedded_hal_mock::eh1::digital::Mock as PinMock;

    type Slot = GlobalUssDriver<MockLink, MockTimer, Recorder, PinMock>;

    fn started() -> Slot {
        let slot: Slot = global_uss_driver_init();
        global_uss_driver_start(
            &slot,
            UssConfig::new(115_200, 4),
            MockLink::default(),
            MockTimer::default(),
            Recorder::default(),
            None,
            None,
        )
        .unwrap();
        slot
    }

    fn feed(slot: &Slot, wire: &[u8]) -> Option<Result<TelegramKind, UssError<()>>> {
        for &b in &wire[..2] {
            let _ = global_uss_char_received(slot, b);
        }
        global_uss_block_received(slot, &wire[2..])
    }

    #[test]
    fn test_empty_slot_ignores_events() {
        let slot: Slot = global_uss_driver_init();
        assert!(global_uss_char_received(&slot, 0x02).is_none());
        assert!(global_uss_block_received(&slot, &[0x00]).is_none());
        global_uss_line_error(&slot, LineError::Noise);
        global_uss_residual_timeout(&slot);
        global_uss_transmit_complete(&slot);
        assert!(global_uss_driver_stop(&slot).is_none());
    }

    #[test]
    fn test_events_reach_the_driver() {
        let slot = started();
        let kind = feed(&slot, &frame(0x04, &[0x10, 0x20])).unwrap().unwrap();
        assert_eq!(kind, TelegramKind::Standard);

        let delivered = global_uss_with(&slot, |driver| driver.handler.delivered.clone());
        assert_eq!(
            delivered,
            Some(vec![(TelegramKind::Standard, vec![0x10, 0x20])])
        );
    }

    #[test]
    fn test_timeout_and_line_error_through_slot() {
        let slot = started();
        let _ = global_uss_char_received(&slot, 0x02);
        let _ = global_uss_char_received(&slot, 0x04);
        global_uss_residual_timeout(&slot);
        assert_eq!(
            global_uss_with(&slot, |driver| driver.rx_state()),
            Some(RxState::AwaitStart)
        );

        let _ = global_uss_char_received(&slot, 0x02);
        global_uss_line_error(&slot, LineError::Overrun);
        let stats = global_uss_with(&slot, |driver| driver.stats).unwrap();
        assert_eq!(stats.rx_timeouts, 1);
        assert_eq!(stats.rx_line_errors, 1);
        assert_eq!(
            global_uss_with(&slot, |driver| driver.status()),
            Some(UssStatus::Ok)
        );
    }

    #[test]
    fn test_stop_empties_the_slot() {
        let slot = started();
        let parts = global_uss_driver_stop(&slot).unwrap();
        assert_eq!(parts.handler.any.len(), 0);
        assert!(global_uss_char_received(&slot, 0x02).is_none());
    }

    #[test]
    fn test_failed_start_leaves_slot_empty() {
        let slot: Slot = global_uss_driver_init();
        let result = global_uss_driver_start(
            &slot,
            UssConfig::new(115_200, 40),
            MockLink::default(),
            MockTimer::default(),
            Recorder::default(),
            None,
            None,
        );
        assert!(matches!(result, Err(UssError::InvalidNodeNumber(40))));
        assert!(global_uss_with(&slot, |_| ()).is_none());
    }
}
