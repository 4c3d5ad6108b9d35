use super::{GlobalUssDriver, Shutdown};
use crate::dispatch::TelegramHandler;
use crate::error::UssError;
use crate::link::{OneShotTimer, SerialLink};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Outcome of one [`uss_sender_step`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SenderStep {
    /// No reply was scheduled.
    Idle,
    /// The response delay elapsed and the reply went to the link.
    Started,
    /// The reply was dropped, either by the link or by a concurrent stop.
    Failed,
    /// The driver was restarted during the response delay and holds a newer
    /// reply. It stays parked and is served, with its own full delay, by the
    /// next step.
    Deferred,
    /// The driver slot is empty.
    Stopped,
}

/// Serves one scheduled reply, if any.
///
/// Consumes the driver's wake signal, blocks on `delay` for the response
/// delay **outside** of any critical section, then starts the transmission.
/// A reply is therefore never put on the wire earlier than two character
/// times after it was scheduled, even if the driver is replaced while the
/// sender sleeps.
pub fn uss_sender_step<L, T, H, DE, D>(
    global_driver: &GlobalUssDriver<L, T, H, DE>,
    delay: &mut D,
) -> SenderStep
where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
    D: DelayNs,
{
    let woken = critical_section::with(|cs| {
        global_driver
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .map(|driver| {
                driver
                    .poll_send_request()
                    .ok()
                    .map(|()| driver.response_delay_us())
            })
    });
    let response_delay_us = match woken {
        None => return SenderStep::Stopped,
        Some(None) => return SenderStep::Idle,
        Some(Some(us)) => us,
    };

    delay.delay_us(response_delay_us);

    let started = critical_section::with(|cs| {
        global_driver
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .map(|driver| match driver.begin_transmission() {
                Ok(()) => SenderStep::Started,
                Err(UssError::ResponsePending) => SenderStep::Deferred,
                Err(_) => SenderStep::Failed,
            })
    });
    started.unwrap_or(SenderStep::Stopped)
}

/// Blocking sender task.
///
/// Repeats [`uss_sender_step`], polling every `poll_us` while idle and waiting
/// for the end of each transmission before looking for the next reply.
///
/// # Arguments
/// - `global_driver`: the slot the driver was started in
/// - `delay`: a delay provider, typically from the HAL
/// - `shutdown`: returns once raised
/// - `poll_us`: polling period in microseconds (e.g. [`USS_POLL_INTERVAL_US`](crate::consts::USS_POLL_INTERVAL_US))
///
/// # Notes
/// - Returns as soon as the driver slot is empty, so start the driver first.
pub fn run_uss_sender_loop<L, T, H, DE, D>(
    global_driver: &GlobalUssDriver<L, T, H, DE>,
    delay: &mut D,
    shutdown: &Shutdown,
    poll_us: u32,
) where
    L: SerialLink,
    T: OneShotTimer,
    H: TelegramHandler,
    DE: OutputPin,
    D: DelayNs,
{
    while !shutdown.is_requested() {
        match uss_sender_step(global_driver, delay) {
            SenderStep::Stopped => break,
            SenderStep::Started => {
                while !shutdown.is_requested() {
                    let idle = critical_section::with(|cs| {
                        global_driver
                            .borrow(cs)
                            .borrow_mut()
                            .as_ref()
                            .map(|driver| driver.poll_transmit_idle().is_ok())
                    });
                    match idle {
                        None | Some(true) => break,
                        Some(false) => delay.delay_us(poll_us),
                    }
                }
            }
            SenderStep::Deferred => {}
            SenderStep::Idle | SenderStep::Failed => delay.delay_us(poll_us),
        }
    }
    debug!("uss: sender loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::UssConfig;
    use crate::mock::{LinkCall, MockClock, MockLink, MockTimer, Recorder, RecordingDelay, frame};
    use crate::scheduler::TxState;
    use crate::tasks::{
        global_uss_block_received, global_uss_char_received, global_uss_driver_init,
        global_uss_driver_start, global_uss_driver_stop, global_uss_transmit_complete,
        global_uss_with,
    };
    use embedded_hal_mock::eh1::digital::Mock as PinMock;

    type Slot = GlobalUssDriver<MockLink, MockTimer, Recorder, PinMock>;

    fn started(clock: &MockClock) -> Slot {
        let slot: Slot = global_uss_driver_init();
        let link = MockLink {
            clock: Some(clock.clone()),
            ..MockLink::default()
        };
        global_uss_driver_start(
            &slot,
            UssConfig::new(115_200, 0),
            link,
            MockTimer::default(),
            Recorder::default(),
            None,
            None,
        )
        .unwrap();
        slot
    }

    fn receive(slot: &Slot, wire: &[u8]) {
        for &b in &wire[..2] {
            let _ = global_uss_char_received(slot, b);
        }
        let _ = global_uss_block_received(slot, &wire[2..]);
    }

    fn sends(slot: &Slot) -> usize {
        global_uss_with(slot, |driver| {
            driver
                .link
                .calls
                .iter()
                .filter(|c| matches!(c, LinkCall::Send(_)))
                .count()
        })
        .unwrap_or(0)
    }

    #[test]
    fn test_idle_without_request() {
        let clock = MockClock::default();
        let slot = started(&clock);
        let mut delay = RecordingDelay::default();
        assert_eq!(uss_sender_step(&slot, &mut delay), SenderStep::Idle);
        assert!(delay.waits_us.is_empty());
    }

    #[test]
    fn test_empty_slot_stops() {
        let slot: Slot = global_uss_driver_init();
        let mut delay = RecordingDelay::default();
        assert_eq!(uss_sender_step(&slot, &mut delay), SenderStep::Stopped);
        run_uss_sender_loop(&slot, &mut delay, &Shutdown::new(), 100);
    }

    #[test]
    fn test_reply_waits_two_character_times() {
        let clock = MockClock::default();
        let slot = started(&clock);
        clock.advance(1_000);
        let scheduled_at = clock.now_us();
        let wire = frame(0x40, &[0x11, 0x22]);
        receive(&slot, &wire);
        assert_eq!(sends(&slot), 0);

        let mut delay = RecordingDelay {
            clock: clock.clone(),
            ..RecordingDelay::default()
        };
        assert_eq!(uss_sender_step(&slot, &mut delay), SenderStep::Started);
        assert_eq!(delay.waits_us, vec![191]);

        let (sent_at, calls) =
            global_uss_with(&slot, |d| (d.link.sent_at_us.clone(), d.link.calls.clone())).unwrap();
        // 2 × 11 bits at 115 200 baud is 190.97 µs.
        assert!(sent_at[0] - scheduled_at >= 191);
        assert_eq!(calls.last(), Some(&LinkCall::Send(wire)));
        assert_eq!(
            global_uss_with(&slot, |d| d.tx_state()),
            Some(TxState::Sending)
        );
    }

    #[test]
    fn test_restart_during_response_delay_keeps_new_reply_waiting() {
        // Part way through the sleep the slot gets a fresh driver which
        // schedules its own mirror reply.
        struct RestartingDelay<'a> {
            slot: &'a Slot,
            clock: MockClock,
            wire: Vec<u8>,
            scheduled_at: Option<u64>,
        }

        impl DelayNs for RestartingDelay<'_> {
            fn delay_ns(&mut self, ns: u32) {
                self.clock.advance(u64::from(ns.div_ceil(1_000)));
            }

            fn delay_us(&mut self, us: u32) {
                if self.scheduled_at.is_none() {
                    self.clock.advance(95);
                    let link = MockLink {
                        clock: Some(self.clock.clone()),
                        ..MockLink::default()
                    };
                    global_uss_driver_start(
                        self.slot,
                        UssConfig::new(115_200, 0),
                        link,
                        MockTimer::default(),
                        Recorder::default(),
                        None,
                        None,
                    )
                    .unwrap();
                    receive(self.slot, &self.wire);
                    self.scheduled_at = Some(self.clock.now_us());
                    self.clock.advance(u64::from(us) - 95);
                } else {
                    self.clock.advance(u64::from(us));
                }
            }
        }

        let clock = MockClock::default();
        let slot = started(&clock);
        receive(&slot, &frame(0x40, &[0x01]));

        let wire = frame(0x40, &[0x02]);
        let mut delay = RestartingDelay {
            slot: &slot,
            clock: clock.clone(),
            wire: wire.clone(),
            scheduled_at: None,
        };
        assert_eq!(uss_sender_step(&slot, &mut delay), SenderStep::Deferred);
        assert_eq!(sends(&slot), 0);
        assert_eq!(
            global_uss_with(&slot, |d| d.tx_state()),
            Some(TxState::ResponseWait)
        );

        assert_eq!(uss_sender_step(&slot, &mut delay), SenderStep::Started);
        let (sent_at, calls) =
            global_uss_with(&slot, |d| (d.link.sent_at_us.clone(), d.link.calls.clone())).unwrap();
        let scheduled_at = delay.scheduled_at.unwrap();
        assert!(sent_at[0] - scheduled_at >= 191);
        assert_eq!(calls.last(), Some(&LinkCall::Send(wire)));
    }

    #[test]
    fn test_stop_during_response_delay_drops_reply() {
        struct StoppingDelay<'a>(&'a Slot);

        impl DelayNs for StoppingDelay<'_> {
            fn delay_ns(&mut self, _ns: u32) {
                let _ = global_uss_driver_stop(self.0);
            }
        }

        let clock = MockClock::default();
        let slot = started(&clock);
        receive(&slot, &frame(0x40, &[]));
        let mut delay = StoppingDelay(&slot);
        assert_eq!(uss_sender_step(&slot, &mut delay), SenderStep::Stopped);
    }

    #[test]
    fn test_loop_serves_reply_then_shuts_down() {
        // Each delay completes any transmission in flight and requests a stop
        // once the first reply is out.
        struct CompletingDelay<'a> {
            slot: &'a Slot,
            shutdown: &'a Shutdown,
        }

        impl DelayNs for CompletingDelay<'_> {
            fn delay_ns(&mut self, _ns: u32) {}

            fn delay_us(&mut self, _us: u32) {
                if sends(self.slot) > 0 {
                    global_uss_transmit_complete(self.slot);
                    self.shutdown.request();
                }
            }
        }

        let clock = MockClock::default();
        let slot = started(&clock);
        let shutdown = Shutdown::new();
        receive(&slot, &frame(0x40, &[0x42]));

        let mut delay = CompletingDelay {
            slot: &slot,
            shutdown: &shutdown,
        };
        run_uss_sender_loop(&slot, &mut delay, &shutdown, 100);

        assert_eq!(sends(&slot), 1);
        assert_eq!(global_uss_with(&slot, |d| d.tx_state()), Some(TxState::Idle));
        assert_eq!(global_uss_with(&slot, |d| d.stats.tx_good), Some(1));
    }
}
