use super::Shutdown;
use crate::consts::{USS_POLL_INTERVAL_US, USS_RELAY_WAIT_US};
use crate::logger::{TelegramSink, UssLogger};
use crate::relay::RelayConsumer;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Outcome of one [`relay_worker_step`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum WorkerStep {
    /// Nothing arrived within the wait.
    Idle,
    /// A telegram was written to the log.
    Logged,
    /// A telegram arrived but the logger refused it.
    Failed,
}

/// Waits up to `wait_us` for a relayed telegram and logs it.
///
/// The buffer goes back to the pool whatever the logger says.
pub fn relay_worker_step<const Q: usize, S, LED, D>(
    consumer: &mut RelayConsumer<'_, Q>,
    logger: &mut UssLogger<S, LED>,
    delay: &mut D,
    wait_us: u32,
    poll_us: u32,
) -> WorkerStep
where
    S: TelegramSink,
    LED: OutputPin,
    D: DelayNs,
{
    let Some(telegram) = consumer.recv_timeout(delay, wait_us, poll_us) else {
        return WorkerStep::Idle;
    };
    let logged = logger.log(&telegram).is_ok();
    let _ = consumer.recycle(telegram);
    if logged {
        WorkerStep::Logged
    } else {
        WorkerStep::Failed
    }
}

/// Blocking relay consumer task.
///
/// Logs relayed telegrams until `shutdown` is raised, checking the flag at
/// least every [`USS_RELAY_WAIT_US`].
///
/// # Example
/// ```rust,ignore
/// let mut relay = UssRelay::new();
/// let (producer, mut consumer) = relay.split();
/// // hand `producer` to the driver as its handler, then:
/// run_relay_worker(&mut consumer, &mut logger, &mut delay, &SHUTDOWN);
/// ```
pub fn run_relay_worker<const Q: usize, S, LED, D>(
    consumer: &mut RelayConsumer<'_, Q>,
    logger: &mut UssLogger<S, LED>,
    delay: &mut D,
    shutdown: &Shutdown,
) where
    S: TelegramSink,
    LED: OutputPin,
    D: DelayNs,
{
    while !shutdown.is_requested() {
        let _ = relay_worker_step(
            consumer,
            logger,
            delay,
            USS_RELAY_WAIT_US,
            USS_POLL_INTERVAL_US,
        );
    }
    debug!("uss: relay worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemorySink, RecordingDelay};
    use crate::relay::TelegramRelay;
    use crate::telegram::Telegram;
    use embedded_hal_mock::eh1::digital::Mock as PinMock;

    type TestLogger = UssLogger<MemorySink, PinMock>;

    fn started_logger() -> TestLogger {
        let mut logger = TestLogger::new(MemorySink::default(), None);
        logger.start().unwrap();
        logger
    }

    #[test]
    fn test_step_logs_and_recycles() {
        let mut relay: TelegramRelay<3> = TelegramRelay::new();
        let (mut producer, mut consumer) = relay.split();
        let mut logger = started_logger();
        let mut delay = RecordingDelay::default();
        let telegram = Telegram::build(0x01, &[0xaa]).unwrap();

        producer.offer(&telegram).unwrap();
        producer.offer(&telegram).unwrap();
        assert!(producer.offer(&telegram).is_err());

        assert_eq!(
            relay_worker_step(&mut consumer, &mut logger, &mut delay, 1_000, 100),
            WorkerStep::Logged
        );
        // The buffer went back to the pool.
        producer.offer(&telegram).unwrap();
        assert_eq!(logger.written(), 1);
    }

    #[test]
    fn test_step_times_out_when_empty() {
        let mut relay: TelegramRelay<3> = TelegramRelay::new();
        let (_producer, mut consumer) = relay.split();
        let mut logger = started_logger();
        let mut delay = RecordingDelay::default();
        assert_eq!(
            relay_worker_step(&mut consumer, &mut logger, &mut delay, 500, 100),
            WorkerStep::Idle
        );
        assert_eq!(delay.clock.now_us(), 500);
    }

    #[test]
    fn test_step_recycles_even_when_logging_is_stopped() {
        let mut relay: TelegramRelay<2> = TelegramRelay::new();
        let (mut producer, mut consumer) = relay.split();
        let mut logger = TestLogger::new(MemorySink::default(), None);
        let mut delay = RecordingDelay::default();
        let telegram = Telegram::build(0x01, &[]).unwrap();

        producer.offer(&telegram).unwrap();
        assert_eq!(
            relay_worker_step(&mut consumer, &mut logger, &mut delay, 0, 100),
            WorkerStep::Failed
        );
        producer.offer(&telegram).unwrap();
    }

    #[test]
    fn test_worker_drains_then_stops() {
        struct StopWhenIdle<'a>(&'a Shutdown);

        impl DelayNs for StopWhenIdle<'_> {
            fn delay_ns(&mut self, _ns: u32) {
                self.0.request();
            }
        }

        let mut relay: TelegramRelay<4> = TelegramRelay::new();
        let (mut producer, mut consumer) = relay.split();
        let mut logger = started_logger();
        let shutdown = Shutdown::new();
        for tag in 0..3 {
            producer.offer(&Telegram::build(0x00, &[tag]).unwrap()).unwrap();
        }

        run_relay_worker(
            &mut consumer,
            &mut logger,
            &mut StopWhenIdle(&shutdown),
            &shutdown,
        );

        assert_eq!(logger.written(), 3);
        assert_eq!(consumer.pending(), 0);
        let (sink, _) = logger.release();
        assert_eq!(sink.data.len(), 4 + 3 * 5);
    }
}
