//! Host-side test doubles for the peripheral traits.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::digital::Mock as PinMock;

use crate::dispatch::{TelegramHandler, TelegramKind};
use crate::driver::{UssConfig, UssDriver};
use crate::link::{OneShotTimer, SerialLink};
use crate::logger::TelegramSink;
use crate::telegram::Telegram;

/// Simulated microsecond clock shared by the link and the delay.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockClock(Arc<AtomicU64>);

impl MockClock {
    pub(crate) fn now_us(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn advance(&self, us: u64) {
        let _ = self.0.fetch_add(us, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LinkCall {
    Enable(u32),
    Disable,
    StartReceive(usize),
    StopReceive,
    Send(Vec<u8>),
}

#[derive(Debug, Default)]
pub(crate) struct MockLink {
    pub(crate) calls: Vec<LinkCall>,
    pub(crate) fail_enable: bool,
    pub(crate) fail_receive: bool,
    pub(crate) fail_send: bool,
    pub(crate) clock: Option<MockClock>,
    pub(crate) sent_at_us: Vec<u64>,
}

impl SerialLink for MockLink {
    type Error = ();

    fn enable(&mut self, baud: u32) -> Result<(), ()> {
        self.calls.push(LinkCall::Enable(baud));
        if self.fail_enable { Err(()) } else { Ok(()) }
    }

    fn disable(&mut self) {
        self.calls.push(LinkCall::Disable);
    }

    fn start_block_receive(&mut self, len: usize) -> Result<(), ()> {
        if self.fail_receive {
            return Err(());
        }
        self.calls.push(LinkCall::StartReceive(len));
        Ok(())
    }

    fn stop_block_receive(&mut self) {
        self.calls.push(LinkCall::StopReceive);
    }

    fn start_send(&mut self, frame: &[u8]) -> Result<(), ()> {
        if self.fail_send {
            return Err(());
        }
        if let Some(clock) = &self.clock {
            self.sent_at_us.push(clock.now_us());
        }
        self.calls.push(LinkCall::Send(frame.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerCall {
    Enable(u32),
    Disable,
    Start(u32),
    Stop,
}

#[derive(Debug, Default)]
pub(crate) struct MockTimer {
    pub(crate) calls: Vec<TimerCall>,
}

impl OneShotTimer for MockTimer {
    fn enable(&mut self, tick_hz: u32) {
        self.calls.push(TimerCall::Enable(tick_hz));
    }

    fn disable(&mut self) {
        self.calls.push(TimerCall::Disable);
    }

    fn start(&mut self, ticks: u32) {
        self.calls.push(TimerCall::Start(ticks));
    }

    fn stop(&mut self) {
        self.calls.push(TimerCall::Stop);
    }
}

/// Records every callback with the frame or payload it carried.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub(crate) delivered: Vec<(TelegramKind, Vec<u8>)>,
    pub(crate) any: Vec<Vec<u8>>,
}

impl TelegramHandler for Recorder {
    fn on_telegram(&mut self, kind: TelegramKind, telegram: &Telegram) {
        self.delivered.push((kind, telegram.payload().to_vec()));
    }

    fn on_any(&mut self, telegram: &Telegram) {
        self.any.push(telegram.as_bytes().to_vec());
    }
}

/// Delay that advances a [`MockClock`] instead of sleeping.
#[derive(Debug, Default)]
pub(crate) struct RecordingDelay {
    pub(crate) clock: MockClock,
    pub(crate) waits_us: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(u64::from(ns.div_ceil(1_000)));
    }

    fn delay_us(&mut self, us: u32) {
        self.waits_us.push(us);
        self.clock.advance(u64::from(us));
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemorySink {
    pub(crate) open: bool,
    pub(crate) opens: usize,
    pub(crate) data: Vec<u8>,
    pub(crate) fail_open: bool,
    pub(crate) fail_write: bool,
}

impl TelegramSink for MemorySink {
    type Error = ();

    fn open(&mut self) -> Result<(), ()> {
        if self.fail_open {
            return Err(());
        }
        self.open = true;
        self.opens += 1;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ()> {
        if self.fail_write || !self.open {
            return Err(());
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) -> Result<(), ()> {
        self.open = false;
        Ok(())
    }
}

pub(crate) type TestDriver<H = Recorder> = UssDriver<MockLink, MockTimer, H, PinMock>;

pub(crate) fn start_driver(node_number: u8) -> TestDriver {
    TestDriver::start(
        UssConfig::new(115_200, node_number),
        MockLink::default(),
        MockTimer::default(),
        Recorder::default(),
        None,
        None,
    )
    .unwrap()
}

/// A well-formed wire frame.
pub(crate) fn frame(adr: u8, payload: &[u8]) -> Vec<u8> {
    Telegram::build(adr, payload).unwrap().as_bytes().to_vec()
}
