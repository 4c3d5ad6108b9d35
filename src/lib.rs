//! # uss485
//!
//! A portable, no_std Rust slave driver for the USS telegram protocol over
//! half-duplex RS-485 links.
//!
//! This driver implements a USS slave using:
//! - small peripheral traits ([`link::SerialLink`], [`link::OneShotTimer`]) over
//!   the board's UART/DMA and a general purpose timer
//! - `embedded-hal` output pins for the RS-485 driver-enable line and an
//!   activity LED
//! - interrupt-safe driver access with `critical-section`
//! - lock-free `heapless` queues to hand telegrams to a logging task
//!
//! ## Crate features
//! | Feature         | Description |
//! |-----------------|-------------|
//! | `std`           | Disables `#![no_std]` |
//! | `isr` (default) | Driver slot helpers, macros and the sender loop over `critical_section` |
//! | `defmt-0-3`     | Uses `defmt` logging |
//! | `log`           | Uses `log` logging |
//!
//! ## Protocol Features
//!
//! - **Framing**: `STX LGE ADR payload… BCC`, 8 data bits, even parity, one stop bit
//! - **Residual time supervision**: a telegram must complete within
//!   `1.5 × LGE` character times
//! - **BCC validation** and address classification (special, mirror,
//!   broadcast, standard)
//! - **Mirror replies** sent back unchanged after the response delay of two
//!   character times
//! - **Telegram logging** through a bounded relay that drops instead of blocking
//!
//! ## Usage
//!
//! ```rust,ignore
//! use uss485::driver::UssConfig;
//! use uss485::{init_uss_driver, start_uss_driver, uss_event};
//!
//! init_uss_driver!(Uart1, Gpt5, Handler, PA12);
//!
//! fn main() {
//!     start_uss_driver!(UssConfig::new(115_200, 3), uart, gpt, Handler, Some(de), None).unwrap();
//!     uss485::tasks::run_uss_sender_loop(&USS_DRIVER, &mut delay, &SHUTDOWN, 100);
//! }
//!
//! #[interrupt]
//! fn USART1() {
//!     uss_event!(char read_byte());
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - Peripheral interrupts must reach the driver one at a time; the driver slot
//!   takes care of that when every interrupt goes through `uss_event!()`
//! - Handlers run in interrupt context and must not block
//! - Only the sender task waits, and never inside a critical section

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

#[cfg(feature = "isr")]
pub use critical_section;

pub use heapless;

pub mod bcc;
pub mod consts;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod link;
pub mod logger;
pub mod receiver;
pub mod relay;
pub mod scheduler;
pub mod tasks;
pub mod telegram;
pub mod timing;

#[cfg(test)]
mod mock;
