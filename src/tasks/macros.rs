/// Declares a static `USS_DRIVER` slot protected by a `critical_section` mutex.
///
/// # Arguments
/// - `$link`: the concrete [`SerialLink`](crate::link::SerialLink) type
/// - `$timer`: the concrete [`OneShotTimer`](crate::link::OneShotTimer) type
/// - `$handler`: the concrete [`TelegramHandler`](crate::dispatch::TelegramHandler) type
/// - `$de`: the concrete driver-enable pin type (must implement `OutputPin`)
///
/// # Example
/// ```rust,ignore
/// init_uss_driver!(Uart1, Gpt5, Handler, PA12);
/// ```
#[macro_export]
macro_rules! init_uss_driver {
    ( $link:ty, $timer:ty, $handler:ty, $de:ty ) => {
        pub static USS_DRIVER: $crate::tasks::GlobalUssDriver<$link, $timer, $handler, $de> =
            $crate::tasks::global_uss_driver_init();
    };
}

/// Starts a driver in the `USS_DRIVER` slot declared by [`init_uss_driver!`].
///
/// Takes the arguments of [`UssDriver::start`](crate::driver::UssDriver::start)
/// and evaluates to its `Result`.
///
/// # Example
/// ```rust,ignore
/// start_uss_driver!(UssConfig::new(115_200, 3), uart, gpt, handler, Some(de), None)?;
/// ```
#[macro_export]
macro_rules! start_uss_driver {
    ( $config:expr, $link:expr, $timer:expr, $handler:expr, $de:expr, $de_inverted:expr $(,)? ) => {
        $crate::tasks::global_uss_driver_start(
            &USS_DRIVER,
            $config,
            $link,
            $timer,
            $handler,
            $de,
            $de_inverted,
        )
    };
}

/// Forwards a peripheral event to the driver in `USS_DRIVER`.
///
/// Does nothing while the slot is empty.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn USART1() {
///     uss_event!(char byte);
/// }
///
/// #[interrupt]
/// fn TIM5() {
///     uss_event!(residual_timeout);
/// }
/// ```
#[macro_export]
macro_rules! uss_event {
    (char $byte:expr) => {
        let _ = $crate::tasks::global_uss_char_received(&USS_DRIVER, $byte);
    };
    (block $body:expr) => {
        let _ = $crate::tasks::global_uss_block_received(&USS_DRIVER, $body);
    };
    (line_error $error:expr) => {
        $crate::tasks::global_uss_line_error(&USS_DRIVER, $error);
    };
    (residual_timeout) => {
        $crate::tasks::global_uss_residual_timeout(&USS_DRIVER);
    };
    (transmit_complete) => {
        $crate::tasks::global_uss_transmit_complete(&USS_DRIVER);
    };
}
