//! Diagnostic logging for the stream core.
//!
//! The crate has no console of its own; the embedding kernel or test harness
//! installs a sink with [`set_logger`] and the core reports lane and stream
//! lifecycle transitions through the [`stream_log!`](crate::stream_log)
//! macro. Without a sink, logging is a no-op.

use core::fmt;

use spin::Mutex;

/// Signature of an installed log sink.
pub type LogFn = fn(args: fmt::Arguments);

/// Global log sink.
static LOGGER: Mutex<Option<LogFn>> = Mutex::new(None);

/// Install a log sink.
pub fn set_logger(sink: LogFn) {
    *LOGGER.lock() = Some(sink);
}

/// Remove the installed log sink.
pub fn clear_logger() {
    *LOGGER.lock() = None;
}

/// Forward a formatted message to the installed sink, if any.
#[doc(hidden)]
pub fn dispatch(args: fmt::Arguments) {
    let sink = *LOGGER.lock();
    if let Some(sink) = sink {
        sink(args);
    }
}

/// Log a diagnostic message through the installed sink.
///
/// Messages follow the `[STREAM] ...` convention used across the kernel.
#[macro_export]
macro_rules! stream_log {
    ($($arg:tt)*) => {
        $crate::log::dispatch(core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_without_sink() {
        clear_logger();
        // Must not panic when no sink is installed.
        dispatch(format_args!("[STREAM] no sink"));
    }

    #[test]
    fn test_set_and_clear_logger() {
        fn sink(_args: fmt::Arguments) {}

        set_logger(sink);
        dispatch(format_args!("[STREAM] sink installed"));
        clear_logger();
    }
}
