//! Early-console logging
//!
//! Minimal [`log::Log`] implementation for the boot path. Output goes
//! to whatever sink the board code registers (an early UART, a
//! semihosting channel); until one is registered everything is dropped.
//!
//! The sink is the only process-wide global in this crate; MMU state
//! itself lives in explicit structs.

use core::fmt::Write;
use log::{LevelFilter, Metadata, Record};
use spin::Once;

/// A line-oriented early console sink.
type Sink = fn(&str);

static SINK: Once<Sink> = Once::new();
static LOGGER: EarlyLogger = EarlyLogger;

struct EarlyLogger;

impl log::Log for EarlyLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= max_level().to_level().unwrap_or(log::Level::Error)
    }

    fn log(&self, record: &Record<'_>) {
        if let Some(sink) = SINK.get() {
            let mut buf = LineBuf::new();
            let _ = write!(buf, "[{:5}] {}: {}", record.level(), record.target(), record.args());
            sink(buf.as_str());
        }
    }

    fn flush(&self) {}
}

/// Compile-time log verbosity, following the crate features.
fn max_level() -> LevelFilter {
    #[cfg(feature = "verbose")]
    return LevelFilter::Trace;

    #[cfg(all(feature = "debug", not(feature = "verbose")))]
    return LevelFilter::Debug;

    #[cfg(not(any(feature = "debug", feature = "verbose")))]
    LevelFilter::Info
}

/// Register the early console sink and install the logger.
///
/// Safe to call more than once; only the first sink wins. Called by
/// board code before Phase A so boot diagnostics are visible.
pub fn init(sink: Sink) {
    SINK.call_once(|| sink);

    // set_logger fails if someone else installed one; boot diagnostics
    // then flow through that logger instead, which is fine
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(max_level());
}

/// Fixed-size line assembly buffer; boot logs have no allocator.
struct LineBuf {
    buf: [u8; 256],
    len: usize,
}

impl LineBuf {
    const fn new() -> Self {
        Self { buf: [0; 256], len: 0 }
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("<bad utf8>")
    }
}

impl Write for LineBuf {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let avail = self.buf.len() - self.len;
        let mut take = s.len().min(avail);
        // truncate on a character boundary so the buffer stays valid
        // UTF-8 end to end
        while take > 0 && !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}
