//! Minimal in-kernel logging.
//!
//! This crate never pulls in the `log` facade — there is no allocator and
//! no registry to back it, and a no_std kernel this small gets more out of
//! a hand-rolled level filter than an ecosystem crate built for hosted
//! backends. Output is routed through a installable sink function rather
//! than a hardcoded UART address, since the only "terminal" this kernel
//! knows about is a `Hal`-owned device register, not a serial port.

use core::sync::atomic::{AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Error => "[ERROR]",
            Self::Warn => "[WARN] ",
            Self::Info => "[INFO] ",
            Self::Debug => "[DEBUG]",
            Self::Trace => "[TRACE]",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Sink signature: module name, formatted message. Installed once at
/// boot by whatever embeds this kernel (the MMIO HAL writes to the
/// terminal device reserved for kernel diagnostics; the test harness
/// writes to a `Vec<String>` it can assert against).
pub type Sink = fn(&str, &str);

static SINK: spin::Once<Sink> = spin::Once::new();

/// Install the log sink. Call once, before interrupts are enabled, the
/// same way `initASL`/`initPcbs` run once during boot before concurrency
/// is possible.
pub fn set_sink(sink: Sink) {
    SINK.call_once(|| sink);
}

pub fn set_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn get_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Error,
        1 => LogLevel::Warn,
        2 => LogLevel::Info,
        3 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

#[inline]
pub fn is_enabled(level: LogLevel) -> bool {
    level <= get_level()
}

pub fn log(level: LogLevel, module: &str, message: &str) {
    if !is_enabled(level) {
        return;
    }
    if let Some(sink) = SINK.get() {
        sink(module, message);
    }
}

/// Logging at `no_std` scope has no `alloc`, so the macros below format
/// into a small fixed-size stack buffer rather than building a `String`.
#[macro_export]
macro_rules! klog {
    ($level:expr, $module:expr, $($arg:tt)*) => {{
        if $crate::log::is_enabled($level) {
            let mut buf = $crate::log::FixedBuf::new();
            let _ = ::core::fmt::write(&mut buf, ::core::format_args!($($arg)*));
            $crate::log::log($level, $module, buf.as_str());
        }
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($module:expr, $($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Info, $module, $($arg)*) };
}

#[macro_export]
macro_rules! kerror {
    ($module:expr, $($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Error, $module, $($arg)*) };
}

#[macro_export]
macro_rules! kwarn {
    ($module:expr, $($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Warn, $module, $($arg)*) };
}

#[macro_export]
macro_rules! kdebug {
    ($module:expr, $($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Debug, $module, $($arg)*) };
}

/// Small stack buffer implementing `core::fmt::Write`, used by `klog!` so
/// logging never needs an allocator.
pub struct FixedBuf {
    buf: [u8; 192],
    len: usize,
}

impl FixedBuf {
    pub fn new() -> Self {
        Self { buf: [0; 192], len: 0 }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("<non-utf8 log message>")
    }
}

impl Default for FixedBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Write for FixedBuf {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let space = self.buf.len() - self.len;
        let n = bytes.len().min(space);
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        Ok(())
    }
}
