//! Bridge from the `log` facade to a logger implemented by the host application.
use std::sync::{Arc, OnceLock};

/// Logger implemented by the host application.
///
/// Every record produced by this crate (and warnings/errors from its dependencies)
/// is forwarded here once [`set_logger`] has been called.
///
/// # Examples
///
/// ```rust
/// use checkout_3ds2_core::logger::{LogLevel, Logger};
///
/// struct StdoutLogger;
///
/// impl Logger for StdoutLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// object CheckoutLogBridge : Logger {
///     override fun log(level: LogLevel, message: String) {
///         Log.println(level.toAndroidPriority(), "Checkout3DS2", message)
///     }
/// }
///
/// // Once, from Application.onCreate
/// setLogger(CheckoutLogBridge, LogLevel.DEBUG)
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Receives one formatted log record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing of the flow.
    Trace,
    /// Debugging information, e.g. each step of the fingerprint flow.
    Debug,
    /// Progress of the authentication.
    Info,
    /// Recoverable anomalies, e.g. a failing vendor SDK cleanup.
    Warn,
    /// Failures that are also emitted to the host as error events.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), format!("{}", record.args()));
        } else {
            eprintln!("checkout-3ds2 logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records are only forwarded when they come from this crate;
/// dependencies such as `reqwest` are too chatty at those levels.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let from_this_crate =
        module_path.is_some_and(|path| path.starts_with("checkout_3ds2"));
    from_this_crate || level <= log::Level::Info
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs the host logger and sets the maximum forwarded level.
///
/// Only the first logger is kept; later calls just adjust the level.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>, max_level: LogLevel) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("checkout-3ds2 logger already set");
    }

    static LOGGER: ForeignLogger = ForeignLogger;
    if let Err(e) = log::set_logger(&LOGGER) {
        // Another `log` implementation was installed by the host; keep it.
        eprintln!("failed to set checkout-3ds2 logger: {e}");
    }
    log::set_max_level(max_level.into());
}
