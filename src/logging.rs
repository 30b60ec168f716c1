//! Tagged logger handles.
//!
//! Every reader component owns a [`Logger`] built with its own tag, which is
//! forwarded to the [`log`] facade as the record target. Installing a logging
//! backend is left to the application.
//!
//! [`Logger`]: ./struct.Logger.html
//! [`log`]: https://docs.rs/log
use log::Level;
use std::borrow::Cow;
use std::fmt;

/// A logger handle which emits records under a fixed target tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    target: Cow<'static, str>,
}

impl Logger {
    /// Create a logger handle with the given tag.
    pub fn new<T>(target: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        Logger {
            target: target.into(),
        }
    }

    /// The tag used as the target of all records.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether records of the given level would be emitted.
    pub fn enabled(&self, level: Level) -> bool {
        log::log_enabled!(target: self.target(), level)
    }

    /// Emit a record at the given level.
    pub fn log(&self, level: Level, args: fmt::Arguments) {
        log::log!(target: self.target(), level, "{}", args);
    }
}

macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Debug, format_args!($($arg)+))
    };
}

macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Info, format_args!($($arg)+))
    };
}

macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Warn, format_args!($($arg)+))
    };
}

macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Error, format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::Logger;

    #[test]
    fn target_is_kept() {
        let logger = Logger::new("volread.Test");
        assert_eq!(logger.target(), "volread.Test");
        let owned = Logger::new(String::from("volread.Owned"));
        assert_eq!(owned.target(), "volread.Owned");
        // no backend installed, must not panic
        log_warn!(owned, "value {}", 3);
    }
}
