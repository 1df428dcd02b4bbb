use std::{collections::HashMap, fmt, str::FromStr, sync::RwLock};

use chrono::{SecondsFormat, Utc};

pub(crate) static LOGGER_CONFIG: once_cell::sync::Lazy<RwLock<LoggingConfig>> =
    once_cell::sync::Lazy::new(|| RwLock::new(LoggingConfig::default()));

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub enum LogLevel {
    ERROR,
    WARN,
    INFO,
    VERBOSE,
}

impl LogLevel {
    fn label(&self) -> &'static str {
        match self {
            LogLevel::ERROR => "ERROR",
            LogLevel::WARN => "WARN",
            LogLevel::INFO => "INFO",
            LogLevel::VERBOSE => "VERBOSE",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::ERROR),
            "warn" | "warning" => Ok(LogLevel::WARN),
            "info" => Ok(LogLevel::INFO),
            "debug" | "verbose" | "trace" => Ok(LogLevel::VERBOSE),
            other => Err(format!("unknown log level {:?}", other)),
        }
    }
}

// Component-scoped logging. The calling impl must declare `const CC: &str`,
// or the component can be passed explicitly as `logln!(@"Server", ...)`.

#[macro_export]
macro_rules! logln {
    (@$cc:expr, $($arg:tt)+) => {
        $crate::util::logging::emit(
            $crate::util::logging::LogLevel::INFO, $cc, file!(), line!(), format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        $crate::logln!(@Self::CC, $($arg)+)
    };
}

#[macro_export]
macro_rules! logvbln {
    (@$cc:expr, $($arg:tt)+) => {
        $crate::util::logging::emit(
            $crate::util::logging::LogLevel::VERBOSE, $cc, file!(), line!(), format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        $crate::logvbln!(@Self::CC, $($arg)+)
    };
}

#[macro_export]
macro_rules! logwarn {
    (@$cc:expr, $($arg:tt)+) => {
        $crate::util::logging::emit(
            $crate::util::logging::LogLevel::WARN, $cc, file!(), line!(), format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        $crate::logwarn!(@Self::CC, $($arg)+)
    };
}

#[macro_export]
macro_rules! logerr {
    (@$cc:expr, $($arg:tt)+) => {
        $crate::util::logging::emit(
            $crate::util::logging::LogLevel::ERROR, $cc, file!(), line!(), format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        $crate::logerr!(@Self::CC, $($arg)+)
    };
}

pub fn emit(level: LogLevel, cc: &'static str, file: &str, line: u32, args: fmt::Arguments) {
    if !is_enabled(cc) || !is_at_level(cc, level) {
        return;
    }

    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    if level <= LogLevel::WARN {
        eprintln!("{} {:<7} [{}] {}:{} {}", timestamp, level.label(), cc, file, line, args);
    } else {
        println!("{} {:<7} [{}] {}:{} {}", timestamp, level.label(), cc, file, line, args);
    }
}

fn read_config<R>(f: impl FnOnce(&LoggingConfig) -> R) -> R {
    let config = LOGGER_CONFIG.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&config)
}

fn write_config(f: impl FnOnce(&mut LoggingConfig)) {
    let mut config = LOGGER_CONFIG.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut config)
}

pub fn is_enabled(cc: &'static str) -> bool {
    read_config(|config| config.cc_enabled(cc))
}

pub fn is_at_level(cc: &'static str, level: LogLevel) -> bool {
    read_config(|config| config.cc_at_level(cc, level))
}

pub fn disable_cc(cc: &str) {
    write_config(|config| config.disable_cc(cc));
}

pub fn enable_cc(cc: &str, level: LogLevel) {
    write_config(|config| config.enable_cc(cc, level));
}

pub fn set_global_logging(enabled: bool) {
    write_config(|config| {
        if enabled {
            config.enable_global_tracing()
        } else {
            config.disable_global_tracing()
        }
    });
}

pub fn set_global_level(level: LogLevel) {
    write_config(|config| config.set_global_level(level));
}

pub struct LoggingConfig {
    global_tracing_enabled: bool,
    global_level: LogLevel,
    flags: HashMap<String, (bool, LogLevel)>, // <component, (tracing enabled, trace level)>
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_tracing_enabled: true,
            global_level: LogLevel::INFO,
            flags: Default::default(),
        }
    }
}

impl LoggingConfig {
    pub fn cc_enabled(&self, cc: &str) -> bool {
        if !self.global_tracing_enabled {
            return false;
        }

        self.flags.get(cc).map(|flag| flag.0).unwrap_or(true)
    }

    pub fn cc_at_level(&self, cc: &str, level: LogLevel) -> bool {
        if level <= self.global_level {
            return true;
        }

        self.flags.get(cc).map(|flag| level <= flag.1).unwrap_or(false)
    }

    pub fn enable_cc(&mut self, cc: &str, level: LogLevel) {
        self.flags.insert(cc.to_string(), (true, level));
    }

    pub fn disable_cc(&mut self, cc: &str) {
        self.flags.insert(cc.to_string(), (false, self.global_level));
    }

    pub fn enable_global_tracing(&mut self) {
        self.global_tracing_enabled = true;
    }

    pub fn disable_global_tracing(&mut self) {
        self.global_tracing_enabled = false;
    }

    pub fn set_global_level(&mut self, level: LogLevel) {
        self.global_level = level;
    }
}
