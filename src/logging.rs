use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::OnceLock;

/// Debug topics understood by `--debug-filter`
pub const DEBUG_TOPICS: [&str; 4] = ["anomaly", "collision", "grid", "entity"];

// Custom logger structure
#[derive(Debug)]
struct AnomalyLogger {
    level: LevelFilter,
    debug_filters: Option<HashSet<String>>,
}

// Pulls the number following `label` out of a message, e.g. "Anomaly 12"
fn extract_number(message: &str, label: &str) -> Option<u32> {
    let start = message.find(label)? + label.len();
    let rest = &message[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse::<u32>().ok()
}

impl log::Log for AnomalyLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() > self.level {
            return false;
        }
        // Topic filters only narrow debug and trace output
        if let Some(filters) = &self.debug_filters {
            if metadata.level() >= log::Level::Debug {
                return filters.iter().any(|f| metadata.target().starts_with(f.as_str()));
            }
        }
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_color = match record.level() {
            log::Level::Error => "\x1B[31m", // Red
            log::Level::Warn => "\x1B[33m",  // Yellow
            log::Level::Info => "\x1B[32m",  // Green
            log::Level::Debug => "\x1B[36m", // Cyan
            log::Level::Trace => "\x1B[35m", // Magenta
        };
        let reset = "\x1B[0m";
        let timestamp = Local::now().format("%H:%M:%S%.3f");

        let message = record.args().to_string();

        // Context prefix from well-known message patterns
        let mut context = String::new();
        if let Some(tick) = extract_number(&message, "Tick ") {
            context.push_str(&format!("[T{:04}]", tick));
        }
        if let Some(id) = extract_number(&message, "Anomaly ") {
            context.push_str(&format!("[A{:02}]", id));
        }
        if let Some(id) = extract_number(&message, "Entity ") {
            context.push_str(&format!("[E{:02}]", id));
        }
        if !context.is_empty() {
            context.push(' ');
        }

        let mut output = format!(
            "{timestamp} {level_color}{level:5}{reset} {context}{target}: {message}",
            level = record.level(),
            target = record.target(),
        );

        if let Some(module_path) = record.module_path() {
            if module_path != record.target() {
                output.push_str(&format!(" [{}]", module_path));
            }
        }

        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", output);
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

static LOGGER: OnceLock<AnomalyLogger> = OnceLock::new();

fn parse_topics(filter: &str) -> HashSet<String> {
    filter
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Topics in a comma-separated filter that no debug macro logs under, sorted
pub fn unknown_topics(filter: &str) -> Vec<String> {
    let mut unknown: Vec<String> = parse_topics(filter)
        .into_iter()
        .filter(|topic| !DEBUG_TOPICS.contains(&topic.as_str()))
        .collect();
    unknown.sort();
    unknown
}

/// Installs the logger with optional comma-separated debug topic filters
pub fn init_logger(
    level: LevelFilter,
    debug_filter: Option<String>,
) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| {
        let debug_filters = debug_filter.as_deref().map(parse_topics);
        AnomalyLogger {
            level,
            debug_filters,
        }
    });

    log::set_logger(logger).map(|()| log::set_max_level(level))
}

/// Parses a log level name, falling back to `Info`
pub fn parse_level(name: &str) -> LevelFilter {
    match name.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

// Helper macros for specific debug topics
#[macro_export]
macro_rules! debug_anomaly {
    ($($arg:tt)*) => {
        log::debug!(target: "anomaly", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_collision {
    ($($arg:tt)*) => {
        log::debug!(target: "collision", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! trace_grid {
    ($($arg:tt)*) => {
        log::trace!(target: "grid", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_entity {
    ($($arg:tt)*) => {
        log::debug!(target: "entity", "{}", format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_extract_number() {
        assert_eq!(extract_number("Anomaly 12 expired", "Anomaly "), Some(12));
        assert_eq!(extract_number("Entity 3", "Entity "), Some(3));
        assert_eq!(extract_number("Entity x", "Entity "), None);
        assert_eq!(extract_number("nothing here", "Tick "), None);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("bogus"), LevelFilter::Info);
    }

    #[test]
    fn test_topic_filters_only_narrow_debug() {
        let logger = AnomalyLogger {
            level: LevelFilter::Trace,
            debug_filters: Some(["collision".to_string()].into_iter().collect()),
        };
        fn metadata(level: log::Level, target: &str) -> Metadata<'_> {
            Metadata::builder().level(level).target(target).build()
        }
        assert!(logger.enabled(&metadata(log::Level::Debug, "collision")));
        assert!(!logger.enabled(&metadata(log::Level::Trace, "grid")));
        assert!(logger.enabled(&metadata(log::Level::Info, "grid")));
    }

    #[test]
    fn test_unknown_topics() {
        assert!(unknown_topics("anomaly, collision,grid,entity").is_empty());
        assert!(unknown_topics("").is_empty());
        assert_eq!(unknown_topics("grid,robots,anomly"), vec!["anomly", "robots"]);
    }
}
