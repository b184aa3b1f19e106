//! Logging integration.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating spans around
//! persistence operations.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "debug", "info",
/// "`fields_of_gold_db=trace`"). In debug mode a pretty, human-readable format is
/// used; otherwise a structured JSON format is used. Installing a second
/// subscriber is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Returns `true` if `directive` parses as a tracing filter.
pub fn is_valid_filter(directive: &str) -> bool {
    tracing_subscriber::EnvFilter::try_new(directive).is_ok()
}

/// Creates a span for a single persistence operation on `table`.
///
/// # Examples
///
/// ```
/// use fields_of_gold_core::logging::persist_span;
///
/// let span = persist_span("blog_post", "insert");
/// let _guard = span.enter();
/// tracing::debug!("writing row");
/// ```
pub fn persist_span(table: &str, op: &'static str) -> tracing::Span {
    tracing::debug_span!("persist", table = table, op = op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_filter() {
        assert!(is_valid_filter("info"));
        assert!(is_valid_filter("fields_of_gold_db=debug,warn"));
        assert!(!is_valid_filter("fields_of_gold_db=debug=trace"));
    }

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = Settings::default();
        setup_logging(&settings);
        setup_logging(&settings);
    }
}
