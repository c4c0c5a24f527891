// In: src/observability.rs

//! Structured diagnostics for the decoder.
//!
//! The `log_metric!` macro emits one JSON-shaped line of key/value pairs at
//! `debug` level through the `log` facade. Calls are compiled out of release
//! builds by `#[cfg(debug_assertions)]`.

/// Logs a structured key-value metric line, only in debug builds.
///
/// # Example
/// ```
/// use sstable_arrow::log_metric;
/// let rows = 4;
/// log_metric!("event"="projection_finished", "rows"=&rows);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            log::debug!("SSTABLE_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}
