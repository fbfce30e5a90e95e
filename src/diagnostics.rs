use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Environment variable controlling console output for CLI commands.
pub const LOG_ENV: &str = "TIMELINE_IQ_LOG";

/// Where diagnostics should be shown besides the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    /// Nothing on the terminal; the dashboard owns the screen.
    Silent,
    /// Human-readable events on stderr, filtered by `TIMELINE_IQ_LOG`.
    Stderr,
}

/// Installs the global subscriber.
///
/// The file layer is best-effort: if the log file cannot be opened the
/// application runs without it, and write failures are dropped by the
/// formatter.
pub fn init(log_path: &Path, console: Console) {
    let console_layer = (console == Console::Stderr).then(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter)
    });

    // A subscriber may already be installed (tests); keep the first one.
    let _ = tracing_subscriber::registry()
        .with(file_layer(log_path))
        .with(console_layer)
        .try_init();
}

/// Plain-text WARN and above, appended to `log_path`; `None` when the file
/// cannot be opened.
fn file_layer<S>(log_path: &Path) -> Option<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file = OpenOptions::new().create(true).append(true).open(log_path).ok()?;

    Some(
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_filter(LevelFilter::WARN),
    )
}

/// Writes a failure with its context label and full cause chain.
pub fn record_failure(context: &str, err: &(dyn std::error::Error + 'static)) {
    tracing::error!(context, error = %err, causes = %cause_chain(err), "operation failed");
}

/// Flattens `err.source()` links into `outer: inner: root`.
pub fn cause_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut chain = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    if chain.is_empty() {
        "none".to_string()
    } else {
        chain.join(": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn cause_chain_lists_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file system");
        let err = Error::storage_write("deleted", io);

        assert_eq!(cause_chain(&err), "read-only file system");
    }

    #[test]
    fn cause_chain_without_source() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "plain");

        assert_eq!(cause_chain(&err), "none");
    }

    #[test]
    fn failures_reach_the_log_file_with_their_causes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("log.txt");
        let subscriber = tracing_subscriber::registry().with(file_layer(&path));

        tracing::subscriber::with_default(subscriber, || {
            let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file system");
            record_failure("Load configuration", &Error::storage_write("saved", io));
            tracing::info!("below the file threshold");
        });

        let log = std::fs::read_to_string(&path).expect("log written");
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("ERROR"));
        assert!(log.contains("Load configuration"));
        assert!(log.contains("read-only file system"));
    }

    #[test]
    fn init_tolerates_an_unopenable_log_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("no-such-dir").join("log.txt");

        init(&missing, Console::Silent);
        record_failure("test", &std::io::Error::new(std::io::ErrorKind::Other, "ignored"));
    }
}
