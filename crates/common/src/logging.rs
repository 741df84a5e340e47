//! Tracing setup for the converter.
//!
//! `RUST_LOG` wins when set. Otherwise the configured level applies to the
//! converter's own crates while dependencies stay at `warn`, so `debug`
//! shows lane and splice decisions without XML or CSV parser noise.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Targets that a bare configured level is applied to.
const CONVERTER_TARGETS: [&str; 5] = [
    "csvtoxml",
    "csvtoxml_common",
    "csvtoxml_timeline_model",
    "csvtoxml_assembly",
    "csvtoxml_xml_export",
];

/// Filter directives for a configured level.
///
/// A bare level such as `debug` is scoped to the converter's crates.
/// Anything that already holds directives (`target=level` pairs or a
/// comma-separated list) is used as written.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        return filter_directives(&LoggingConfig::default().level);
    }
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let mut directives = vec!["warn".to_string()];
    directives.extend(CONVERTER_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.join(",")
}

/// Install the global subscriber. Logs go to stderr so converted output
/// and `--json` plans on stdout stay clean.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.with_target(false).finish())
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
