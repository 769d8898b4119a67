use tracing_subscriber::{fmt::time::UtcTime, layer::Identity, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize logging: stdout plus an optional rolling file appender.
///
/// Level precedence is `logging.level` from config, then `RUST_LOG`, then `info`.
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_config(cfg: &LoggingConfig) {
    let env_filter = build_filter(cfg);

    match cfg.format {
        LogFormat::Json => init_json_logging(cfg, env_filter),
        LogFormat::Text => init_text_logging(cfg, env_filter),
    }
}

fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    match cfg.level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

fn init_json_logging(cfg: &LoggingConfig, env_filter: EnvFilter) {
    let stdout = tracing_subscriber::fmt::layer()
        .json()
        .with_ansi(false)
        .with_current_span(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stdout);
    let registry = tracing_subscriber::registry().with(env_filter).with(stdout);

    let file_layer = cfg
        .enable_file_logging
        .then(|| {
            build_file_layer(cfg, |writer| {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(writer)
            })
        })
        .flatten();

    match file_layer {
        Some(layer) => {
            let _ = registry.with(layer).try_init();
        }
        None => {
            let _ = registry.with(Identity::new()).try_init();
        }
    }
}

fn init_text_logging(cfg: &LoggingConfig, env_filter: EnvFilter) {
    let stdout = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stdout);
    let registry = tracing_subscriber::registry().with(env_filter).with(stdout);

    let file_layer = cfg
        .enable_file_logging
        .then(|| {
            build_file_layer(cfg, |writer| {
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(writer)
            })
        })
        .flatten();

    match file_layer {
        Some(layer) => {
            let _ = registry.with(layer).try_init();
        }
        None => {
            let _ = registry.with(Identity::new()).try_init();
        }
    }
}

fn build_file_layer<F, L>(cfg: &LoggingConfig, build_layer: F) -> Option<L>
where
    F: FnOnce(tracing_appender::non_blocking::NonBlocking) -> L,
{
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    let rotation = match cfg.rotation.to_ascii_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    };

    if let Err(err) = std::fs::create_dir_all(&cfg.dir) {
        eprintln!(
            "Failed to create log directory '{}' ({err}), continuing with stdout logs",
            cfg.dir
        );
        return None;
    }

    let appender = RollingFileAppender::new(rotation, &cfg.dir, &cfg.filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    // The guard flushes on drop; it must live as long as the process.
    let _leaked: &'static _ = Box::leak(Box::new(guard));

    Some(build_layer(non_blocking))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn configured_level_takes_precedence() {
        let cfg = LoggingConfig {
            level: Some(LogLevel::Debug),
            ..LoggingConfig::default()
        };
        assert_eq!(build_filter(&cfg).to_string(), "debug");
    }

    #[test]
    fn file_layer_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LoggingConfig {
            dir: dir.path().join("nested").display().to_string(),
            enable_file_logging: true,
            ..LoggingConfig::default()
        };

        let layer = build_file_layer(&cfg, |_writer| ());
        assert!(layer.is_some());
        assert!(dir.path().join("nested").is_dir());
    }
}
