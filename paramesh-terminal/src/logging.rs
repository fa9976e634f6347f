/// Logger setup for the terminal viewer
use std::fs::File;
use std::path::PathBuf;
use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "paramesh_core=debug"). When unset, `RUST_LOG` is consulted.
///
/// While the viewer owns the terminal, records on stderr would tear the
/// frame, so without a `log_file` only errors are shown by default.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            log_file: None,
        }
    }
}

impl LoggingConfig {
    fn default_level(&self) -> log::LevelFilter {
        if self.log_file.is_some() {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Error
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored and leave any log file untouched. Fails only
/// if the first call cannot create its log file.
pub fn init_logging(config: LoggingConfig) -> std::io::Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = &config.env_filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(config.default_level());
        }

        match &config.log_file {
            Some(path) => match File::create(path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                    builder.write_style(env_logger::WriteStyle::Never);
                }
                Err(err) => {
                    result = Err(err);
                    return;
                }
            },
            None => {
                builder.write_style(config.write_style);
            }
        }

        // A test harness may already have installed a logger
        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_depends_on_target() {
        let config = LoggingConfig::default();
        assert_eq!(config.default_level(), log::LevelFilter::Error);

        let config = LoggingConfig {
            log_file: Some(PathBuf::from("paramesh.log")),
            ..LoggingConfig::default()
        };
        assert_eq!(config.default_level(), log::LevelFilter::Info);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_logging(LoggingConfig::default()).unwrap();
        init_logging(LoggingConfig::default()).unwrap();
    }

    #[test]
    fn test_later_calls_leave_log_file_untouched() {
        init_logging(LoggingConfig::default()).unwrap();

        let path = std::env::temp_dir().join(format!("paramesh-log-{}.log", std::process::id()));
        std::fs::write(&path, "earlier run\n").unwrap();
        let config = LoggingConfig {
            log_file: Some(path.clone()),
            ..LoggingConfig::default()
        };
        init_logging(config).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier run\n");

        // Already initialized, so an unwritable path is never opened either
        let config = LoggingConfig {
            log_file: Some(PathBuf::from("/nonexistent-dir/paramesh.log")),
            ..LoggingConfig::default()
        };
        assert!(init_logging(config).is_ok());
        std::fs::remove_file(&path).unwrap();
    }
}
