use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::{Config, Handle};

// Timestamp, level, module path, then the message.
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S)} {h({l})} {t} - {m}{n}";

fn config(level: LevelFilter) -> Option<Config> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    match Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
    {
        Ok(config) => Some(config),
        Err(errors) => {
            eprintln!("invalid logger configuration: {errors}");
            None
        }
    }
}

/// Installs the stderr logger on first use and reconfigures it afterwards.
pub(super) fn apply(handle: &mut Option<Handle>, level: LevelFilter) {
    let Some(config) = config(level) else {
        return;
    };
    match handle {
        Some(handle) => handle.set_config(config),
        None => match log4rs::init_config(config) {
            Ok(installed) => *handle = Some(installed),
            // Another logger already owns the `log` facade.
            Err(error) => eprintln!("failed to install logger: {error}"),
        },
    }
}
