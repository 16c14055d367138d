use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Log to the terminal at `level`, or at `CUDY_LOG_LEVEL` when that is set.
///
/// Everything goes to stderr, stdout is left for the binaries' JSON.
/// html5ever is chatty about the router's malformed markup, so it is muted.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    let level = dotenv::var("CUDY_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(level);

    TermLogger::init(
        level,
        ConfigBuilder::default()
            .add_filter_ignore_str("html5ever")
            .add_filter_ignore_str("selectors")
            .build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
}
