use std::io::Write;

use colored::*;
use log::Level;

/// Install a logger writing `[LEVEL] message` lines to stderr.
///
/// `RUST_LOG` overrides the default level.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format(|buf, record| {
            let tag = match record.level() {
                Level::Error => "[ERROR]".red().bold(),
                Level::Warn => "[WARN]".yellow().bold(),
                Level::Info => "[INFO]".green(),
                Level::Debug => "[DEBUG]".blue(),
                Level::Trace => "[TRACE]".dimmed(),
            };
            writeln!(buf, "{tag} {}", record.args())
        })
        .init();
}
