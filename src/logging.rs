use std::fs::{self, OpenOptions};
use std::path::Path;

use env_logger::{Builder, Env, Target};

const LOG_FILE: &str = "guest-tasks.log";

/// Where log records go.
pub enum LogTarget<'a> {
    /// Standard error, for one-shot commands.
    Stderr,
    /// A file in the data directory, so the terminal UI is not overdrawn.
    File(&'a Path),
}

/// Installs the global logger. `RUST_LOG` overrides the default filter.
pub fn init(target: LogTarget<'_>) {
    let (default_filter, target) = match target {
        LogTarget::Stderr => ("warn", Target::Stderr),
        LogTarget::File(dir) => {
            let file = fs::create_dir_all(dir).and_then(|_| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(dir.join(LOG_FILE))
            });
            match file {
                Ok(f) => ("info", Target::Pipe(Box::new(f))),
                // Nowhere safe to write while the screen is taken over.
                Err(_) => ("off", Target::Stderr),
            }
        }
    };
    let _ = Builder::from_env(Env::default().default_filter_or(default_filter))
        .target(target)
        .format_timestamp_secs()
        .try_init();
}
