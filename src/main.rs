//! # guest-tasks
//!
//! A terminal task manager for anonymous guests. Tasks are stored on a
//! hosted Supabase-compatible backend (anonymous sign-in + row-level
//! security), or in local storage when running as an offline demo.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! guest-tasks
//! # or explicitly
//! guest-tasks ui
//! ```
//!
//! #### TUI Key Bindings
//!
//! **List**
//! *   `q`: Quit
//! *   `a`: Focus the create form
//! *   `Space`/`Enter`: Toggle completion of the selected task
//! *   `r`: Refresh
//! *   `g`: New guest (drops the current identity)
//!
//! **Form**
//! *   `Tab`/`Shift-Tab`: Next/previous field
//! *   `Left`/`Right`: Change priority
//! *   `Enter`: Add task
//! *   `Esc`: Back to the list
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! guest-tasks add "Write report" --priority high --due 2025-12-01
//! guest-tasks list
//! guest-tasks toggle <ID>
//! guest-tasks new-guest
//! ```
//!
//! ## Configuration
//!
//! Read from the environment (a `.env` file is honoured):
//! *   `SUPABASE_URL`, `SUPABASE_ANON_KEY`: the hosted backend.
//! *   `GUEST_TASKS_DEMO=1`: fall back to local mode when those are missing
//!     instead of refusing to start. Same as `--demo`.
//! *   `GUEST_TASKS_MODE=local|remote`: force a mode. `--local` forces local.
//! *   `GUEST_TASKS_DIR`: data directory override.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process::ExitCode;

use guest_tasks::backend::Backend;
use guest_tasks::commands::*;
use guest_tasks::config::{Config, MissingConfigPolicy, Mode};
use guest_tasks::controller::{parse_priority, Controller, TaskForm};
use guest_tasks::error::AppError;
use guest_tasks::logging::{self, LogTarget};
use guest_tasks::tui::run_tui;

#[derive(Parser)]
#[command(name = "guest-tasks")]
#[command(about = "Task manager for anonymous guests", long_about = None)]
struct Cli {
    /// Use local storage even if a remote backend is configured
    #[arg(long, global = true)]
    local: bool,
    /// Fall back to local storage when remote configuration is missing
    #[arg(long, global = true)]
    demo: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
        /// low, normal or high
        #[arg(short, long, default_value = "normal")]
        priority: String,
        /// Due date in YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },
    /// List tasks, newest first
    List {
        /// Hide completed tasks
        #[arg(long)]
        pending: bool,
    },
    /// Toggle completion of a task
    Toggle {
        id: String,
    },
    /// Drop the current guest and start a new one
    NewGuest,
    /// Show the current guest
    Whoami,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

fn load_controller(cli: &Cli) -> Result<Controller, AppError> {
    let mut config = Config::from_env()?;
    if cli.local {
        config.forced_mode = Some(Mode::Local);
    }
    if cli.demo {
        config.policy = MissingConfigPolicy::FallbackToLocal;
    }
    Ok(Controller::new(Backend::from_config(&config)?))
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                return ExitCode::FAILURE;
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "guest-tasks", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let interactive = matches!(cli.command, None | Some(Commands::Ui));
    match Config::from_env() {
        Ok(config) if interactive => logging::init(LogTarget::File(&config.data_dir)),
        _ => logging::init(LogTarget::Stderr),
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let controller = match load_controller(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Some(Commands::Add { title, description, priority, due }) => {
            match parse_priority(&priority) {
                Ok(priority) => {
                    let form = TaskForm {
                        title,
                        description: description.unwrap_or_default(),
                        priority,
                        due_date: due.unwrap_or_default(),
                    };
                    runtime.block_on(cmd_add(&controller, form))
                }
                Err(e) => Err(e.into()),
            }
        }
        Some(Commands::List { pending }) => runtime.block_on(cmd_list(&controller, pending)),
        Some(Commands::Toggle { id }) => runtime.block_on(cmd_toggle(&controller, id)),
        Some(Commands::NewGuest) => runtime.block_on(cmd_new_guest(&controller)),
        Some(Commands::Whoami) => runtime.block_on(cmd_whoami(&controller)),
        Some(Commands::Completions { .. }) => Ok(()),
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui(controller, runtime.handle().clone()) {
                eprintln!("Error running TUI: {}", e);
                return ExitCode::FAILURE;
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
