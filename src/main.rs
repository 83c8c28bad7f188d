mod cli;
mod engine;
mod error;
mod form;
mod logging;
mod model;
mod orchestrator;
mod storage;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;
use cli::RunStatus;
use logging::LogTarget;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = !args.is_interactive();

    let target = if is_non_tui {
        LogTarget::Stderr
    } else {
        LogTarget::File(args.log_file.as_deref())
    };
    logging::init(target)?;

    match cli::run(args).await {
        Ok(RunStatus::Settled) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        // The output element already carries the error text.
        Ok(RunStatus::Failed) => std::process::exit(1),
        Err(e) => Err(e),
    }
}
