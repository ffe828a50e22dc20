use clap::Parser;
use tracing::Level;

use pak_client::{commands, ClientError, Commands, OutputFormat};

#[derive(Parser)]
#[command(
    name = "pak",
    about = "Inspect and extract Unreal Engine PAK archives",
    version
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Output format
    #[arg(short = 'f', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    let (archive, result) = match cli.command {
        Commands::Info { archive } => {
            let result = commands::info::handle(&archive, cli.format);
            (archive, result)
        }
        Commands::List { archive } => {
            let result = commands::list::handle(&archive, cli.format);
            (archive, result)
        }
        Commands::Extract { archive, output } => {
            let result = commands::extract::handle(&archive, &output, cli.format);
            (archive, result)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}: {e}", archive.display());
        std::process::exit(exit_code(e.as_ref()));
    }
}

/// Exit codes: 1 for an invalid archive, 2 for I/O trouble, 3 when some
/// files extracted and some did not.
fn exit_code(error: &(dyn std::error::Error + 'static)) -> i32 {
    if let Some(client) = error.downcast_ref::<ClientError>() {
        return match client {
            ClientError::PartialExtraction { .. } => 3,
        };
    }
    if let Some(parser) = error.downcast_ref::<pak_parser::Error>() {
        return match parser {
            pak_parser::Error::Io(_) => 2,
            _ => 1,
        };
    }
    2
}
