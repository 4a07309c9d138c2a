mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mindgate")]
#[command(about = "AI operation orchestration for the knowledge portal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize mindgate settings and directories
    Onboard {
        /// Force overwrite existing settings
        #[arg(long)]
        force: bool,
    },

    /// Show current settings and capability gates
    Status,

    /// Manage capability settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Invoke a capability against the configured backend
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the current settings as pretty-printed JSON
    Show,
    /// Enable a capability
    Enable {
        /// Capability name (e.g. summarize, translate, smart_search)
        capability: String,
    },
    /// Disable a capability
    Disable {
        /// Capability name
        capability: String,
    },
    /// Merge a JSON patch into a capability's settings
    Set {
        /// Capability name
        capability: String,
        /// JSON patch (e.g. '{"default_style":"detailed"}')
        patch: String,
    },
}

#[derive(Subcommand)]
enum RunCommands {
    /// Summarize text
    Summarize {
        text: String,
        /// Summary style (defaults to the configured style)
        #[arg(short, long)]
        style: Option<String>,
        /// Skip the cache read (the result is still written back)
        #[arg(long)]
        no_cache: bool,
    },
    /// Translate text
    Translate {
        text: String,
        /// Target language code (defaults to the configured language)
        #[arg(short, long)]
        to: Option<String>,
        #[arg(long)]
        no_cache: bool,
    },
    /// Extract named entities from text
    Entities {
        text: String,
        #[arg(long)]
        no_cache: bool,
    },
    /// Analyze sentiment of text
    Sentiment {
        text: String,
        #[arg(long)]
        no_cache: bool,
    },
    /// Classify text against the configured taxonomy
    Classify {
        text: String,
        #[arg(long)]
        no_cache: bool,
    },
    /// Run OCR on an image file
    Ocr {
        /// Path to the image file
        image: String,
        #[arg(long)]
        no_cache: bool,
    },
    /// Generate a title for text
    Title {
        text: String,
        #[arg(long)]
        no_cache: bool,
    },
    /// Suggest tags for text
    Tags {
        text: String,
        #[arg(long)]
        no_cache: bool,
    },
    /// Smart search across portal content
    Search {
        query: String,
        #[arg(long)]
        no_cache: bool,
    },
    /// Single-turn assistant chat
    Chat { message: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    match cli.command {
        Commands::Onboard { force } => {
            commands::onboard::run(force).await?;
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                commands::config_cmd::show().await?;
            }
            ConfigCommands::Enable { capability } => {
                commands::config_cmd::set_enabled(&capability, true).await?;
            }
            ConfigCommands::Disable { capability } => {
                commands::config_cmd::set_enabled(&capability, false).await?;
            }
            ConfigCommands::Set { capability, patch } => {
                commands::config_cmd::set(&capability, &patch).await?;
            }
        },
        Commands::Run { command } => match command {
            RunCommands::Summarize { text, style, no_cache } => {
                commands::run_cmd::summarize(&text, style.as_deref(), !no_cache).await?;
            }
            RunCommands::Translate { text, to, no_cache } => {
                commands::run_cmd::translate(&text, to.as_deref(), !no_cache).await?;
            }
            RunCommands::Entities { text, no_cache } => {
                commands::run_cmd::entities(&text, !no_cache).await?;
            }
            RunCommands::Sentiment { text, no_cache } => {
                commands::run_cmd::sentiment(&text, !no_cache).await?;
            }
            RunCommands::Classify { text, no_cache } => {
                commands::run_cmd::classify(&text, !no_cache).await?;
            }
            RunCommands::Ocr { image, no_cache } => {
                commands::run_cmd::ocr(&image, !no_cache).await?;
            }
            RunCommands::Title { text, no_cache } => {
                commands::run_cmd::title(&text, !no_cache).await?;
            }
            RunCommands::Tags { text, no_cache } => {
                commands::run_cmd::tags(&text, !no_cache).await?;
            }
            RunCommands::Search { query, no_cache } => {
                commands::run_cmd::search(&query, !no_cache).await?;
            }
            RunCommands::Chat { message } => {
                commands::run_cmd::chat(&message).await?;
            }
        },
    }

    Ok(())
}
