//! sass-rebase - compile SASS with url() values rebased to the entry stylesheet

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::RebaseOptions;

#[derive(Parser)]
#[command(name = "sass-rebase")]
#[command(version)]
#[command(about = "Compile SASS with url() values rebased to the entry stylesheet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an entry stylesheet to CSS
    Compile {
        /// Entry stylesheet
        entry: PathBuf,

        /// Write CSS to FILE instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: RebaseOptions,
    },

    /// Resolve an @use/@import specifier to a canonical URL
    Resolve {
        /// Specifier as written in the stylesheet
        specifier: String,

        /// Stylesheet containing the rule (defaults to the current directory)
        #[arg(long)]
        from: Option<PathBuf>,

        /// Resolve as an @import rule instead of @use/@forward
        #[arg(long)]
        import: bool,

        #[command(flatten)]
        options: RebaseOptions,
    },

    /// List the url() values of a stylesheet
    Urls {
        /// Stylesheet to scan
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sass_rebase=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            entry,
            output,
            options,
        } => commands::compile::execute(commands::compile::CompileArgs {
            entry,
            output,
            options,
        }),
        Commands::Resolve {
            specifier,
            from,
            import,
            options,
        } => commands::resolve::execute(commands::resolve::ResolveArgs {
            specifier,
            from,
            from_import: import,
            options,
        }),
        Commands::Urls { file } => commands::urls::execute(&file),
    }
}
