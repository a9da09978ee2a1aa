use anyhow::Result;
use clap::{Parser, Subcommand};
use policy_rag::commands::{build_index, init_config, query_index};
use policy_rag::config::{Config, resolve_config_dir, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "policy-rag")]
#[command(about = "Index policy documents and answer questions from them")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.policy-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or rebuild) the index from PDF, DOCX and TXT files
    Build {
        /// Documents to index
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Index directory, overriding the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Ask a question against the index
    Query {
        question: String,
        /// Index directory, overriding the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Number of chunks to return
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Write the default configuration, or show the current one
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = resolve_config_dir(cli.config_dir)?;

    match cli.command {
        Commands::Build { files, dir } => {
            let config = Config::load(&config_dir)?;
            build_index(&config, &files, dir)?;
        }
        Commands::Query { question, dir, k } => {
            let config = Config::load(&config_dir)?;
            query_index(&config, &question, dir.as_deref(), k)?;
        }
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                init_config(&config_dir)?;
            }
        }
    }

    Ok(())
}
