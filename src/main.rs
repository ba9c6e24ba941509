//! # Image Batch - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Costruzione della configurazione: file JSON, poi flag espliciti
//! - Avvio del `BatchRunner` con le strategie richieste
//! - Sottocomando nascosto `node`: il worker isolato della modalità distribuita
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` rispettato)
//! 3. Carica la configurazione e applica gli override
//! 4. Esegue le strategie e stampa i summary
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-batch -i images_dataset parallel --workers 1,2,4,8
//! image-batch all --reference-secs 0.71
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use image_batch::json_output::JsonMessage;
use image_batch::runner::{node, InProcessLauncher};
use image_batch::{BatchRunner, Config, Strategy};

#[derive(Parser)]
#[command(name = "image-batch")]
#[command(about = "Resize and watermark an image tree with sequential, parallel and distributed strategies")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Directory containing the images to process
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Base directory for the per-strategy output trees
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Target width in pixels
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long, global = true)]
    height: Option<u32>,

    /// Watermark text
    #[arg(long, global = true)]
    text: Option<String>,

    /// Font file for the watermark (default: first system font found)
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    /// JSON configuration file, explicit flags take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output JSON events instead of human-readable summaries
    #[arg(long, global = true)]
    json: bool,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the single-worker baseline
    Sequential,

    /// Sweep the thread pool over several worker counts
    Parallel {
        /// Worker counts to run, comma separated
        #[arg(long, value_delimiter = ',')]
        workers: Option<Vec<usize>>,
    },

    /// Run N isolated nodes over static slices of the task list
    Distributed(DistributedArgs),

    /// Sequential, then the parallel sweep, then distributed
    All {
        #[arg(long, value_delimiter = ',')]
        workers: Option<Vec<usize>>,

        #[command(flatten)]
        distributed: DistributedArgs,
    },

    /// Isolated node: JSON assignment on stdin, JSON report on stdout
    #[command(hide = true)]
    Node,
}

#[derive(Args)]
struct DistributedArgs {
    /// Number of isolated nodes
    #[arg(long)]
    nodes: Option<usize>,

    /// Reference duration in seconds for the efficiency metric
    #[arg(long)]
    reference_secs: Option<f64>,

    /// Run nodes on threads of this process instead of child processes
    #[arg(long)]
    in_process: bool,

    /// Give up on a node after this many seconds
    #[arg(long)]
    node_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.global.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Command::Node = cli.command {
        return run_node();
    }

    let json_output = cli.global.json;
    if let Err(e) = run_batch(cli).await {
        if json_output {
            JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
        }
        return Err(e);
    }

    Ok(())
}

/// Node entry point, stdout carries only the report
fn run_node() -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match node::serve(stdin.lock(), stdout.lock()) {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("Node failed: {}", e);
            Err(e.into())
        }
    }
}

async fn run_batch(cli: Cli) -> Result<()> {
    let mut config = match &cli.global.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    apply_global(&mut config, &cli.global);

    let mut in_process = false;
    let strategies: Vec<Strategy> = match cli.command {
        Command::Sequential => vec![Strategy::Sequential],
        Command::Parallel { workers } => {
            if let Some(workers) = workers {
                config.worker_counts = workers;
            }
            vec![Strategy::Parallel]
        }
        Command::Distributed(args) => {
            in_process = apply_distributed(&mut config, args);
            vec![Strategy::Distributed]
        }
        Command::All {
            workers,
            distributed,
        } => {
            if let Some(workers) = workers {
                config.worker_counts = workers;
            }
            in_process = apply_distributed(&mut config, distributed);
            vec![Strategy::Sequential, Strategy::Parallel, Strategy::Distributed]
        }
        Command::Node => Vec::new(),
    };

    let mut runner = BatchRunner::new(config)?;
    if in_process {
        runner = runner.with_launcher(std::sync::Arc::new(InProcessLauncher));
    }

    runner.run(&strategies).await?;
    Ok(())
}

fn apply_global(config: &mut Config, args: &GlobalArgs) {
    if let Some(input) = &args.input {
        config.input_dir = input.clone();
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(text) = &args.text {
        config.watermark_text = text.clone();
    }
    if let Some(font) = &args.font {
        config.font_path = Some(font.clone());
    }
    if args.json {
        config.json_output = true;
    }
    if args.no_progress {
        config.show_progress = false;
    }
}

/// Returns whether nodes should run in-process
fn apply_distributed(config: &mut Config, args: DistributedArgs) -> bool {
    if let Some(nodes) = args.nodes {
        config.node_count = nodes;
    }
    if args.reference_secs.is_some() {
        config.reference_sequential_secs = args.reference_secs;
    }
    if args.node_timeout.is_some() {
        config.node_timeout_secs = args.node_timeout;
    }
    args.in_process
}
