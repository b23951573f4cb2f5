//! canvas-layers - interactive layer stack shell
//!
//! Seeds a layer session from a config or field file and edits it from a REPL.

use anyhow::Result;
use canvas_layers::{AppConfig, FieldSet, LayerActor, LayerStore};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

/// Canvas Layers - edit the stacking order of text and image fields
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// JSON file with textFields/imageFields to seed the stack (overrides config)
    #[arg(short, long)]
    fields: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Do not print the stack after every change
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Config is read before logging so it can choose the level
    let config = match &args.config {
        Some(path) => AppConfig::load(path).await?,
        None => AppConfig::default(),
    };

    let level = args
        .log_level
        .clone()
        .or_else(|| config.log_level().map(str::to_string))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level)?;

    info!("Starting canvas-layers session '{}'", config.session.name);
    if let Some(path) = &args.config {
        info!("Configuration file: {}", path);
    }

    let seed = match &args.fields {
        Some(path) => Some(FieldSet::load(path).await?),
        None => config.fields.clone(),
    };

    let store = LayerStore::new();
    if !args.quiet {
        store.subscribe(|layers| println!("{}", cli::render_stack(layers)));
    }
    let handle = LayerActor::spawn(store);

    if let Some(fields) = seed.filter(|fields| !fields.is_empty()) {
        let layers = handle
            .initialize_layers(fields.text_fields, fields.image_fields)
            .await?;
        info!("Seeded {} layers", layers.len());
    }

    cli::run_repl(&handle).await?;

    handle.shutdown();
    info!("canvas-layers session closed");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
