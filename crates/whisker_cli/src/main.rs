//! Whisker CLI
//!
//! Renders a page carrying `data-*` directives headlessly:
//! - mounts an instance with data from `whisker.toml`, a JSON file or flags
//! - registers the configured components
//! - replays writes, typing and clicks, then prints the resulting HTML

mod config;
mod scenario;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use whisker_app::{Document, Options, Runtime};

use config::{read_json_object, WhiskerConfig};
use scenario::Scenario;

const DEFAULT_CONFIG: &str = "whisker.toml";

/// Headless renderer for Whisker pages
#[derive(Parser, Debug)]
#[command(name = "whisker")]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mount a page, apply interactions and print the rendered HTML
    Render(RenderArgs),

    /// Print the token stream of a directive expression
    Tokens {
        /// Expression text, e.g. "todo.done = !todo.done"
        expr: String,
    },
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// HTML page to mount
    #[arg(value_hint = clap::ValueHint::FilePath)]
    page: PathBuf,

    /// Config file (default: ./whisker.toml when present)
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// JSON file with initial data fields, merged over the config's data
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    data: Option<PathBuf>,

    /// Mount at the first element matching this selector
    #[arg(short, long)]
    selector: Option<String>,

    /// Write a data path before interacting: PATH=JSON (repeatable)
    #[arg(long = "set", value_name = "PATH=JSON")]
    sets: Vec<String>,

    /// Type into an element: SELECTOR=TEXT (repeatable)
    #[arg(long = "input", value_name = "SELECTOR=TEXT")]
    inputs: Vec<String>,

    /// Click an element (repeatable)
    #[arg(long = "click", value_name = "SELECTOR")]
    clicks: Vec<String>,

    /// JSON scenario file run before the flag steps
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    script: Option<PathBuf>,

    /// Also print the final data as JSON
    #[arg(long)]
    state: bool,

    /// Log filter, e.g. "whisker_app=debug" (overrides config and RUST_LOG)
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => render(args),
        Commands::Tokens { expr } => {
            init_logging(None);
            for token in whisker_core::tokenize(&expr) {
                println!("{:<10} {:?}", format!("{:?}", token.kind), token.value);
            }
            Ok(())
        }
    }
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<WhiskerConfig> {
    match path {
        Some(path) => WhiskerConfig::load(path),
        None if Path::new(DEFAULT_CONFIG).is_file() => WhiskerConfig::load(Path::new(DEFAULT_CONFIG)),
        None => Ok(WhiskerConfig::default()),
    }
}

fn render(args: RenderArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    init_logging(args.log.as_deref().or(config.log.filter.as_deref()));

    let html = std::fs::read_to_string(&args.page)
        .with_context(|| format!("Failed to read {}", args.page.display()))?;

    let runtime = Runtime::new();
    for component in &config.components {
        let name = runtime.component(
            Options::new()
                .name(&component.name)
                .template(component.template(&config)?)
                .data_json(component.data_json()?),
        )?;
        debug!(component = %name, "registered component from config");
    }

    let mut fields = config.data_fields()?;
    if let Some(path) = &args.data {
        fields.extend(read_json_object(path)?);
    }
    let mut options = Options::new().data_json(serde_json::Value::Object(fields));
    if let Some(selector) = args.selector.as_ref().or(config.mount.selector.as_ref()) {
        options = options.el(selector);
    }

    let mut instance = runtime.instance(options)?;
    instance
        .mount(Document::parse(&html))
        .with_context(|| format!("Failed to mount {}", args.page.display()))?;
    info!(page = %args.page.display(), "mounted");

    let mut scenario = match &args.script {
        Some(path) => Scenario::from_path(path)?,
        None => Scenario::default(),
    };
    scenario.extend(Scenario::from_flags(&args.sets, &args.inputs, &args.clicks)?);
    scenario.run(&mut instance)?;

    println!("{}", instance.to_html());
    if args.state {
        println!("{}", serde_json::to_string_pretty(&instance.data().to_json())?);
    }
    Ok(())
}
