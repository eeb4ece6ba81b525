//! openai-script CLI - run a script step from the command line

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::runtime::Handle;

use openai_script::modules::HttpModule;
use openai_script::{FixSuggestion, Record, ScriptError, StepConfig, StepRunner};

#[derive(Parser)]
#[command(name = "openai-script")]
#[command(about = "Run user scripts against the OpenAI API as a pipeline step")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a step definition over input records
    Run {
        /// Path to the step definition (.yaml)
        file: String,

        /// Path to a JSON array of input records (omit for no records)
        #[arg(short, long)]
        records: Option<String>,

        /// Pretty-print the output records
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a step definition (parse and compile, never execute)
    Validate {
        /// Path to the step definition (.yaml)
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { file, records, pretty } => run_step(&file, records.as_deref(), pretty).await,
        Commands::Validate { file } => validate_step(&file).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn run_step(file: &str, records: Option<&str>, pretty: bool) -> Result<(), ScriptError> {
    let yaml = tokio::fs::read_to_string(file).await?;
    let config = StepConfig::from_yaml(&yaml)?;

    let records: Vec<Record> = match records {
        Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
        None => Vec::new(),
    };

    let runner = StepRunner::new(config)?;
    let output = runner.run(records).await?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);

    Ok(())
}

async fn validate_step(file: &str) -> Result<(), ScriptError> {
    let yaml = tokio::fs::read_to_string(file).await?;
    let config = StepConfig::from_yaml(&yaml)?;
    config.validate()?;

    // Compile without executing
    let engine = openai_script::ScriptEngine::new(HttpModule::new(
        reqwest::Client::new(),
        Handle::current(),
    ));
    engine.compile(&config.script)?;

    println!("{} Step '{}' is valid", "✓".green(), file);
    println!("  Mode: {:?}", config.mode);
    println!("  Model: {}", config.model());

    Ok(())
}
