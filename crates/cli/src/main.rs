mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use quill_eval::{CompositionSource, Context, FragmentKind};
use serde::Deserialize;
use serde_json::{json, Map, Value as Json};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Python expression evaluator.
#[derive(Parser)]
#[command(name = "quill", version, about = "Python expression evaluator")]
struct Cli {
    /// Output format (text or json) [default: text]
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Suppress error messages
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression and print its result as JSON
    Eval {
        /// Expression source
        expr: String,
        /// JSON object file bound as the evaluation context
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// Compose a JSON array of context, domain or group-by fragments
    Compose {
        /// Fragment kind (context, domain or groupby)
        kind: FragmentKind,
        /// JSON file holding the fragment array
        fragments: PathBuf,
        /// JSON object file used as the base context
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// Compose contexts, domains and group-bys from one JSON document
    Batch {
        /// JSON file with `contexts`, `domains`, `group_by_seq` and `eval_context`
        source: PathBuf,
    },
    /// Print the token stream of an expression
    Tokens {
        /// Expression source
        expr: String,
    },
    /// Print the parse tree of an expression
    Parse {
        /// Expression source
        expr: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => match config::read_config(path) {
            Ok(config) => config,
            Err(msg) => {
                report_error(&msg, cli.output.unwrap_or(OutputFormat::Text), cli.quiet);
                process::exit(1);
            }
        },
        None => config::Config::default(),
    };
    let output = cli.output.or(config.output).unwrap_or(OutputFormat::Text);

    let result = match &cli.command {
        Commands::Eval { expr, context } => cmd_eval(expr, context.as_deref(), &config, output),
        Commands::Compose {
            kind,
            fragments,
            context,
        } => cmd_compose(*kind, fragments, context.as_deref(), &config, output),
        Commands::Batch { source } => cmd_batch(source, &config, output),
        Commands::Tokens { expr } => cmd_tokens(expr, output),
        Commands::Parse { expr } => cmd_parse(expr, output),
    };

    if let Err(msg) = result {
        report_error(&msg, output, cli.quiet);
        process::exit(1);
    }
}

/// Base context: config `[context]` entries overlaid by the `--context` file.
fn base_context(path: Option<&Path>, config: &config::Config) -> Result<Map<String, Json>, String> {
    let mut base = config.context.clone();
    if let Some(path) = path {
        base.extend(config::read_json_object(path)?);
    }
    Ok(base)
}

fn cmd_eval(
    expr: &str,
    context: Option<&Path>,
    config: &config::Config,
    output: OutputFormat,
) -> Result<(), String> {
    let base = base_context(context, config)?;
    let context = Context::seeded(&base).map_err(|e| e.to_string())?;
    let value = quill_eval::eval(expr, &context).map_err(|e| e.to_string())?;
    print_result(&value, output);
    Ok(())
}

fn cmd_compose(
    kind: FragmentKind,
    fragments: &Path,
    context: Option<&Path>,
    config: &config::Config,
    output: OutputFormat,
) -> Result<(), String> {
    let base = base_context(context, config)?;
    let fragments = match config::read_json(fragments)? {
        Json::Array(items) => items,
        _ => {
            return Err(format!(
                "'{}' must contain a JSON array of fragments",
                fragments.display()
            ))
        }
    };
    tracing::debug!(%kind, count = fragments.len(), "composing fragments");
    let value =
        quill_eval::evaluate_fragments(kind, &fragments, &base).map_err(|e| e.to_string())?;
    print_result(&value, output);
    Ok(())
}

fn cmd_batch(source: &Path, config: &config::Config, output: OutputFormat) -> Result<(), String> {
    let json = config::read_json(source)?;
    let mut source: CompositionSource = serde_json::from_value(json)
        .map_err(|e| format!("invalid composition source '{}': {}", source.display(), e))?;
    if !config.context.is_empty() {
        let mut base = config.context.clone();
        base.extend(source.eval_context.take().unwrap_or_default());
        source.eval_context = Some(base);
    }
    let composition =
        quill_eval::evaluate_domains_and_contexts(&source).map_err(|e| e.to_string())?;
    let value = serde_json::to_value(&composition).map_err(|e| e.to_string())?;
    print_result(&value, output);
    Ok(())
}

fn cmd_tokens(expr: &str, output: OutputFormat) -> Result<(), String> {
    let tokens = quill_core::tokenize(expr).map_err(|e| e.to_string())?;
    match output {
        OutputFormat::Text => {
            for token in &tokens {
                println!("{}", token);
            }
        }
        OutputFormat::Json => {
            let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
            println!("{}", pretty(&json!({ "tokens": rendered })));
        }
    }
    Ok(())
}

fn cmd_parse(expr: &str, output: OutputFormat) -> Result<(), String> {
    let tree = quill_eval::compile(expr).map_err(|e| e.to_string())?;
    match output {
        OutputFormat::Text => println!("{}", tree),
        OutputFormat::Json => println!("{}", pretty(&json!({ "tree": tree.to_string() }))),
    }
    Ok(())
}

fn print_result(value: &Json, output: OutputFormat) {
    match output {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => println!("{}", pretty(&json!({ "result": value }))),
    }
}

fn pretty(value: &Json) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Report an error in the appropriate format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", json!({ "error": msg })),
    }
}
